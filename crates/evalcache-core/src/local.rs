//! The owning, in-memory evaluation cache.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::cache::{Cache, CacheRead, KeyQuery, SharedCache};
use crate::config::CacheConfig;
use crate::cursor::Cursor;
use crate::domain::{AppId, Domain};
use crate::entry::{CacheEntry, EntryId};
use crate::error::{CacheError, CacheResult};
use crate::index::OrderedIndex;
use crate::key::{CachedKey, EpsilonKeyGenerator, KeyGenerator};
use crate::response::ResponseFieldMap;
use crate::signals::{ClearSlot, EraseSlot, InsertSlot, Signals, SubscriptionId, UpdateSlot};

/// Factory name of [`LocalCache`].
pub const LOCAL_KIND: &str = "Local";

/// Evaluation cache owning its entries.
pub struct LocalCache {
    generator: Box<dyn KeyGenerator>,
    entries: BTreeMap<EntryId, CacheEntry>,
    index: OrderedIndex,
    next_seq: u64,
    signals: Signals,
}

impl LocalCache {
    /// A cache with the default epsilon key generator.
    pub fn new() -> Self {
        Self::with_generator(Box::new(EpsilonKeyGenerator::default()))
    }

    pub fn with_generator(generator: Box<dyn KeyGenerator>) -> Self {
        Self {
            generator,
            entries: BTreeMap::new(),
            index: OrderedIndex::default(),
            next_seq: 0,
            signals: Signals::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::with_generator(config.key_generator.build()?))
    }

    /// Wrap in a shared handle so views can attach.
    pub fn into_shared(self) -> SharedCache {
        Rc::new(RefCell::new(self))
    }

    /// Take `app`'s data out of entry `id`, dropping the entry once no
    /// application is left. Returns the entry as it was.
    fn detach_app(&mut self, app: AppId, id: &EntryId) -> Option<CacheEntry> {
        self.index.remove(app, id);
        let entry = self.entries.get_mut(id)?;
        if entry.apps().all(|other| other == app) {
            return self.entries.remove(id);
        }
        let snapshot = entry.clone();
        entry.remove_app(app);
        Some(snapshot)
    }

    /// Drop entry `id` for every application, notifying once per application.
    fn remove_entry(&mut self, id: &EntryId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        let apps: Vec<AppId> = entry.apps().collect();
        for app in &apps {
            self.index.remove(*app, id);
        }
        debug!(seq = id.seq(), size = self.index.len(), "erased cache entry");

        let dispatch = self.signals.dispatch();
        for app in apps {
            dispatch.erased(&*self, app, &entry);
        }
        true
    }

    fn entry_mut(&mut self, at: &Cursor, operation: &'static str) -> CacheResult<&mut CacheEntry> {
        at.id()
            .and_then(|id| self.entries.get_mut(id))
            .ok_or(CacheError::NonexistentItem { operation })
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRead for LocalCache {
    fn key_generator(&self) -> &dyn KeyGenerator {
        self.generator.as_ref()
    }

    fn index(&self) -> &OrderedIndex {
        &self.index
    }

    fn storage_entry(&self, id: &EntryId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }
}

impl Cache for LocalCache {
    fn kind(&self) -> &'static str {
        LOCAL_KIND
    }

    fn read(&self, visit: &mut dyn FnMut(&dyn CacheRead)) {
        visit(self)
    }

    fn insert(
        &mut self,
        app: AppId,
        domain: &Domain,
        fields: ResponseFieldMap,
    ) -> CacheResult<(Cursor, bool)> {
        let key = self.resolve_key(app, KeyQuery::Domain(domain));

        if let Some(id) = self.index.get(app, &key).cloned() {
            let added = match self.entries.get_mut(&id).and_then(|e| e.response_mut(app)) {
                Some(existing) => existing.merge(&fields),
                None => Default::default(),
            };
            let at = Cursor::in_app(app, Some(id));
            if !added.is_empty() {
                trace!(%app, added = added.len(), "augmented cached evaluation");
                self.signals.dispatch().updated(&*self, &at, &added);
            }
            return Ok((at, false));
        }

        let id = EntryId::new(key, self.next_seq);
        self.next_seq += 1;
        self.entries.insert(
            id.clone(),
            CacheEntry::new(id.clone(), domain.clone(), app, fields),
        );
        self.index.insert(app, id.clone());
        debug!(%app, seq = id.seq(), size = self.index.len(), "cached new evaluation");

        let at = Cursor::in_app(app, Some(id));
        self.signals.dispatch().inserted(&*self, &at);
        Ok((at, true))
    }

    fn erase(&mut self, app: AppId, query: KeyQuery<'_>) -> CacheResult<usize> {
        let key = self.resolve_key(app, query);
        let Some(id) = self.index.get(app, &key).cloned() else {
            return Ok(0);
        };
        let Some(removed) = self.detach_app(app, &id) else {
            return Ok(0);
        };
        debug!(%app, seq = id.seq(), size = self.index.len(), "erased cached evaluation");
        self.signals.dispatch().erased(&*self, app, &removed);
        Ok(1)
    }

    fn erase_app(&mut self, app: AppId) -> CacheResult<usize> {
        let ids = self.index.remove_app(app);
        for id in &ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.remove_app(app);
                if entry.is_orphaned() {
                    self.entries.remove(id);
                }
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(%app, removed = ids.len(), size = self.index.len(), "cleared application");
        self.signals.dispatch().cleared(&*self, Some(app));
        Ok(ids.len())
    }

    fn erase_key(&mut self, key: &CachedKey) -> CacheResult<usize> {
        if key.is_empty() {
            let removed = self.entries.len();
            self.entries.clear();
            self.index.clear();
            if removed > 0 {
                debug!(removed, "cleared cache");
                self.signals.dispatch().cleared(&*self, None);
            }
            return Ok(removed);
        }

        let ids: Vec<EntryId> = self
            .entries
            .range(EntryId::new(key.clone(), 0)..=EntryId::new(key.clone(), u64::MAX))
            .map(|(id, _)| id.clone())
            .collect();
        Ok(ids.iter().filter(|id| self.remove_entry(id)).count())
    }

    fn erase_at(&mut self, at: &Cursor) -> CacheResult<usize> {
        let Some(id) = at.id() else {
            return Ok(0);
        };
        Ok(usize::from(self.remove_entry(id)))
    }

    fn clear(&mut self) -> CacheResult<()> {
        self.erase_key(&CachedKey::default()).map(|_| ())
    }

    fn clear_app(&mut self, app: AppId) -> CacheResult<()> {
        self.erase_app(app).map(|_| ())
    }

    fn annotate(&mut self, at: &Cursor, name: &str, value: Value) -> CacheResult<()> {
        let entry = self.entry_mut(at, "annotate")?;
        if name.is_empty() {
            return Err(CacheError::EmptyAnnotationName);
        }
        entry.annotations_mut().insert(name.to_string(), value);
        Ok(())
    }

    fn erase_annotation(&mut self, at: &Cursor, name: &str) -> CacheResult<usize> {
        let entry = self.entry_mut(at, "erase annotation from")?;
        Ok(usize::from(entry.annotations_mut().remove(name).is_some()))
    }

    fn erase_annotations(&mut self, at: &Cursor) -> CacheResult<usize> {
        let entry = self.entry_mut(at, "erase annotations from")?;
        let annotations = entry.annotations_mut();
        let removed = annotations.len();
        annotations.clear();
        Ok(removed)
    }

    fn on_insert(&mut self, slot: InsertSlot) -> SubscriptionId {
        self.signals.on_insert(slot)
    }

    fn on_update(&mut self, slot: UpdateSlot) -> SubscriptionId {
        self.signals.on_update(slot)
    }

    fn on_erase(&mut self, slot: EraseSlot) -> SubscriptionId {
        self.signals.on_erase(slot)
    }

    fn on_clear(&mut self, slot: ClearSlot) -> SubscriptionId {
        self.signals.on_clear(slot)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.signals.unsubscribe(id)
    }
}
