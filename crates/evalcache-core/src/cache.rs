//! Cache traits.
//!
//! [`CacheRead`] is the read surface (sizes, lookups, cursor stepping,
//! borrowed entries). It is implemented by every concrete store and by the
//! readers views hand to their subscribers.
//!
//! [`Cache`] is the handle surface: mutation, annotation and subscription,
//! plus [`Cache::read`] to reach a `CacheRead` for the duration of a
//! closure. Views only hold a shared handle to their core, so they cannot
//! lend out `&CacheEntry` directly; the closure keeps the borrow scoped.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::cursor::Cursor;
use crate::domain::{AppId, Domain};
use crate::entry::{CacheEntry, EntryId};
use crate::error::CacheResult;
use crate::index::OrderedIndex;
use crate::key::{CachedKey, KeyGenerator};
use crate::response::ResponseFieldMap;
use crate::signals::{ClearSlot, EraseSlot, InsertSlot, SubscriptionId, UpdateSlot};
use crate::view::Sense;

/// Shared, single-threaded cache handle. Views hold one of these to their
/// core.
pub type SharedCache = Rc<RefCell<dyn Cache>>;

/// What a lookup is keyed by.
#[derive(Debug, Clone, Copy)]
pub enum KeyQuery<'a> {
    Domain(&'a Domain),
    Key(&'a CachedKey),
}

impl<'a> From<&'a Domain> for KeyQuery<'a> {
    fn from(domain: &'a Domain) -> Self {
        Self::Domain(domain)
    }
}

impl<'a> From<&'a CachedKey> for KeyQuery<'a> {
    fn from(key: &'a CachedKey) -> Self {
        Self::Key(key)
    }
}

pub trait CacheRead {
    fn key_generator(&self) -> &dyn KeyGenerator;

    /// Membership and order of this cache.
    fn index(&self) -> &OrderedIndex;

    /// Entry storage lookup, ignoring membership. Views answer from their
    /// core's storage.
    fn storage_entry(&self, id: &EntryId) -> Option<&CacheEntry>;

    fn size(&self) -> usize {
        self.index().len()
    }

    fn size_app(&self, app: AppId) -> usize {
        self.index().len_app(app)
    }

    /// Applications with at least one entry.
    fn applications(&self) -> Vec<AppId> {
        self.index().apps().collect()
    }

    /// The key `query` resolves to for `app`: a stored key when the key
    /// generator matches one, otherwise the generated key.
    fn resolve_key(&self, app: AppId, query: KeyQuery<'_>) -> CachedKey {
        let candidate = match query {
            KeyQuery::Domain(domain) => self.key_generator().generate(domain),
            KeyQuery::Key(key) => key.clone(),
        };
        self.index().resolve(app, candidate, self.key_generator())
    }

    /// Exact match. A hit cursor is scoped to the matched entry alone.
    fn find(&self, app: AppId, query: KeyQuery<'_>) -> (Cursor, CachedKey) {
        let key = self.resolve_key(app, query);
        (self.index().find(app, &key), key)
    }

    /// First entry of `app` not less than the query key.
    fn lower_bound(&self, app: AppId, query: KeyQuery<'_>) -> (Cursor, CachedKey) {
        let key = self.resolve_key(app, query);
        (self.index().lower_bound(app, &key), key)
    }

    /// First entry of `app` strictly greater than the query key.
    fn upper_bound(&self, app: AppId, query: KeyQuery<'_>) -> (Cursor, CachedKey) {
        let key = self.resolve_key(app, query);
        (self.index().upper_bound(app, &key), key)
    }

    fn begin(&self) -> Cursor {
        self.index().begin()
    }

    fn begin_app(&self, app: AppId) -> Cursor {
        self.index().begin_app(app)
    }

    fn end(&self) -> Cursor {
        Cursor::end()
    }

    fn next(&self, at: &Cursor) -> Cursor {
        self.index().next(at)
    }

    fn prev(&self, at: &Cursor) -> Cursor {
        self.index().prev(at)
    }

    /// The entry `at` denotes, if it is still a member.
    fn entry(&self, at: &Cursor) -> Option<&CacheEntry> {
        let id = at.id()?;
        if !self.index().contains(id) {
            return None;
        }
        self.storage_entry(id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &CacheEntry> + '_> {
        Box::new(self.index().ids().filter_map(|id| self.storage_entry(id)))
    }

    fn iter_app(&self, app: AppId) -> Box<dyn Iterator<Item = &CacheEntry> + '_> {
        Box::new(
            self.index()
                .app_ids(app)
                .filter_map(|id| self.storage_entry(id)),
        )
    }

    /// Objective senses in effect for `app`. Owning caches have none; views
    /// report their own configuration, or inherit their core's.
    fn objective_senses(&self, _app: AppId) -> &[Sense] {
        &[]
    }
}

pub trait Cache {
    /// Factory name of this cache ("Local", "Pareto", ...).
    fn kind(&self) -> &'static str;

    /// Run `visit` against this cache's read surface.
    ///
    /// # Panics
    ///
    /// Panics if this cache, or for a view any cache below it, is already
    /// mutably borrowed. That is the case inside a slot while the cache is
    /// dispatching a mutation; slots must use the reader they are handed.
    fn read(&self, visit: &mut dyn FnMut(&dyn CacheRead));

    /// Insert or augment the evaluation of `app` at `domain`.
    ///
    /// Returns an application-scoped cursor and whether a new entry was
    /// created.
    fn insert(
        &mut self,
        app: AppId,
        domain: &Domain,
        fields: ResponseFieldMap,
    ) -> CacheResult<(Cursor, bool)>;

    /// Remove `app`'s data at the queried point. Returns 0 or 1.
    fn erase(&mut self, app: AppId, query: KeyQuery<'_>) -> CacheResult<usize>;

    /// Remove all of `app`'s data.
    fn erase_app(&mut self, app: AppId) -> CacheResult<usize>;

    /// Remove every entry stored under `key`; the empty key removes
    /// everything.
    fn erase_key(&mut self, key: &CachedKey) -> CacheResult<usize>;

    /// Remove the entry `at` denotes. Erasing the end cursor is a no-op.
    fn erase_at(&mut self, at: &Cursor) -> CacheResult<usize>;

    fn clear(&mut self) -> CacheResult<()>;

    fn clear_app(&mut self, app: AppId) -> CacheResult<()>;

    fn annotate(&mut self, at: &Cursor, name: &str, value: Value) -> CacheResult<()>;

    fn erase_annotation(&mut self, at: &Cursor, name: &str) -> CacheResult<usize>;

    /// Remove every annotation, returning how many there were.
    fn erase_annotations(&mut self, at: &Cursor) -> CacheResult<usize>;

    fn on_insert(&mut self, slot: InsertSlot) -> SubscriptionId;

    fn on_update(&mut self, slot: UpdateSlot) -> SubscriptionId;

    fn on_erase(&mut self, slot: EraseSlot) -> SubscriptionId;

    fn on_clear(&mut self, slot: ClearSlot) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Closure-returning helpers over [`Cache::read`].
pub trait CacheExt: Cache {
    fn inspect<R>(&self, f: impl FnOnce(&dyn CacheRead) -> R) -> R {
        let mut f = Some(f);
        let mut out = None;
        self.read(&mut |reader: &dyn CacheRead| {
            if let Some(f) = f.take() {
                out = Some(f(reader));
            }
        });
        out.expect("Cache::read must call its visitor exactly once")
    }

    /// Owned copy of the entry `at` denotes.
    fn snapshot(&self, at: &Cursor) -> Option<CacheEntry> {
        self.inspect(|reader| reader.entry(at).cloned())
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
