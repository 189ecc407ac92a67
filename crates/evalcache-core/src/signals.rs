//! Subscriber lists for cache mutations.
//!
//! Each mutating call dispatches synchronously, in registration order, after
//! the emitting cache is consistent. Slots receive a read-only view of the
//! emitter so they can read back without touching its handle.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::cache::CacheRead;
use crate::cursor::Cursor;
use crate::domain::AppId;
use crate::entry::CacheEntry;
use crate::response::FieldTag;

/// Called with a cursor to a newly created entry.
pub type InsertSlot = Rc<dyn Fn(&dyn CacheRead, &Cursor)>;
/// Called when an existing entry gained fields; carries the added tags.
pub type UpdateSlot = Rc<dyn Fn(&dyn CacheRead, &Cursor, &BTreeSet<FieldTag>)>;
/// Called once per application whose data left the cache, with the entry
/// as it was before removal.
pub type EraseSlot = Rc<dyn Fn(&dyn CacheRead, AppId, &CacheEntry)>;
/// Called after a bulk removal; `None` means the whole cache.
pub type ClearSlot = Rc<dyn Fn(&dyn CacheRead, Option<AppId>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Signals {
    next_id: u64,
    insert: Vec<(SubscriptionId, InsertSlot)>,
    update: Vec<(SubscriptionId, UpdateSlot)>,
    erase: Vec<(SubscriptionId, EraseSlot)>,
    clear: Vec<(SubscriptionId, ClearSlot)>,
}

impl Signals {
    fn mint(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub fn on_insert(&mut self, slot: InsertSlot) -> SubscriptionId {
        let id = self.mint();
        self.insert.push((id, slot));
        id
    }

    pub fn on_update(&mut self, slot: UpdateSlot) -> SubscriptionId {
        let id = self.mint();
        self.update.push((id, slot));
        id
    }

    pub fn on_erase(&mut self, slot: EraseSlot) -> SubscriptionId {
        let id = self.mint();
        self.erase.push((id, slot));
        id
    }

    pub fn on_clear(&mut self, slot: ClearSlot) -> SubscriptionId {
        let id = self.mint();
        self.clear.push((id, slot));
        id
    }

    /// Remove a slot from whichever list holds it.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.len();
        self.insert.retain(|(sid, _)| *sid != id);
        self.update.retain(|(sid, _)| *sid != id);
        self.erase.retain(|(sid, _)| *sid != id);
        self.clear.retain(|(sid, _)| *sid != id);
        self.len() < before
    }

    pub fn len(&self) -> usize {
        self.insert.len() + self.update.len() + self.erase.len() + self.clear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current slots. Dispatching from the snapshot lets
    /// slots subscribe or unsubscribe without aliasing the lists.
    pub(crate) fn dispatch(&self) -> Dispatch {
        Dispatch {
            insert: self.insert.iter().map(|(_, s)| s.clone()).collect(),
            update: self.update.iter().map(|(_, s)| s.clone()).collect(),
            erase: self.erase.iter().map(|(_, s)| s.clone()).collect(),
            clear: self.clear.iter().map(|(_, s)| s.clone()).collect(),
        }
    }
}

pub(crate) struct Dispatch {
    insert: Vec<InsertSlot>,
    update: Vec<UpdateSlot>,
    erase: Vec<EraseSlot>,
    clear: Vec<ClearSlot>,
}

impl Dispatch {
    pub(crate) fn inserted(&self, cache: &dyn CacheRead, at: &Cursor) {
        for slot in &self.insert {
            slot(cache, at);
        }
    }

    pub(crate) fn updated(&self, cache: &dyn CacheRead, at: &Cursor, added: &BTreeSet<FieldTag>) {
        for slot in &self.update {
            slot(cache, at, added);
        }
    }

    pub(crate) fn erased(&self, cache: &dyn CacheRead, app: AppId, entry: &CacheEntry) {
        for slot in &self.erase {
            slot(cache, app, entry);
        }
    }

    pub(crate) fn cleared(&self, cache: &dyn CacheRead, app: Option<AppId>) {
        for slot in &self.clear {
            slot(cache, app);
        }
    }
}
