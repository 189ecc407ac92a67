//! Derived caches.
//!
//! A view never owns entries. It keeps an [`OrderedIndex`] of the core
//! entries it admits, answers reads from that index plus the core's
//! storage, and re-publishes its own membership changes through the same
//! signals a cache uses. That last part is what lets a view sit on top of
//! another view.

mod pareto;

pub use pareto::{dominates, ParetoView, Sense, PARETO_KIND};

use std::collections::HashMap;

use crate::cache::CacheRead;
use crate::domain::AppId;
use crate::entry::{CacheEntry, EntryId};
use crate::index::OrderedIndex;
use crate::key::{ExactKeyGenerator, KeyGenerator};

type SenseMap = HashMap<AppId, Vec<Sense>>;

/// Read surface of an attached view: membership and configured senses from
/// the view, entries and key generation from the core.
pub(crate) struct ViewReader<'a> {
    core: &'a dyn CacheRead,
    index: &'a OrderedIndex,
    senses: &'a SenseMap,
}

impl<'a> ViewReader<'a> {
    pub(crate) fn new(
        core: &'a dyn CacheRead,
        index: &'a OrderedIndex,
        senses: &'a SenseMap,
    ) -> Self {
        Self { core, index, senses }
    }
}

impl CacheRead for ViewReader<'_> {
    fn key_generator(&self) -> &dyn KeyGenerator {
        self.core.key_generator()
    }

    fn index(&self) -> &OrderedIndex {
        self.index
    }

    fn storage_entry(&self, id: &EntryId) -> Option<&CacheEntry> {
        self.core.storage_entry(id)
    }

    fn objective_senses(&self, app: AppId) -> &[Sense] {
        match self.senses.get(&app) {
            Some(own) => own.as_slice(),
            None => self.core.objective_senses(app),
        }
    }
}

static DETACHED_KEYS: ExactKeyGenerator = ExactKeyGenerator;

/// Read surface of a view with no core: always empty.
pub(crate) struct DetachedReader<'a> {
    index: &'a OrderedIndex,
    senses: &'a SenseMap,
}

impl<'a> DetachedReader<'a> {
    pub(crate) fn new(index: &'a OrderedIndex, senses: &'a SenseMap) -> Self {
        Self { index, senses }
    }
}

impl CacheRead for DetachedReader<'_> {
    fn key_generator(&self) -> &dyn KeyGenerator {
        &DETACHED_KEYS
    }

    fn index(&self) -> &OrderedIndex {
        self.index
    }

    fn storage_entry(&self, _id: &EntryId) -> Option<&CacheEntry> {
        None
    }

    fn objective_senses(&self, app: AppId) -> &[Sense] {
        self.senses.get(&app).map_or(&[], Vec::as_slice)
    }
}
