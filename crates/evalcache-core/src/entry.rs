//! Cache entries.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::domain::{AppId, Domain};
use crate::key::CachedKey;
use crate::response::ResponseFieldMap;

/// Position of an entry in the global order: key first, then creation
/// sequence, so equal keys from different applications stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryId {
    key: CachedKey,
    seq: u64,
}

impl EntryId {
    pub(crate) fn new(key: CachedKey, seq: u64) -> Self {
        Self { key, seq }
    }

    pub fn key(&self) -> &CachedKey {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// One cached domain point with the responses computed there.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    id: EntryId,
    domain: Domain,
    responses: HashMap<AppId, ResponseFieldMap>,
    annotations: BTreeMap<String, Value>,
}

impl CacheEntry {
    pub(crate) fn new(id: EntryId, domain: Domain, app: AppId, fields: ResponseFieldMap) -> Self {
        let mut responses = HashMap::new();
        responses.insert(app, fields);
        Self {
            id,
            domain,
            responses,
            annotations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn key(&self) -> &CachedKey {
        &self.id.key
    }

    /// The domain point as first inserted.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn response(&self, app: AppId) -> Option<&ResponseFieldMap> {
        self.responses.get(&app)
    }

    pub fn has_app(&self, app: AppId) -> bool {
        self.responses.contains_key(&app)
    }

    /// Applications holding responses in this entry.
    pub fn apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.responses.keys().copied()
    }

    pub fn annotation(&self, name: &str) -> Option<&Value> {
        self.annotations.get(name)
    }

    pub fn annotations(&self) -> &BTreeMap<String, Value> {
        &self.annotations
    }

    pub(crate) fn response_mut(&mut self, app: AppId) -> Option<&mut ResponseFieldMap> {
        self.responses.get_mut(&app)
    }

    pub(crate) fn remove_app(&mut self, app: AppId) -> Option<ResponseFieldMap> {
        self.responses.remove(&app)
    }

    pub(crate) fn is_orphaned(&self) -> bool {
        self.responses.is_empty()
    }

    pub(crate) fn annotations_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.annotations
    }
}
