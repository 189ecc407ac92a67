//! Ordered membership index shared by caches and views.
//!
//! Holds the global order of entry ids and, per application, an ordered map
//! from key to entry id. All cursor stepping is resolved here, so a view
//! steps over its own membership exactly the way a cache steps over its
//! storage.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use crate::cursor::{Cursor, Scope};
use crate::domain::AppId;
use crate::entry::EntryId;
use crate::key::{CachedKey, KeyGenerator};

#[derive(Debug, Default, Clone)]
pub struct OrderedIndex {
    /// Entry id -> number of applications indexing it.
    global: BTreeMap<EntryId, usize>,
    by_app: HashMap<AppId, BTreeMap<CachedKey, EntryId>>,
}

impl OrderedIndex {
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn len_app(&self, app: AppId) -> usize {
        self.by_app.get(&app).map_or(0, BTreeMap::len)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.global.contains_key(id)
    }

    pub fn contains_app(&self, app: AppId, id: &EntryId) -> bool {
        self.get(app, id.key()) == Some(id)
    }

    pub fn get(&self, app: AppId, key: &CachedKey) -> Option<&EntryId> {
        self.by_app.get(&app).and_then(|keys| keys.get(key))
    }

    /// Applications with at least one indexed entry.
    pub fn apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.by_app
            .iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(app, _)| *app)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntryId> + '_ {
        self.global.keys()
    }

    pub fn app_ids(&self, app: AppId) -> impl DoubleEndedIterator<Item = &EntryId> + '_ {
        self.by_app.get(&app).into_iter().flat_map(BTreeMap::values)
    }

    pub(crate) fn insert(&mut self, app: AppId, id: EntryId) -> bool {
        let keys = self.by_app.entry(app).or_default();
        if keys.contains_key(id.key()) {
            return false;
        }
        keys.insert(id.key().clone(), id.clone());
        *self.global.entry(id).or_insert(0) += 1;
        true
    }

    pub(crate) fn remove(&mut self, app: AppId, id: &EntryId) -> bool {
        let Some(keys) = self.by_app.get_mut(&app) else {
            return false;
        };
        if keys.get(id.key()) != Some(id) {
            return false;
        }
        keys.remove(id.key());
        if keys.is_empty() {
            self.by_app.remove(&app);
        }
        self.release(id);
        true
    }

    /// Drop every entry of `app`, returning the ids in key order.
    pub(crate) fn remove_app(&mut self, app: AppId) -> Vec<EntryId> {
        let ids: Vec<EntryId> = self
            .by_app
            .remove(&app)
            .map(|keys| keys.into_values().collect())
            .unwrap_or_default();
        for id in &ids {
            self.release(id);
        }
        ids
    }

    pub(crate) fn clear(&mut self) {
        self.global.clear();
        self.by_app.clear();
    }

    fn release(&mut self, id: &EntryId) {
        if let Some(count) = self.global.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.global.remove(id);
            }
        }
    }

    /// Map a freshly generated key onto a stored key of `app` that the
    /// generator considers the same point; the closest one wins.
    pub fn resolve(
        &self,
        app: AppId,
        candidate: CachedKey,
        generator: &dyn KeyGenerator,
    ) -> CachedKey {
        let Some(keys) = self.by_app.get(&app) else {
            return candidate;
        };
        let eps = generator.tolerance();
        let Some(&lead) = candidate.real().first() else {
            return candidate;
        };
        if eps == 0.0 || keys.contains_key(&candidate) {
            return candidate;
        }

        let floor = candidate.floor_at(lead - eps);
        keys.range(floor..)
            .map(|(key, _)| key)
            .take_while(|key| {
                key.discrete() == candidate.discrete()
                    && key.real().first().is_some_and(|&r| r <= lead + eps)
            })
            .filter(|key| generator.matches(key, &candidate))
            .min_by(|a, b| distance(a, &candidate).total_cmp(&distance(b, &candidate)))
            .cloned()
            .unwrap_or(candidate)
    }

    pub(crate) fn begin(&self) -> Cursor {
        Cursor::global(self.global.keys().next().cloned())
    }

    pub(crate) fn begin_app(&self, app: AppId) -> Cursor {
        Cursor::in_app(app, self.app_ids(app).next().cloned())
    }

    pub(crate) fn find(&self, app: AppId, key: &CachedKey) -> Cursor {
        match self.get(app, key) {
            Some(id) => Cursor::singleton(app, id.clone()),
            None => Cursor::end(),
        }
    }

    pub(crate) fn lower_bound(&self, app: AppId, key: &CachedKey) -> Cursor {
        let at = self
            .by_app
            .get(&app)
            .and_then(|keys| keys.range(key..).next())
            .map(|(_, id)| id.clone());
        Cursor::in_app(app, at)
    }

    pub(crate) fn upper_bound(&self, app: AppId, key: &CachedKey) -> Cursor {
        let at = self
            .by_app
            .get(&app)
            .and_then(|keys| keys.range((Excluded(key), Unbounded)).next())
            .map(|(_, id)| id.clone());
        Cursor::in_app(app, at)
    }

    /// Step forward; stepping the end cursor leaves it at the end.
    pub(crate) fn next(&self, cursor: &Cursor) -> Cursor {
        let Some(at) = cursor.id() else {
            return cursor.clone();
        };
        let next = match cursor.scope() {
            Scope::Global => self
                .global
                .range((Excluded(at), Unbounded))
                .next()
                .map(|(id, _)| id.clone()),
            Scope::App(app) => self
                .by_app
                .get(app)
                .and_then(|keys| keys.range((Excluded(at.key()), Unbounded)).next())
                .map(|(_, id)| id.clone()),
            Scope::Singleton(..) => None,
        };
        cursor.moved(next)
    }

    /// Step backward; stepping back from the first position gives the end
    /// cursor, and stepping back from the end gives the last position.
    pub(crate) fn prev(&self, cursor: &Cursor) -> Cursor {
        let prev = match (cursor.id(), cursor.scope()) {
            (None, Scope::Global) => self.global.keys().next_back().cloned(),
            (None, Scope::App(app)) => self.app_ids(*app).next_back().cloned(),
            (None, Scope::Singleton(app, id)) => {
                self.contains_app(*app, id).then(|| id.clone())
            }
            (Some(at), Scope::Global) => self
                .global
                .range(..at)
                .next_back()
                .map(|(id, _)| id.clone()),
            (Some(at), Scope::App(app)) => self
                .by_app
                .get(app)
                .and_then(|keys| keys.range(..at.key()).next_back())
                .map(|(_, id)| id.clone()),
            (Some(_), Scope::Singleton(..)) => None,
        };
        cursor.moved(prev)
    }
}

fn distance(a: &CachedKey, b: &CachedKey) -> f64 {
    a.real()
        .iter()
        .zip(b.real())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
