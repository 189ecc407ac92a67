//! Cursors: positions in a cache's order, scoped to how they were obtained.
//!
//! | Obtained from                         | Scope       | Steps over             |
//! |---------------------------------------|-------------|------------------------|
//! | `begin()`, `end()`                    | `Global`    | every entry            |
//! | `begin_app`, `lower_bound`, `insert`  | `App`       | one application's keys |
//! | `find`                                | `Singleton` | the matched entry only |
//!
//! Cursors do not borrow the cache; step them with `CacheRead::next` /
//! `CacheRead::prev`. All end cursors compare equal regardless of scope.

use crate::domain::AppId;
use crate::entry::EntryId;

#[derive(Debug, Clone)]
pub(crate) enum Scope {
    Global,
    App(AppId),
    Singleton(AppId, EntryId),
}

#[derive(Debug, Clone)]
pub struct Cursor {
    scope: Scope,
    at: Option<EntryId>,
}

impl Cursor {
    /// The end sentinel (global scope).
    pub fn end() -> Self {
        Self {
            scope: Scope::Global,
            at: None,
        }
    }

    pub(crate) fn global(at: Option<EntryId>) -> Self {
        Self {
            scope: Scope::Global,
            at,
        }
    }

    pub(crate) fn in_app(app: AppId, at: Option<EntryId>) -> Self {
        Self {
            scope: Scope::App(app),
            at,
        }
    }

    pub(crate) fn singleton(app: AppId, id: EntryId) -> Self {
        Self {
            scope: Scope::Singleton(app, id.clone()),
            at: Some(id),
        }
    }

    /// The same scope, moved to `at`.
    pub(crate) fn moved(&self, at: Option<EntryId>) -> Self {
        Self {
            scope: self.scope.clone(),
            at,
        }
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_end(&self) -> bool {
        self.at.is_none()
    }

    /// The entry this cursor denotes, `None` at the end.
    pub fn id(&self) -> Option<&EntryId> {
        self.at.as_ref()
    }

    /// The application this cursor is restricted to, if any.
    pub fn app(&self) -> Option<AppId> {
        match &self.scope {
            Scope::Global => None,
            Scope::App(app) | Scope::Singleton(app, _) => Some(*app),
        }
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for Cursor {}
