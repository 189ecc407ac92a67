//! Name-based construction of caches and views.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::cache::SharedCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::local::{LocalCache, LOCAL_KIND};
use crate::view::{ParetoView, PARETO_KIND};

pub type CacheConstructor = Box<dyn Fn(&CacheConfig) -> CacheResult<SharedCache>>;
pub type ViewConstructor = Box<dyn Fn(SharedCache) -> CacheResult<SharedCache>>;

pub struct CacheFactory {
    caches: BTreeMap<String, CacheConstructor>,
    views: BTreeMap<String, ViewConstructor>,
}

impl CacheFactory {
    /// A factory knowing "Local" and "Pareto".
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register_cache(LOCAL_KIND, |config| {
            Ok(LocalCache::from_config(config)?.into_shared())
        });
        factory.register_view(PARETO_KIND, |core| Ok(ParetoView::over(core)?.into_shared()));
        factory
    }

    pub fn empty() -> Self {
        Self {
            caches: BTreeMap::new(),
            views: BTreeMap::new(),
        }
    }

    /// Register (or replace) an owning cache kind.
    pub fn register_cache(
        &mut self,
        kind: impl Into<String>,
        constructor: impl Fn(&CacheConfig) -> CacheResult<SharedCache> + 'static,
    ) {
        self.caches.insert(kind.into(), Box::new(constructor));
    }

    /// Register (or replace) a view kind.
    pub fn register_view(
        &mut self,
        kind: impl Into<String>,
        constructor: impl Fn(SharedCache) -> CacheResult<SharedCache> + 'static,
    ) {
        self.views.insert(kind.into(), Box::new(constructor));
    }

    pub fn create(&self, kind: &str, config: &CacheConfig) -> CacheResult<SharedCache> {
        let constructor = self.caches.get(kind).ok_or_else(|| unknown(kind))?;
        let cache = constructor(config)?;
        debug!(kind, "created cache");
        Ok(cache)
    }

    /// Build the cache `config.kind` names.
    pub fn create_from_config(&self, config: &CacheConfig) -> CacheResult<SharedCache> {
        self.create(&config.kind, config)
    }

    /// Build a view of kind `kind` already attached to `core`.
    pub fn create_view(&self, kind: &str, core: SharedCache) -> CacheResult<SharedCache> {
        let constructor = self.views.get(kind).ok_or_else(|| unknown(kind))?;
        let view = constructor(core)?;
        debug!(kind, "created view");
        Ok(view)
    }

    pub fn is_view(&self, kind: &str) -> bool {
        self.views.contains_key(kind)
    }

    /// Every registered kind, caches first, each group sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.caches
            .keys()
            .chain(self.views.keys())
            .map(String::as_str)
            .collect()
    }
}

fn unknown(kind: &str) -> CacheError {
    CacheError::UnknownKind {
        kind: kind.to_string(),
    }
}

impl Default for CacheFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFactory")
            .field("caches", &self.caches.keys().collect::<Vec<_>>())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}
