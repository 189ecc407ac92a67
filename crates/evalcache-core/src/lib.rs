//! Evaluation cache for optimization runs.
//!
//! This crate stores evaluated domain points keyed by a tolerant key, one
//! ordered index per application, providing:
//!
//! - Augmented inserts that merge newly computed response fields
//! - Exact, lower-bound and upper-bound lookups with scoped cursors
//! - Synchronous insert/update/erase/clear subscriptions
//! - Live Pareto views that can be stacked on top of each other
//! - Name-based construction of caches and views
//!
//! # Quick Start
//!
//! ```
//! use evalcache_core::{
//!     AppId, Cache, CacheConfig, CacheExt, CacheFactory, CacheRead, Domain, FieldTag,
//!     ResponseFieldMap,
//! };
//!
//! # fn main() -> Result<(), evalcache_core::CacheError> {
//! let factory = CacheFactory::new();
//! let core = factory.create("Local", &CacheConfig::default())?;
//! let front = factory.create_view("Pareto", core.clone())?;
//!
//! let app = AppId::new();
//! for (x, f) in [(0.0, [1.0, 1.0]), (1.0, [2.0, 2.0])] {
//!     let fields = ResponseFieldMap::new().with(FieldTag::MultiObjective, f.to_vec());
//!     core.borrow_mut().insert(app, &Domain::real(vec![x]), fields)?;
//! }
//!
//! assert_eq!(core.borrow().inspect(|c| c.size()), 2);
//! assert_eq!(front.borrow().inspect(|v| v.size()), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Field | Description |
//! |-------|-------------|
//! | `kind` | Cache kind for the factory (default: `Local`) |
//! | `key_generator.kind` | `exact` or `epsilon` (default: `epsilon`) |
//! | `key_generator.epsilon` | Match radius per real coordinate (default: `1e-10`) |

pub mod cache;
pub mod config;
pub mod cursor;
pub mod domain;
pub mod entry;
pub mod error;
pub mod factory;
pub mod index;
pub mod key;
pub mod local;
pub mod response;
pub mod signals;
pub mod view;

// Re-export main types
pub use cache::{Cache, CacheExt, CacheRead, KeyQuery, SharedCache};
pub use config::{CacheConfig, KeyGeneratorConfig};
pub use cursor::Cursor;
pub use domain::{AppId, Domain};
pub use entry::{CacheEntry, EntryId};
pub use error::{CacheError, CacheResult};
pub use factory::CacheFactory;
pub use index::OrderedIndex;
pub use key::{CachedKey, EpsilonKeyGenerator, ExactKeyGenerator, KeyGenerator, DEFAULT_EPSILON};
pub use local::{LocalCache, LOCAL_KIND};
pub use response::{FieldTag, FieldValue, ResponseFieldMap};
pub use signals::{ClearSlot, EraseSlot, InsertSlot, Signals, SubscriptionId, UpdateSlot};
pub use view::{dominates, ParetoView, Sense, PARETO_KIND};
