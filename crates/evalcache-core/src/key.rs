//! Cache keys and the generators that derive them from domain points.
//!
//! A [`CachedKey`] orders integer and binary coordinates exactly and real
//! coordinates by IEEE total order, lexicographically. Tolerance is handled
//! by the cache, not by the ordering: before storing or looking up a freshly
//! generated key, the cache asks the generator whether an already-stored key
//! of the same application [`KeyGenerator::matches`] it, and reuses that key
//! if so. Stored keys therefore stay strictly ordered.

use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::domain::Domain;
use crate::error::{CacheError, CacheResult};

/// Default tolerance of [`EpsilonKeyGenerator`].
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Ordered surrogate for a domain point.
///
/// The default (empty) key addresses the whole cache in
/// `erase_key`.
#[derive(Clone, Default)]
pub struct CachedKey {
    discrete: Vec<i64>,
    real: Vec<f64>,
}

impl CachedKey {
    pub fn new(discrete: Vec<i64>, real: Vec<f64>) -> Self {
        Self { discrete, real }
    }

    pub fn is_empty(&self) -> bool {
        self.discrete.is_empty() && self.real.is_empty()
    }

    /// Integer coordinates followed by binary coordinates (as 0/1).
    pub fn discrete(&self) -> &[i64] {
        &self.discrete
    }

    pub fn real(&self) -> &[f64] {
        &self.real
    }

    /// Smallest key sharing `self`'s discrete part whose leading real
    /// coordinate is `lead`.
    pub(crate) fn floor_at(&self, lead: f64) -> Self {
        let mut real = Vec::with_capacity(self.real.len());
        real.push(lead);
        Self {
            discrete: self.discrete.clone(),
            real,
        }
    }
}

impl PartialEq for CachedKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CachedKey {}

impl PartialOrd for CachedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CachedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.discrete.cmp(&other.discrete).then_with(|| {
            for (a, b) in self.real.iter().zip(&other.real) {
                match a.total_cmp(b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                }
            }
            self.real.len().cmp(&other.real.len())
        })
    }
}

impl fmt::Debug for CachedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CachedKey({:?}; {:?})", self.discrete, self.real)
    }
}

/// Converts domain points into cache keys.
pub trait KeyGenerator {
    /// Registry name ("Exact", "Epsilon").
    fn name(&self) -> &'static str;

    fn generate(&self, domain: &Domain) -> CachedKey;

    /// Largest per-coordinate distance at which two real coordinates still
    /// denote the same point.
    fn tolerance(&self) -> f64 {
        0.0
    }

    /// Whether `stored` and `candidate` denote the same point.
    fn matches(&self, stored: &CachedKey, candidate: &CachedKey) -> bool {
        let eps = self.tolerance();
        if eps == 0.0 {
            return stored == candidate;
        }
        stored.discrete == candidate.discrete
            && stored.real.len() == candidate.real.len()
            && stored
                .real
                .iter()
                .zip(&candidate.real)
                .all(|(a, b)| a == b || (a - b).abs() <= eps)
    }
}

fn discrete_coords(domain: &Domain) -> Vec<i64> {
    domain
        .int
        .iter()
        .copied()
        .chain(domain.binary.iter().map(|&b| i64::from(b)))
        .collect()
}

/// Keys match only on identical coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactKeyGenerator;

impl KeyGenerator for ExactKeyGenerator {
    fn name(&self) -> &'static str {
        "Exact"
    }

    fn generate(&self, domain: &Domain) -> CachedKey {
        CachedKey::new(discrete_coords(domain), domain.real.clone())
    }
}

/// Keys match when every real coordinate is within `epsilon`.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonKeyGenerator {
    epsilon: f64,
}

impl EpsilonKeyGenerator {
    pub fn new(epsilon: f64) -> CacheResult<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(CacheError::Config {
                message: format!("epsilon must be finite and non-negative, got {}", epsilon),
            });
        }
        if epsilon == 0.0 {
            warn!("epsilon key generator with zero tolerance behaves as exact matching");
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for EpsilonKeyGenerator {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl KeyGenerator for EpsilonKeyGenerator {
    fn name(&self) -> &'static str {
        "Epsilon"
    }

    fn generate(&self, domain: &Domain) -> CachedKey {
        // -0.0 and 0.0 are the same point but differ in total order.
        let real = domain
            .real
            .iter()
            .map(|&x| if x == 0.0 { 0.0 } else { x })
            .collect();
        CachedKey::new(discrete_coords(domain), real)
    }

    fn tolerance(&self) -> f64 {
        self.epsilon
    }
}
