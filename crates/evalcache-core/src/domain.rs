//! Application identities and domain points.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_APP_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of the problem an evaluation belongs to.
///
/// Only equality and hashing are meaningful; ids carry no order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(u64);

impl AppId {
    /// Mint a process-unique id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(NEXT_APP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a handle owned by the caller (e.g. an application registry slot).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

/// A mixed-variable domain point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub real: Vec<f64>,
    #[serde(default)]
    pub int: Vec<i64>,
    #[serde(default)]
    pub binary: Vec<bool>,
}

impl Domain {
    /// A purely continuous point.
    pub fn real(values: impl Into<Vec<f64>>) -> Self {
        Self {
            real: values.into(),
            ..Self::default()
        }
    }

    pub fn with_int(mut self, values: impl Into<Vec<i64>>) -> Self {
        self.int = values.into();
        self
    }

    pub fn with_binary(mut self, values: impl Into<Vec<bool>>) -> Self {
        self.binary = values.into();
        self
    }

    /// Total number of coordinates.
    pub fn len(&self) -> usize {
        self.real.len() + self.int.len() + self.binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<f64>> for Domain {
    fn from(values: Vec<f64>) -> Self {
        Self::real(values)
    }
}
