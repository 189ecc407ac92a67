//! Response field maps: what an evaluation computed, by response kind.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Response kind tag.
///
/// Serialized with the short names evaluation layers use (`f`, `mf`, `cf`,
/// `g`, `cg`, `h`); any other name is kept as [`FieldTag::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldTag {
    Objective,
    MultiObjective,
    Constraints,
    Gradient,
    ConstraintGradients,
    Hessian,
    Custom(String),
}

impl FieldTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Objective => "f",
            Self::MultiObjective => "mf",
            Self::Constraints => "cf",
            Self::Gradient => "g",
            Self::ConstraintGradients => "cg",
            Self::Hessian => "h",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for FieldTag {
    fn from(name: String) -> Self {
        match name.as_str() {
            "f" => Self::Objective,
            "mf" => Self::MultiObjective,
            "cf" => Self::Constraints,
            "g" => Self::Gradient,
            "cg" => Self::ConstraintGradients,
            "h" => Self::Hessian,
            _ => Self::Custom(name),
        }
    }
}

impl From<&str> for FieldTag {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<FieldTag> for String {
    fn from(tag: FieldTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed response value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Real(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

impl FieldValue {
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<Vec<Vec<f64>>> for FieldValue {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Self::Matrix(v)
    }
}

/// Response values for one application at one domain point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseFieldMap {
    fields: BTreeMap<FieldTag, FieldValue>,
}

impl ResponseFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ResponseFieldMap::insert`].
    pub fn with(mut self, tag: impl Into<FieldTag>, value: impl Into<FieldValue>) -> Self {
        self.insert(tag, value);
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(
        &mut self,
        tag: impl Into<FieldTag>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(tag.into(), value.into())
    }

    pub fn get(&self, tag: &FieldTag) -> Option<&FieldValue> {
        self.fields.get(tag)
    }

    pub fn contains(&self, tag: &FieldTag) -> bool {
        self.fields.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &FieldTag> + '_ {
        self.fields.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FieldTag, FieldValue> {
        self.fields.iter()
    }

    /// The multi-objective vector, if this response carries one.
    pub fn objectives(&self) -> Option<&[f64]> {
        self.get(&FieldTag::MultiObjective)
            .and_then(FieldValue::as_vector)
    }

    /// Union on tags. Fields already present are never overwritten.
    ///
    /// Returns the tags that were newly added.
    pub fn merge(&mut self, other: &ResponseFieldMap) -> BTreeSet<FieldTag> {
        let mut added = BTreeSet::new();
        for (tag, value) in &other.fields {
            if let btree_map::Entry::Vacant(slot) = self.fields.entry(tag.clone()) {
                slot.insert(value.clone());
                added.insert(tag.clone());
            }
        }
        added
    }
}

impl FromIterator<(FieldTag, FieldValue)> for ResponseFieldMap {
    fn from_iter<I: IntoIterator<Item = (FieldTag, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResponseFieldMap {
    type Item = (&'a FieldTag, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, FieldTag, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
