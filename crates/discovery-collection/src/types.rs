//! Core types for collections
//!
//! Defines the vocabulary shared by collections, views and fetchers:
//! - Entity identifiers (integer or string)
//! - The [`Entity`] trait for cached payloads
//! - Opaque query conditions
//! - Inclusive row ranges and their clamped windows

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Range;

/// Entity identifier as the server reports it
///
/// Equality is variant-sensitive: `Int(1)` and `Str("1")` are different
/// keys. Views that mix entity kinds normalise ids with
/// [`Identifier::to_string_form`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Numeric id
    Int(i64),
    /// String id
    Str(String),
}

impl Identifier {
    /// String form of this id
    #[inline]
    #[must_use]
    pub fn to_string_form(&self) -> Self {
        match self {
            Self::Int(value) => Self::Str(value.to_string()),
            Self::Str(value) => Self::Str(value.clone()),
        }
    }

    /// Consume into string form
    #[inline]
    #[must_use]
    pub fn into_string_form(self) -> Self {
        match self {
            Self::Int(value) => Self::Str(value.to_string()),
            Self::Str(_) => self,
        }
    }

    /// Numeric value, if this is an integer id
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(_) => None,
        }
    }

    /// String value, if this is a string id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(value) => Some(value),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A cached domain record
///
/// Collections only look at the identifier. `set_id` is used when a view
/// normalises ids to their string form before merging.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier of this record
    fn id(&self) -> Identifier;

    /// Replace the identifier of this record
    fn set_id(&mut self, id: Identifier);
}

/// Schemaless record: an id plus arbitrary JSON fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: Identifier,
    /// Remaining fields, uninterpreted
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create record without fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// With an extra field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Field lookup
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Entity for Record {
    fn id(&self) -> Identifier {
        self.id.clone()
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = id;
    }
}

/// Filter, search and sort options of a view
///
/// Passed through to the fetcher untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Map<String, Value>);

impl Conditions {
    /// Create empty conditions
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an extra condition
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a condition, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Condition lookup
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate conditions
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of conditions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no conditions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Conditions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Inclusive range of row indices requested by a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    /// First row index
    pub start: usize,
    /// Last row index (inclusive)
    pub stop: usize,
}

impl RowRange {
    /// Create range `[start, stop]`
    #[inline]
    #[must_use]
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Rows of page `page` for the given page size
    #[inline]
    #[must_use]
    pub fn page(page: usize, page_size: usize) -> Self {
        let start = page.saturating_mul(page_size);
        Self {
            start,
            stop: start.saturating_add(page_size.saturating_sub(1)),
        }
    }

    /// Indices this range covers once the result-set size is known
    ///
    /// With `known_len == None` the full requested range is returned.
    /// The window is empty when the range starts past the known end.
    #[must_use]
    pub fn window(&self, known_len: Option<usize>) -> Range<usize> {
        let requested_end = self.stop.saturating_add(1);
        let end = match known_len {
            Some(len) => len.min(requested_end),
            None => requested_end,
        };
        self.start..end.max(self.start)
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.stop)
    }
}
