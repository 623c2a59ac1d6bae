//! Entry identifiers scoped to a lorebook.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identifier of an entry within its lorebook.
///
/// The host writes uids as JSON numbers and uses them as object keys, so
/// both shapes are accepted, and integer uids are written back as numbers.
/// Digit-only uids order numerically and sort before any other uid, which
/// reproduces the host's key iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryUid(String);

impl EntryUid {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value when the uid is a canonical non-negative integer.
    fn numeric(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u64 = self.0.parse().ok()?;
        (value.to_string() == self.0).then_some(value)
    }

    /// Value of a canonical negative integer uid such as `-3`.
    fn negative(&self) -> Option<i64> {
        if !self.0.starts_with('-') {
            return None;
        }
        let value: i64 = self.0.parse().ok()?;
        (value < 0 && value.to_string() == self.0).then_some(value)
    }
}

impl fmt::Display for EntryUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for EntryUid {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for EntryUid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryUid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Ord for EntryUid {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for EntryUid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for EntryUid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(value) = self.numeric() {
            serializer.serialize_u64(value)
        } else if let Some(value) = self.negative() {
            serializer.serialize_i64(value)
        } else {
            serializer.serialize_str(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for EntryUid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UidVisitor)
    }
}

struct UidVisitor;

impl Visitor<'_> for UidVisitor {
    type Value = EntryUid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an entry uid as an integer or a string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(EntryUid::from(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(EntryUid(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(EntryUid::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(EntryUid(value))
    }
}
