//! Tri-state values for declarative record fields.
//!
//! A field in a planned or observed record is either null, unknown (the host
//! cannot know it until apply, e.g. a computed id), or a known value. All record
//! comparisons in the diff engine go through [`Field::differs_from`], so an
//! unknown planned value can never produce an update action.
//!
//! In state JSON a field serializes as `null`, as [`UNKNOWN_VALUE`], or as the
//! plain value. A missing key deserializes as [`Field::Null`] when the
//! containing struct uses `#[serde(default)]`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel string the host uses for values that are not known until apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// A record field that may be null, unknown, or known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Explicitly unset.
    Null,
    /// Not known until the remote computes it.
    Unknown,
    /// A resolved value.
    Known(T),
}

impl<T> Field<T> {
    /// Create a known field.
    pub fn known(value: impl Into<T>) -> Self {
        Self::Known(value.into())
    }

    /// Map an optional wire value: `None` becomes [`Field::Null`].
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }

    /// Whether the field is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the field is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The known value, if any.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// The known value, if any. Null and unknown both resolve to `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the field contents.
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Null => Field::Null,
            Self::Unknown => Field::Unknown,
            Self::Known(v) => Field::Known(v),
        }
    }

    /// Transform a known value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Null => Field::Null,
            Self::Unknown => Field::Unknown,
            Self::Known(v) => Field::Known(f(v)),
        }
    }

    /// Replace a null field with `value`; unknown and known fields are kept.
    pub fn or_default_to(self, value: T) -> Self {
        match self {
            Self::Null => Self::Known(value),
            other => other,
        }
    }

    /// Mark a computed field as not yet known unless it is already known.
    pub fn unknown_unless_known(self) -> Self {
        match self {
            Self::Known(v) => Self::Known(v),
            _ => Self::Unknown,
        }
    }
}

impl<T: PartialEq> Field<T> {
    /// Whether this planned field requires a change to `current`.
    ///
    /// Unknown planned values never differ.
    pub fn differs_from(&self, current: &Field<T>) -> bool {
        match self {
            Self::Unknown => false,
            planned => planned != current,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
            Self::Known(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::String(ref s) if s == UNKNOWN_VALUE => Ok(Self::Unknown),
            other => serde_json::from_value(other)
                .map(Self::Known)
                .map_err(D::Error::custom),
        }
    }
}
