//! JSON carried through untouched.
//!
//! The descriptor and the automatic-path token are opaque: they must leave
//! exactly as they arrived. [`RawJson`] keeps the validated source text and
//! writes it back verbatim when serialized, so key order, number spelling and
//! escapes survive.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::Value;

/// Validated JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawJson {
    text: String,
}

impl RawJson {
    /// Validates `text` and keeps it.
    ///
    /// Whitespace around the value is dropped; everything inside it is kept
    /// byte for byte.
    ///
    /// # Errors
    ///
    /// Returns the parser error if `text` is not a single JSON value.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let raw: &RawValue = serde_json::from_str(text)?;
        Ok(Self {
            text: raw.get().to_string(),
        })
    }

    /// Serializes an in-memory value.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            text: value.to_string(),
        }
    }

    /// The JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parses the text into a [`Value`], keeping key order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

impl From<Value> for RawJson {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl fmt::Display for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(self.text.clone()).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self {
            text: raw.get().to_string(),
        })
    }
}
