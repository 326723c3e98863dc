use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::HubError;

/// The serializer handle shared by a hub proxy and everything layered on it.
///
/// Values are converted to wire form on the way out and decoded into the
/// caller's types on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonSerializer {
    skip_null_fields: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop object fields whose value is `null` when converting to wire form.
    pub fn skip_null_fields(mut self, skip: bool) -> Self {
        self.skip_null_fields = skip;
        self
    }

    pub fn skips_null_fields(&self) -> bool {
        self.skip_null_fields
    }

    /// Serializes a value into its wire form.
    pub fn to_wire<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, HubError> {
        let value = serde_json::to_value(value)?;
        Ok(self.normalize(value))
    }

    /// Applies the serializer settings to an already serialized value.
    pub fn normalize(&self, value: Value) -> Value {
        if self.skip_null_fields {
            strip_nulls(value)
        } else {
            value
        }
    }

    /// Decodes a wire value into `T`.
    pub fn from_wire<T: DeserializeOwned>(&self, value: Value) -> Result<T, HubError> {
        Ok(serde_json::from_value(value)?)
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
