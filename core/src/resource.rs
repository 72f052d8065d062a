//! The capability a type needs to be dispatched.
//!
//! # Design
//! A resource is a named bag of fields. The dispatcher never looks inside a
//! concrete resource type; it reads fields as a JSON object for payloads and
//! path fallback, and writes fields back from a response body. Typed structs
//! get both directions from serde through `serde_fields` / `merge_serde_fields`;
//! `Record` is an untyped bag for kinds without a struct.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};
use crate::http::ApiResponse;

/// Server-side state observed by the last dispatch on a resource instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    last_response: Option<ApiResponse>,
    last_known_snapshot: Option<Map<String, Value>>,
}

impl ResourceState {
    pub fn last_response(&self) -> Option<&ApiResponse> {
        self.last_response.as_ref()
    }

    /// Fields as of the last hydration; baseline for partial updates.
    pub fn last_known_snapshot(&self) -> Option<&Map<String, Value>> {
        self.last_known_snapshot.as_ref()
    }

    /// JSON body of the last response, if it had one.
    pub fn json_source(&self) -> Option<&Value> {
        self.last_response.as_ref().and_then(|r| r.json_body.as_ref())
    }

    pub(crate) fn set_last_response(&mut self, response: ApiResponse) {
        self.last_response = Some(response);
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: Map<String, Value>) {
        self.last_known_snapshot = Some(snapshot);
    }
}

/// A dispatchable resource.
pub trait Resource {
    /// Registry key of this resource's kind.
    fn kind(&self) -> &str;

    /// Current fields as a JSON object.
    fn fields(&self) -> Result<Map<String, Value>>;

    /// Overwrite the given fields in place, leaving others untouched.
    fn merge_fields(&mut self, fields: Map<String, Value>) -> Result<()>;

    fn state(&self) -> &ResourceState;

    fn state_mut(&mut self) -> &mut ResourceState;
}

/// Serialize `value` into a JSON object of its fields.
pub fn serde_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DispatchError::resource(format!(
            "resource serialized to {} instead of an object",
            json_type(&other)
        ))),
        Err(e) => Err(DispatchError::Serialization(e.to_string())),
    }
}

/// Merge `fields` into `value` by round-tripping it through JSON. Unknown
/// fields are dropped by deserialization; a value of the wrong type fails
/// the whole merge and leaves `value` unchanged. The `ResourceState` of
/// `value` survives the round trip.
pub fn merge_serde_fields<T>(value: &mut T, fields: Map<String, Value>) -> Result<()>
where
    T: Resource + Serialize + DeserializeOwned,
{
    let mut current = serde_fields(value)?;
    current.extend(fields);
    let mut merged: T = serde_json::from_value(Value::Object(current))
        .map_err(|e| DispatchError::resource(format!("field copy failed: {e}")))?;
    std::mem::swap(merged.state_mut(), value.state_mut());
    *value = merged;
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Untyped resource: a kind name and a JSON object of fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    kind: String,
    fields: Map<String, Value>,
    state: ResourceState,
}

impl Record {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Resource for Record {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn fields(&self) -> Result<Map<String, Value>> {
        Ok(self.fields.clone())
    }

    fn merge_fields(&mut self, fields: Map<String, Value>) -> Result<()> {
        self.fields.extend(fields);
        Ok(())
    }

    fn state(&self) -> &ResourceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ResourceState {
        &mut self.state
    }
}
