//! Outgoing payload construction, body encoding, and response hydration.

use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};
use crate::http::{HttpMethod, PayloadType};
use crate::registry::PayloadScope;
use crate::resource::Resource;

/// Fields to send for `verb`, or `None` for GET and DELETE.
///
/// With `PayloadScope::Changes`, a PUT sends only the fields whose value
/// differs from the last hydrated snapshot; a resource never hydrated sends
/// everything.
pub fn build_payload<R: Resource + ?Sized>(
    verb: HttpMethod,
    scope: PayloadScope,
    resource: &R,
) -> Result<Option<Map<String, Value>>> {
    if !verb.requires_payload() {
        return Ok(None);
    }
    let fields = resource.fields()?;
    let payload = match (verb, scope, resource.state().last_known_snapshot()) {
        (HttpMethod::Put, PayloadScope::Changes, Some(snapshot)) => {
            changed_fields(fields, snapshot)
        }
        _ => fields,
    };
    Ok(Some(payload))
}

fn changed_fields(fields: Map<String, Value>, snapshot: &Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter(|(name, value)| snapshot.get(name) != Some(value))
        .collect()
}

/// Encode a payload as a request body.
pub fn encode_body(payload_type: PayloadType, payload: &Map<String, Value>) -> Result<String> {
    match payload_type {
        PayloadType::Json => serde_json::to_string(payload)
            .map_err(|e| DispatchError::Serialization(e.to_string())),
        PayloadType::FormUrlEncoded => {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in payload {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        form.append_pair(name, s);
                    }
                    other => {
                        form.append_pair(name, &other.to_string());
                    }
                }
            }
            Ok(form.finish())
        }
    }
}

/// Copy every field of a JSON object body onto `resource`, then record the
/// result as the new snapshot. Bodies that are not objects leave the
/// resource untouched.
pub fn hydrate<R: Resource + ?Sized>(resource: &mut R, body: &Value) -> Result<()> {
    let Value::Object(fields) = body else {
        tracing::debug!(
            kind = resource.kind(),
            "response body is not an object, skipping hydration"
        );
        return Ok(());
    };
    resource.merge_fields(fields.clone())?;
    let snapshot = resource.fields()?;
    resource.state_mut().set_snapshot(snapshot);
    Ok(())
}
