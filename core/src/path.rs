//! Path template expansion.
//!
//! A template such as `/v1/customers/:customer_id/cards/:id` is scanned left
//! to right. Each `:` opens a placeholder that runs to the next `/` or the end
//! of the template. A placeholder takes, in order, the positional parameter
//! for its ordinal (first three only), the named parameter matching its
//! name, or the resource field of that name (upper-cased name first). The
//! expanded path is prefixed with the base URL and, when a token is known,
//! suffixed with `?access_token=<token>`. Nothing is URL-encoded.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};

/// Number of placeholders that may be filled positionally.
pub const MAX_POSITIONAL: usize = 3;

/// Per-call path parameters: positional keys `param0`..`param2` and named keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    values: HashMap<String, String>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters with `param0`, `param1`, ... taken from `values`.
    pub fn positional<S: AsRef<str>>(values: &[S]) -> Self {
        values
            .iter()
            .enumerate()
            .fold(Self::new(), |params, (i, v)| params.with_positional(i, v.as_ref()))
    }

    /// Set `param<index>`. Indexes past the positional bound are dropped.
    pub fn with_positional(mut self, index: usize, value: &str) -> Self {
        if index >= MAX_POSITIONAL {
            tracing::warn!(index, "positional parameter out of range, ignoring");
            return self;
        }
        self.values.insert(format!("param{index}"), value.to_string());
        self
    }

    pub fn with_named(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// Non-empty value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Expand `template` into a full request URL.
pub fn resolve_path(
    template: &str,
    params: &RequestParameters,
    fields: Option<&Map<String, Value>>,
    base_url: &str,
    access_token: Option<&str>,
) -> Result<String> {
    let path = expand_template(template, params, fields)?;
    Ok(full_url(base_url, &path, access_token))
}

/// Prefix an already expanded `path` with `base_url` and append the token.
pub fn full_url(base_url: &str, path: &str, access_token: Option<&str>) -> String {
    let mut url = String::with_capacity(base_url.len() + path.len());
    url.push_str(base_url);
    url.push_str(path);

    if let Some(token) = access_token.filter(|t| !t.is_empty()) {
        url.push_str("?access_token=");
        url.push_str(token);
    }
    url
}

/// Substitute every placeholder of `template`; no base URL, no token.
pub fn expand_template(
    template: &str,
    params: &RequestParameters,
    fields: Option<&Map<String, Value>>,
) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;
    let mut ordinal = 0;

    while let Some(start) = rest.find(':') {
        expanded.push_str(&rest[..start]);
        rest = &rest[start + 1..];
        let (name, tail) = rest.split_at(rest.find('/').unwrap_or(rest.len()));

        let value = placeholder_value(ordinal, name, params, fields).ok_or_else(|| {
            DispatchError::resource("no argument supplied/found for method path")
        })?;
        expanded.push_str(&value);

        rest = tail;
        ordinal += 1;
    }
    expanded.push_str(rest);
    Ok(expanded)
}

fn placeholder_value(
    ordinal: usize,
    name: &str,
    params: &RequestParameters,
    fields: Option<&Map<String, Value>>,
) -> Option<String> {
    if ordinal < MAX_POSITIONAL {
        if let Some(v) = params.get(&format!("param{ordinal}")) {
            return Some(v.to_string());
        }
    }
    if let Some(v) = params.get(name) {
        return Some(v.to_string());
    }
    let fields = fields?;
    fields
        .get(&name.to_uppercase())
        .or_else(|| fields.get(name))
        .and_then(segment_text)
}

/// Text of a field value as it appears in a path segment.
fn segment_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const BASE: &str = "https://api.example.com";

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn template_without_placeholders_is_kept() {
        let url =
            resolve_path("/v1/payments", &RequestParameters::new(), None, BASE, None).unwrap();
        assert_eq!(url, "https://api.example.com/v1/payments");
    }

    #[test]
    fn full_url_joins_expanded_path() {
        assert_eq!(
            full_url(BASE, "/v1/payments/7", Some("T")),
            "https://api.example.com/v1/payments/7?access_token=T"
        );
        assert_eq!(
            full_url(BASE, "/v1/payments/7", Some("")),
            "https://api.example.com/v1/payments/7"
        );
    }

    #[test]
    fn token_is_appended_as_query() {
        let url = resolve_path(
            "/v1/payments",
            &RequestParameters::new(),
            None,
            BASE,
            Some("TOKEN"),
        )
        .unwrap();
        assert_eq!(url, "https://api.example.com/v1/payments?access_token=TOKEN");
    }

    #[test]
    fn empty_token_is_omitted() {
        let url = resolve_path("/v1/payments", &RequestParameters::new(), None, BASE, Some(""))
            .unwrap();
        assert_eq!(url, "https://api.example.com/v1/payments");
    }

    #[test]
    fn positional_beats_named_beats_field() {
        let params = RequestParameters::positional(&["7"]).with_named("id", "9");
        let f = fields(json!({"id": 5}));
        let path = expand_template("/users/:id", &params, Some(&f)).unwrap();
        assert_eq!(path, "/users/7");

        let params = RequestParameters::new().with_named("id", "9");
        let path = expand_template("/users/:id", &params, Some(&f)).unwrap();
        assert_eq!(path, "/users/9");

        let path = expand_template("/users/:id", &RequestParameters::new(), Some(&f)).unwrap();
        assert_eq!(path, "/users/5");
    }

    #[test]
    fn positional_parameters_follow_placeholder_order() {
        let params = RequestParameters::positional(&["c1", "k9"]);
        let path = expand_template("/v1/customers/:customer_id/cards/:id", &params, None).unwrap();
        assert_eq!(path, "/v1/customers/c1/cards/k9");
    }

    #[test]
    fn fourth_placeholder_cannot_be_positional() {
        let params = RequestParameters::positional(&["a", "b", "c"]).with_named("d", "dd");
        let path = expand_template("/:a/:b/:c/:d", &params, None).unwrap();
        assert_eq!(path, "/a/b/c/dd");

        let params = RequestParameters::new().with_positional(3, "ignored");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_parameters_fall_through() {
        let params = RequestParameters::positional(&[""]).with_named("id", "");
        let f = fields(json!({"id": "from-field"}));
        let path = expand_template("/x/:id", &params, Some(&f)).unwrap();
        assert_eq!(path, "/x/from-field");
    }

    #[test]
    fn upper_cased_field_is_tried_first() {
        let f = fields(json!({"CODE": "AB"}));
        let path = expand_template("/x/:code", &RequestParameters::new(), Some(&f)).unwrap();
        assert_eq!(path, "/x/AB");

        let f = fields(json!({"CODE": "UP", "code": "low"}));
        let path = expand_template("/x/:code", &RequestParameters::new(), Some(&f)).unwrap();
        assert_eq!(path, "/x/UP");
    }

    #[test]
    fn trailing_literal_is_appended() {
        let params = RequestParameters::positional(&["42"]);
        let path = expand_template("/v1/payments/:id/refunds", &params, None).unwrap();
        assert_eq!(path, "/v1/payments/42/refunds");
    }

    #[test]
    fn unresolved_placeholder_fails() {
        let f = fields(json!({"id": null, "name": ""}));
        for template in ["/x/:id", "/x/:name", "/x/:missing"] {
            let err = expand_template(template, &RequestParameters::new(), Some(&f)).unwrap_err();
            assert!(matches!(err, DispatchError::Resource(_)));
            assert_eq!(err.to_string(), "no argument supplied/found for method path");
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let params = RequestParameters::positional(&["1"]);
        let f = fields(json!({"id": 3}));
        let a = resolve_path("/a/:id/b/:id", &params, Some(&f), BASE, Some("T")).unwrap();
        let b = resolve_path("/a/:id/b/:id", &params, Some(&f), BASE, Some("T")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https://api.example.com/a/1/b/3?access_token=T");
    }
}
