//! Routing metadata for resource methods.
//!
//! # Design
//! Each resource kind registers its logical methods up front through
//! `ResourceRoutes`. A method carries a list of `RouteAttribute`s; exactly
//! one `Endpoint` attribute is expected, and `EndpointRegistry::resolve`
//! turns it into an immutable `EndpointDescriptor`. Lookup is a pair of
//! hash-map reads and never inspects types at runtime.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{DispatchError, Result};
use crate::http::{HttpMethod, PayloadType};

/// What a PUT/POST payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadScope {
    /// Every field of the resource.
    #[default]
    Full,
    /// Only fields that differ from the last hydrated snapshot. POST always
    /// sends the full object.
    Changes,
}

/// Resolved routing metadata for one resource method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub verb: HttpMethod,
    pub path_template: String,
    pub payload_type: PayloadType,
    pub timeout: Duration,
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub payload_scope: PayloadScope,
}

impl EndpointDescriptor {
    pub fn new(verb: HttpMethod, path_template: &str) -> Self {
        Self {
            verb,
            path_template: path_template.to_string(),
            payload_type: PayloadType::Json,
            timeout: Duration::ZERO,
            retries: 0,
            payload_scope: PayloadScope::Full,
        }
    }

    pub fn payload_type(mut self, payload_type: PayloadType) -> Self {
        self.payload_type = payload_type;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn payload_scope(mut self, scope: PayloadScope) -> Self {
        self.payload_scope = scope;
        self
    }
}

/// Raw metadata attached to a method before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAttribute {
    Endpoint(EndpointDescriptor),
    /// Metadata of a kind the dispatcher does not understand.
    Unsupported(String),
}

/// Routes and type-level traits of one resource kind.
#[derive(Debug, Clone, Default)]
pub struct ResourceRoutes {
    kind: String,
    methods: HashMap<String, Vec<RouteAttribute>>,
    user_token: Option<String>,
    idempotent: bool,
}

impl ResourceRoutes {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn get(self, method: &str, path: &str) -> Self {
        self.endpoint(method, EndpointDescriptor::new(HttpMethod::Get, path))
    }

    pub fn post(self, method: &str, path: &str) -> Self {
        self.endpoint(method, EndpointDescriptor::new(HttpMethod::Post, path))
    }

    pub fn put(self, method: &str, path: &str) -> Self {
        self.endpoint(method, EndpointDescriptor::new(HttpMethod::Put, path))
    }

    pub fn delete(self, method: &str, path: &str) -> Self {
        self.endpoint(method, EndpointDescriptor::new(HttpMethod::Delete, path))
    }

    /// Register a fully specified endpoint for `method`.
    pub fn endpoint(self, method: &str, descriptor: EndpointDescriptor) -> Self {
        self.attributes(method, vec![RouteAttribute::Endpoint(descriptor)])
    }

    /// Register `method` with raw metadata. Later registrations of the same
    /// method replace earlier ones.
    pub fn attributes(mut self, method: &str, attributes: Vec<RouteAttribute>) -> Self {
        self.methods.insert(method.to_string(), attributes);
        self
    }

    /// Token used for this kind instead of the process-wide access token.
    pub fn user_token(mut self, token: &str) -> Self {
        self.user_token = Some(token.to_string()).filter(|t| !t.is_empty());
        self
    }

    /// Calls on this kind carry an idempotency key.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// Lookup table from `(kind, method)` to routing metadata.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    kinds: HashMap<String, ResourceRoutes>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, routes: ResourceRoutes) -> Self {
        self.kinds.insert(routes.kind.clone(), routes);
        self
    }

    /// Resolve the descriptor of `method` on `kind`.
    pub fn resolve(&self, kind: &str, method: &str) -> Result<EndpointDescriptor> {
        let attributes = self
            .kinds
            .get(kind)
            .and_then(|routes| routes.methods.get(method))
            .ok_or_else(|| DispatchError::resource("no annotated method found"))?;

        if attributes.is_empty() {
            return Err(DispatchError::resource("no rest method found"));
        }

        let mut resolved = None;
        for attribute in attributes {
            match attribute {
                RouteAttribute::Endpoint(descriptor) => {
                    if descriptor.path_template.is_empty() {
                        return Err(DispatchError::resource(format!(
                            "path not found for {} method",
                            descriptor.verb
                        )));
                    }
                    resolved = Some(descriptor);
                }
                RouteAttribute::Unsupported(_) => {
                    return Err(DispatchError::resource("not supported method found"));
                }
            }
        }

        let descriptor = resolved
            .cloned()
            .ok_or_else(|| DispatchError::resource("no rest method found"))?;
        tracing::debug!(
            kind,
            method,
            verb = %descriptor.verb,
            path = %descriptor.path_template,
            "resolved endpoint"
        );
        Ok(descriptor)
    }

    pub fn user_token(&self, kind: &str) -> Option<&str> {
        self.kinds.get(kind).and_then(|r| r.user_token.as_deref())
    }

    pub fn is_idempotent(&self, kind: &str) -> bool {
        self.kinds.get(kind).is_some_and(|r| r.idempotent)
    }
}
