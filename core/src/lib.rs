//! Synchronous dispatch engine for a REST payments API.
//!
//! # Overview
//! Turns logical resource methods ("find a payment", "save a card") into HTTP
//! calls and hydrates the resource from the JSON response. A method is looked
//! up in the `EndpointRegistry`, its path template is expanded against call
//! parameters or resource fields, the payload is built from the resource, the
//! response cache is consulted, and on a miss the `RestClient` performs the
//! call through a blocking `Transport`.
//!
//! # Design
//! - Routing metadata is registered up front; nothing is discovered at runtime.
//! - Configuration is an immutable value read through `ConfigProvider`.
//! - Resources implement `Resource`; serde structs get it almost for free via
//!   `serde_fields` / `merge_serde_fields`, and `Record` covers untyped kinds.
//! - Per-call state (parameters, cache preference, idempotency key) travels in
//!   `RequestContext`; the only shared mutable state is the `ResponseCache`.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod path;
pub mod payload;
pub mod registry;
pub mod resource;
pub mod transport;

pub use cache::{CacheConfig, ResponseCache};
pub use config::{ConfigProvider, Credentials, CredentialsBuilder};
pub use dispatcher::{Dispatcher, RequestContext};
pub use error::{DispatchError, ErrorKind, Result};
pub use http::{ApiResponse, HttpMethod, HttpRequest, HttpResponse, PayloadType};
pub use path::RequestParameters;
pub use registry::{
    EndpointDescriptor, EndpointRegistry, PayloadScope, ResourceRoutes, RouteAttribute,
};
pub use resource::{merge_serde_fields, serde_fields, Record, Resource, ResourceState};
pub use transport::{RestClient, SendError, Transport, UreqTransport};
