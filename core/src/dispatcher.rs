//! Orchestrates one resource method call end to end.
//!
//! # Design
//! `Dispatcher::dispatch` runs a single pass: resolve the descriptor, expand
//! the URL, build the payload, consult the cache, call the transport on a
//! miss, hydrate on a 2xx non-DELETE response, then record the response on
//! the resource. The dispatcher keeps no per-call state of its own; the
//! idempotency key and cache preference travel in `RequestContext`. It is
//! `Send + Sync` and may be shared across threads.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::config::ConfigProvider;
use crate::error::Result;
use crate::http::{ApiResponse, HttpMethod};
use crate::path::{expand_template, full_url, RequestParameters};
use crate::payload::{build_payload, hydrate};
use crate::registry::{EndpointDescriptor, EndpointRegistry};
use crate::resource::Resource;
use crate::transport::RestClient;

pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Per-call inputs that are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub params: RequestParameters,
    pub use_cache: bool,
    /// Sent as `x-idempotency-key`. Idempotent kinds get a fresh key when unset.
    pub idempotency_key: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: RequestParameters) -> Self {
        self.params = params;
        self
    }

    pub fn cached(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_idempotency_key(mut self, key: &str) -> Self {
        self.idempotency_key = Some(key.to_string());
        self
    }
}

/// Resource method dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<dyn ConfigProvider>,
    registry: Arc<EndpointRegistry>,
    cache: Arc<ResponseCache>,
    client: RestClient,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.config.base_url())
            .field("registry", &self.registry)
            .field("client", &self.client)
            .finish()
    }
}

impl Dispatcher {
    /// Dispatcher over the process-wide cache and a `ureq` transport.
    pub fn new(config: Arc<dyn ConfigProvider>, registry: EndpointRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            cache: ResponseCache::shared(),
            client: RestClient::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_client(mut self, client: RestClient) -> Self {
        self.client = client;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Run `method` against `resource`, updating it in place.
    ///
    /// Fields change only on a 2xx response to a non-DELETE call. The
    /// response is recorded as the resource's last response whenever one was
    /// received, including non-2xx responses.
    pub fn dispatch<R: Resource + ?Sized>(
        &self,
        resource: &mut R,
        method: &str,
        ctx: &RequestContext,
    ) -> Result<()> {
        let kind = resource.kind().to_string();
        let descriptor = self.registry.resolve(&kind, method)?;
        let url = self.resolve_url(&kind, &descriptor, &ctx.params, resource)?;
        let payload = build_payload(descriptor.verb, descriptor.payload_scope, resource)?;
        let key = ResponseCache::key(descriptor.verb, &url);

        let cached = if ctx.use_cache {
            self.cache.get(&key)
        } else {
            None
        };
        let response = match cached {
            Some(hit) => {
                tracing::debug!(kind = %kind, method, "served from cache");
                hit
            }
            None => {
                let headers = self.headers(&kind, ctx);
                let response = self.client.execute_request(
                    descriptor.verb,
                    &url,
                    descriptor.payload_type,
                    payload.as_ref(),
                    &headers,
                    descriptor.timeout,
                    descriptor.retries,
                )?;
                self.update_cache(&key, &url, descriptor.verb, ctx.use_cache, &response);
                response
            }
        };

        tracing::debug!(
            kind = %kind,
            method,
            status = response.status_code,
            from_cache = response.from_cache,
            "dispatch finished"
        );

        let hydrated = match &response.json_body {
            Some(body) if response.is_success() && descriptor.verb != HttpMethod::Delete => {
                hydrate(resource, body)
            }
            _ => Ok(()),
        };
        resource.state_mut().set_last_response(response);
        hydrated
    }

    /// Default-construct an `R` and run `method` on it.
    pub fn load<R: Resource + Default>(&self, method: &str, ctx: &RequestContext) -> Result<R> {
        let mut resource = R::default();
        self.dispatch(&mut resource, method, ctx)?;
        Ok(resource)
    }

    /// Run `method` with `id` as the first positional path parameter.
    pub fn find<R: Resource + Default>(
        &self,
        method: &str,
        id: &str,
        use_cache: bool,
    ) -> Result<R> {
        let ctx = RequestContext::new()
            .with_params(RequestParameters::positional(&[id]))
            .cached(use_cache);
        self.load(method, &ctx)
    }

    fn resolve_url<R: Resource + ?Sized>(
        &self,
        kind: &str,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
        resource: &R,
    ) -> Result<String> {
        let fields = resource.fields()?;
        let token = self
            .registry
            .user_token(kind)
            .map(str::to_string)
            .or_else(|| self.config.access_token(kind));
        let path = expand_template(&descriptor.path_template, params, Some(&fields))?;
        tracing::debug!(kind, verb = %descriptor.verb, path = %path, "resolved url");
        Ok(full_url(self.config.base_url(), &path, token.as_deref()))
    }

    fn headers(&self, kind: &str, ctx: &RequestContext) -> Vec<(String, String)> {
        let key = ctx.idempotency_key.clone().or_else(|| {
            self.registry
                .is_idempotent(kind)
                .then(|| Uuid::new_v4().to_string())
        });
        key.map(|k| vec![(IDEMPOTENCY_HEADER.to_string(), k)])
            .unwrap_or_default()
    }

    /// Store or evict the entry for this call. Unlike a plain opt-in store,
    /// only 2xx responses are kept, so an error status is never replayed from
    /// the cache. A successful DELETE also evicts the GET entry for `url`.
    fn update_cache(
        &self,
        key: &str,
        url: &str,
        verb: HttpMethod,
        use_cache: bool,
        response: &ApiResponse,
    ) {
        if !use_cache {
            self.cache.invalidate(key);
        } else if response.is_success() {
            self.cache.put(key, response);
        }
        if verb == HttpMethod::Delete && response.is_success() {
            self.cache.invalidate(&ResponseCache::key(HttpMethod::Get, url));
        }
    }
}
