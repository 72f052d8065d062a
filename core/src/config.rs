//! Credentials and base URL used by the dispatcher.
//!
//! # Design
//! Settings are collected by `CredentialsBuilder` and frozen into an
//! immutable `Credentials` value. A setting that already holds a value
//! cannot be reassigned; the builder rejects the second assignment with a
//! `Configuration` error instead of mutating shared state at runtime. The
//! dispatcher only reads configuration, through `ConfigProvider`.

use std::collections::HashMap;

use crate::error::{DispatchError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

/// Read-only view of configuration consulted on every dispatch.
pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;

    /// Access token to use for `resource_kind`, if any.
    fn access_token(&self, resource_kind: &str) -> Option<String>;
}

/// Immutable API credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    base_url: String,
    access_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    app_id: Option<String>,
}

impl Credentials {
    pub fn builder() -> CredentialsBuilder {
        CredentialsBuilder::default()
    }

    /// Credentials with only an access token against the default base URL.
    pub fn with_access_token(token: &str) -> Self {
        CredentialsBuilder {
            access_token: non_empty(token),
            ..CredentialsBuilder::default()
        }
        .build()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl ConfigProvider for Credentials {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn access_token(&self, _resource_kind: &str) -> Option<String> {
        self.access_token.clone()
    }
}

/// Set-once builder for `Credentials`.
#[derive(Debug, Clone, Default)]
pub struct CredentialsBuilder {
    base_url: Option<String>,
    access_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    app_id: Option<String>,
}

impl CredentialsBuilder {
    pub fn base_url(mut self, value: &str) -> Result<Self> {
        lock(&mut self.base_url, "baseUrl", value)?;
        Ok(self)
    }

    pub fn access_token(mut self, value: &str) -> Result<Self> {
        lock(&mut self.access_token, "accessToken", value)?;
        Ok(self)
    }

    pub fn client_id(mut self, value: &str) -> Result<Self> {
        lock(&mut self.client_id, "clientId", value)?;
        Ok(self)
    }

    pub fn client_secret(mut self, value: &str) -> Result<Self> {
        lock(&mut self.client_secret, "clientSecret", value)?;
        Ok(self)
    }

    pub fn app_id(mut self, value: &str) -> Result<Self> {
        lock(&mut self.app_id, "appId", value)?;
        Ok(self)
    }

    /// Apply a key map (`clientSecret`, `clientId`, `accessToken`, `appId`,
    /// `baseUrl`). Empty values and unknown keys are skipped.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let mut builder = Self::default();
        for (key, value) in params {
            builder = match key.as_str() {
                "clientSecret" => builder.client_secret(value)?,
                "clientId" => builder.client_id(value)?,
                "accessToken" => builder.access_token(value)?,
                "appId" => builder.app_id(value)?,
                "baseUrl" => builder.base_url(value)?,
                other => {
                    tracing::debug!(key = other, "ignoring unknown configuration key");
                    builder
                }
            };
        }
        Ok(builder)
    }

    /// Read `MP_ACCESS_TOKEN`, `MP_CLIENT_ID`, `MP_CLIENT_SECRET`, `MP_APP_ID`
    /// and `MP_BASE_URL` from the environment.
    pub fn from_env() -> Result<Self> {
        let vars = [
            ("MP_ACCESS_TOKEN", "accessToken"),
            ("MP_CLIENT_ID", "clientId"),
            ("MP_CLIENT_SECRET", "clientSecret"),
            ("MP_APP_ID", "appId"),
            ("MP_BASE_URL", "baseUrl"),
        ];
        let params = vars
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self::from_params(&params)
    }

    pub fn build(self) -> Credentials {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Credentials {
            base_url,
            access_token: self.access_token,
            client_id: self.client_id,
            client_secret: self.client_secret,
            app_id: self.app_id,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn lock(slot: &mut Option<String>, name: &str, value: &str) -> Result<()> {
    let Some(value) = non_empty(value) else {
        return Ok(());
    };
    if slot.is_some() {
        return Err(DispatchError::Configuration(format!(
            "{name} setting can not be changed"
        )));
    }
    *slot = Some(value);
    Ok(())
}
