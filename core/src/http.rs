//! HTTP data types shared by the transport and the dispatcher.
//!
//! # Design
//! Requests and responses are plain owned data. The transport turns an
//! `HttpRequest` into an `HttpResponse`; everything above the transport only
//! sees `ApiResponse`, which adds the parsed JSON body and the cache flag.

use std::fmt;

use serde_json::Value;

/// HTTP verb of a resource method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST and PUT must carry a payload; GET and DELETE must not.
    pub fn requires_payload(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire encoding of a request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadType {
    #[default]
    Json,
    FormUrlEncoded,
}

impl PayloadType {
    pub fn content_type(self) -> &'static str {
        match self {
            PayloadType::Json => "application/json",
            PayloadType::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// A fully encoded request, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// What came back from one successful network round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Result of one resource method call, as recorded on the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub raw_body: String,
    /// Parsed body, absent when the body is not valid JSON.
    pub json_body: Option<Value>,
    /// Set only when the response was served from the response cache.
    pub from_cache: bool,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<HttpResponse> for ApiResponse {
    fn from(response: HttpResponse) -> Self {
        let json_body = serde_json::from_str(&response.body).ok();
        ApiResponse {
            status_code: response.status,
            raw_body: response.body,
            json_body,
            from_cache: false,
        }
    }
}
