//! HTTP transport for the Orshot API.
//!
//! The host owns credentials and the HTTP stack, so both are reached through
//! the [`OrshotTransport`] trait. [`ReqwestTransport`] is the native
//! implementation; tests substitute an in-memory one.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde_json::Value;
use tracing::debug;

use crate::config::OrshotConfig;
use crate::error::{OrshotError, Result};
use crate::types::Credentials;

/// How the response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseEncoding {
    /// Decode as UTF-8 text (default).
    #[default]
    Text,
    /// Keep raw bytes.
    Binary,
}

/// A fully resolved request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers, including authorization.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Body transfer encoding.
    pub encoding: ResponseEncoding,
}

impl HttpRequest {
    /// Build an authenticated JSON request.
    pub fn authenticated(
        credentials: &Credentials,
        method: Method,
        url: impl Into<String>,
        body: Option<Value>,
        encoding: ResponseEncoding,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&credentials.bearer())
                .map_err(|e| OrshotError::config(format!("Invalid API token: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            method,
            url: url.into(),
            headers,
            body,
            encoding,
        })
    }
}

/// Response body in the encoding that was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Text body.
    Text(String),
    /// Raw body.
    Binary(Bytes),
}

/// A response with its status, whatever the status is.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase, empty if unknown.
    pub status_text: String,
    /// Body.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Whether the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded for binary bodies.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.body {
            ResponseBody::Text(text) => Cow::Borrowed(text),
            ResponseBody::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Body as raw bytes.
    pub fn bytes(&self) -> Bytes {
        match &self.body {
            ResponseBody::Text(text) => Bytes::from(text.clone()),
            ResponseBody::Binary(bytes) => bytes.clone(),
        }
    }

    /// Turn a non-2xx response into [`OrshotError::Api`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let body = self.text().into_owned();
        Err(OrshotError::Api {
            status: self.status,
            status_text: self.status_text,
            message: derive_error_message(self.status, &body),
            body,
        })
    }
}

/// Capability injected by the host: credentials plus an HTTP stack.
#[async_trait]
pub trait OrshotTransport: Send + Sync {
    /// Credentials to authenticate with.
    fn credentials(&self) -> &Credentials;

    /// Send a request. Non-2xx statuses are returned, not raised.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    credentials: Credentials,
}

impl ReqwestTransport {
    /// Create a transport from validated configuration.
    pub fn new(config: &OrshotConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            credentials: config.credentials(),
        })
    }
}

#[async_trait]
impl OrshotTransport for ReqwestTransport {
    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = match request.encoding {
            ResponseEncoding::Binary => ResponseBody::Binary(response.bytes().await?),
            ResponseEncoding::Text => ResponseBody::Text(response.text().await?),
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Authenticated GET returning the parsed JSON body.
pub async fn get_json(transport: &dyn OrshotTransport, url: &str) -> Result<Value> {
    let request = HttpRequest::authenticated(
        transport.credentials(),
        Method::GET,
        url,
        None,
        ResponseEncoding::Text,
    )?;
    let response = transport.request(request).await?.error_for_status()?;
    Ok(serde_json::from_str(&response.text())?)
}

/// Failure message for a non-2xx response.
///
/// Prefers the JSON body's `error` field, then `message`. A JSON body with
/// neither yields the bare status line; an unparsable body is appended raw.
pub fn derive_error_message(status: u16, body: &str) -> String {
    let base = format!("API request failed with status {}", status);

    match serde_json::from_str::<Value>(body) {
        Ok(value) => match field_text(&value, "error").or_else(|| field_text(&value, "message")) {
            Some(detail) => format!("{}: {}", base, detail),
            None => base,
        },
        Err(_) if body.is_empty() => format!("{}: Unknown error", base),
        Err(_) => format!("{}: {}", base, body),
    }
}

fn field_text(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            derive_error_message(404, r#"{"error":"template not found"}"#),
            "API request failed with status 404: template not found"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_message_field() {
        assert_eq!(
            derive_error_message(401, r#"{"error":"","message":"invalid token"}"#),
            "API request failed with status 401: invalid token"
        );
    }

    #[test]
    fn test_error_message_uses_raw_body_when_not_json() {
        assert_eq!(
            derive_error_message(502, "Bad Gateway"),
            "API request failed with status 502: Bad Gateway"
        );
    }

    #[test]
    fn test_error_message_json_without_fields_is_bare_status() {
        assert_eq!(
            derive_error_message(500, r#"{"detail":"x"}"#),
            "API request failed with status 500"
        );
        assert_eq!(
            derive_error_message(400, r#"{"error":false,"message":""}"#),
            "API request failed with status 400"
        );
        assert_eq!(
            derive_error_message(503, "null"),
            "API request failed with status 503"
        );
    }

    #[test]
    fn test_error_message_empty_body() {
        assert_eq!(
            derive_error_message(500, ""),
            "API request failed with status 500: Unknown error"
        );
    }

    #[test]
    fn test_authenticated_request_headers() {
        let creds = Credentials::new("tok", "https://api.orshot.com");
        let request = HttpRequest::authenticated(
            &creds,
            Method::GET,
            creds.endpoint("/v1/me/user_id"),
            None,
            ResponseEncoding::Text,
        )
        .unwrap();

        assert_eq!(request.headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.url, "https://api.orshot.com/v1/me/user_id");
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            body: ResponseBody::Text(String::new()),
        };
        assert!(ok.error_for_status().is_ok());

        let err = HttpResponse {
            status: 404,
            status_text: "Not Found".to_string(),
            body: ResponseBody::Binary(Bytes::from_static(br#"{"error":"template not found"}"#)),
        }
        .error_for_status()
        .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.to_string(),
            "API request failed with status 404: template not found"
        );
    }

    #[test]
    fn test_reqwest_transport_rejects_invalid_config() {
        assert!(ReqwestTransport::new(&OrshotConfig::default()).is_err());
        assert!(ReqwestTransport::new(&OrshotConfig::new("tok")).is_ok());
    }
}
