use reqwest::{Client, Method, StatusCode, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::errors::ClientError;

/// Thin JSON-over-HTTP client for the trainer backend.
///
/// Every call goes through [`ApiClient::request`]: one URL-joining rule, one
/// auth header rule, one body-parsing rule, one error shape. Cloning is cheap;
/// the underlying `reqwest::Client` is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url`. When `timeout` is set every request
    /// carries that deadline; expiry surfaces as [`ClientError::Transport`].
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exactly one slash between base and path, whatever the inputs carried.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, ClientError> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        self.request(Method::POST, path, token, body).await
    }

    /// Send one request and settle it into a parsed JSON value.
    ///
    /// The body is read as text first; non-empty text that fails to parse is
    /// treated as "no structured body" (warned, not raised). Any non-2xx
    /// status becomes [`ClientError::Request`] with the body's `message` (or
    /// the backend's `detail`) when present.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, url = %url, has_token = token.is_some(), "sending request");

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed = parse_body(&url, &text);

        if !status.is_success() {
            let message = error_message(&parsed, path, status);
            error!(method = %method, url = %url, status = %status, message = %message, "request failed");
            return Err(ClientError::Request(message));
        }

        debug!(method = %method, url = %url, status = %status, "request completed");
        Ok(parsed)
    }
}

fn parse_body(url: &str, text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(url = %url, error = %err, "response body is not valid JSON, ignoring it");
            Value::Null
        }
    }
}

fn error_message(parsed: &Value, path: &str, status: StatusCode) -> String {
    parsed
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| parsed.get("detail").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("request to {} failed with status {}", path, status.as_u16()))
}
