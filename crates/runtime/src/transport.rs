//! HTTP capability
//!
//! Workflows talk to the control plane through `ApiTransport`. The
//! production implementation signs every request with EdgeGrid and sends
//! it with reqwest; tests substitute a scripted transport.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::edgerc::Credentials;
use crate::error::ApiError;
use crate::signer::EdgeGridSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Json(Value),
    Bytes { data: Vec<u8>, content_type: String },
}

/// A control-plane request relative to the API host.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Bytes {
            data,
            content_type: content_type.into(),
        };
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Serialized body and its default content type.
    fn encode_body(&self) -> Result<(Vec<u8>, Option<String>), ApiError> {
        match &self.body {
            RequestBody::None => Ok((Vec::new(), None)),
            RequestBody::Json(value) => {
                let data = serde_json::to_vec(value).map_err(|e| ApiError::Decode {
                    context: format!("{} {}", self.method, self.path),
                    reason: e.to_string(),
                })?;
                Ok((data, Some("application/json".to_string())))
            }
            RequestBody::Bytes { data, content_type } => {
                Ok((data.clone(), Some(content_type.clone())))
            }
        }
    }
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn from_json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decode {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }

    /// Passes the response through when its status is one of `expected`.
    pub fn ensure_status(self, expected: &[u16], context: &str) -> Result<Self, ApiError> {
        if expected.contains(&self.status) {
            Ok(self)
        } else {
            Err(ApiError::Status {
                context: context.to_string(),
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Sends control-plane requests.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub type SharedTransport = Arc<dyn ApiTransport>;

/// EdgeGrid-signed reqwest client.
pub struct EdgeGridClient {
    client: reqwest::Client,
    base_url: Url,
    signer: EdgeGridSigner,
    account_switch_key: Option<String>,
}

impl fmt::Debug for EdgeGridClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeGridClient")
            .field("base_url", &self.base_url.as_str())
            .field("account_switch_key", &self.account_switch_key.is_some())
            .finish()
    }
}

impl EdgeGridClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(
        credentials: Credentials,
        account_switch_key: Option<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(&credentials.base_url())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", credentials.base_url())))?;
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            signer: EdgeGridSigner::new(credentials),
            account_switch_key: account_switch_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a request, account switch key included.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", request.path)))?;

        let mut pairs: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(key) = &self.account_switch_key {
            pairs.push(("accountSwitchKey", key.as_str()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiTransport for EdgeGridClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request)?;
        let (body, content_type) = request.encode_body()?;
        let authorization = self
            .signer
            .authorization(request.method.as_str(), &url, &body)?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(reqwest::header::AUTHORIZATION, authorization);

        if let Some(content_type) = content_type {
            if request.header_value("content-type").is_none() {
                builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !matches!(request.body, RequestBody::None) {
            builder = builder.body(body);
        }

        debug!(method = %request.method, path = %request.path, "Sending API request");
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Read response failed: {e}")))?;
        debug!(method = %request.method, path = %request.path, status, "API response");

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
