//! EdgeGrid `EG1-HMAC-SHA256` request signing

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::edgerc::Credentials;
use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_SCHEME: &str = "EG1-HMAC-SHA256";

/// Signs requests with the credentials of one `.edgerc` section.
#[derive(Debug, Clone)]
pub struct EdgeGridSigner {
    credentials: Credentials,
}

impl EdgeGridSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `Authorization` header value for a request sent now.
    pub fn authorization(&self, method: &str, url: &Url, body: &[u8]) -> Result<String, ApiError> {
        let timestamp = edgegrid_timestamp(Utc::now());
        let nonce = uuid::Uuid::new_v4().to_string();
        self.sign_with(method, url, body, &timestamp, &nonce)
    }

    /// `Authorization` header value for a fixed timestamp and nonce.
    pub fn sign_with(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, ApiError> {
        let prefix = format!(
            "{AUTH_SCHEME} client_token={};access_token={};timestamp={timestamp};nonce={nonce};",
            self.credentials.client_token, self.credentials.access_token
        );

        let method = method.to_ascii_uppercase();
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ApiError::InvalidUrl(url.to_string())),
        };
        let relative = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let content_hash = self.content_hash(&method, body);

        let data_to_sign = [
            method.as_str(),
            url.scheme(),
            host.as_str(),
            relative.as_str(),
            "",
            content_hash.as_str(),
            prefix.as_str(),
        ]
        .join("\t");

        let signing_key = hmac_base64(self.credentials.client_secret.as_bytes(), timestamp)?;
        let signature = hmac_base64(signing_key.as_bytes(), &data_to_sign)?;
        Ok(format!("{prefix}signature={signature}"))
    }

    /// Base64 SHA-256 of the body, only for POST requests that carry one.
    pub fn content_hash(&self, method: &str, body: &[u8]) -> String {
        if !method.eq_ignore_ascii_case("POST") || body.is_empty() {
            return String::new();
        }
        let len = body.len().min(self.credentials.max_body);
        STANDARD.encode(Sha256::digest(&body[..len]))
    }
}

pub fn edgegrid_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H:%M:%S+0000").to_string()
}

fn hmac_base64(key: &[u8], data: &str) -> Result<String, ApiError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
