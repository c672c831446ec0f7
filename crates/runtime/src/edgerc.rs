//! `.edgerc` credentials
//!
//! INI-style file with one section per client:
//!
//! ```text
//! [default]
//! host = akab-xxxx.luna.akamaiapis.net
//! client_token = akab-...
//! client_secret = ...
//! access_token = akab-...
//! max_body = 131072
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::CredentialsError;

pub const DEFAULT_SECTION: &str = "default";
pub const DEFAULT_MAX_BODY: usize = 131_072;

/// API client credentials from one `.edgerc` section.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub client_token: String,
    pub client_secret: String,
    pub access_token: String,
    /// Request bytes covered by the content hash
    pub max_body: usize,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("client_token", &"***")
            .field("client_secret", &"***")
            .field("access_token", &"***")
            .field("max_body", &self.max_body)
            .finish()
    }
}

impl Credentials {
    /// Parses `section` out of `.edgerc` text.
    pub fn parse(text: &str, section: &str) -> Result<Self, CredentialsError> {
        let sections = parse_sections(text);
        let values = sections
            .get(section)
            .ok_or_else(|| CredentialsError::MissingSection {
                section: section.to_string(),
            })?;

        let get = |key: &str| -> Result<String, CredentialsError> {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| CredentialsError::MissingKey {
                    section: section.to_string(),
                    key: key.to_string(),
                })
        };

        let max_body = match values.get("max_body") {
            Some(raw) => raw.parse().map_err(|_| CredentialsError::InvalidValue {
                key: "max_body".to_string(),
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_BODY,
        };

        let host = get("host")?;
        let host = host
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host,
            client_token: get("client_token")?,
            client_secret: get("client_secret")?,
            access_token: get("access_token")?,
            max_body,
        })
    }

    /// Reads `section` from `path`, or from `~/.edgerc` when no path is given.
    pub fn load(path: Option<&Path>, section: &str) -> Result<Self, CredentialsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_edgerc_path()?,
        };
        if !path.exists() {
            return Err(CredentialsError::NotFound { path });
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|source| CredentialsError::Io { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), section, "Loading EdgeGrid credentials");
        Self::parse(&text, section)
    }

    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

pub fn default_edgerc_path() -> Result<PathBuf, CredentialsError> {
    dirs::home_dir()
        .map(|home| home.join(".edgerc"))
        .ok_or(CredentialsError::NoHomeDir)
}

fn parse_sections(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let Some(section) = &current else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.to_string());
        }
    }

    sections
}
