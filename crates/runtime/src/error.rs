//! Runtime error types

use edgeprov_core::{ConfigError, RuleTreeError};
use std::path::PathBuf;
use thiserror::Error;

/// `.edgerc` loading errors
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Credentials file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Section [{section}] not found in credentials file")]
    MissingSection { section: String },

    #[error("Missing '{key}' in section [{section}]")]
    MissingKey { section: String, key: String },

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Cannot locate the home directory for the default credentials file")]
    NoHomeDir,
}

/// Vendor API call errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("{context} failed with status {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {context} response: {reason}")]
    Decode { context: String, reason: String },

    #[error("{context} response has no {field}")]
    MissingField { context: String, field: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body of a status error, empty otherwise.
    pub fn body(&self) -> &str {
        match self {
            ApiError::Status { body, .. } => body,
            _ => "",
        }
    }
}

/// File store errors
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {path} is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },
}

/// Workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Files(#[from] FileStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rules(#[from] RuleTreeError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("GTM domain creation was rejected for {domain}\n{instructions}")]
    DomainForbidden { domain: String, instructions: String },

    #[error("Datacenter '{nickname}' already exists with id {id}")]
    DatacenterConflict { nickname: String, id: u64 },

    #[error("Invalid datacenter file {path}: {reason}")]
    Datacenters { path: String, reason: String },

    #[error("Invalid rule template {path}: {reason}")]
    Template { path: String, reason: String },

    #[error("Bundle error: {0}")]
    Bundle(String),

    #[error("Aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_accessors() {
        let err = ApiError::Status {
            context: "Create GTM domain".to_string(),
            status: 403,
            body: r#"{"type":"contractAccessProblem"}"#.to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert!(err.body().contains("contractAccessProblem"));
        assert_eq!(
            err.to_string(),
            r#"Create GTM domain failed with status 403: {"type":"contractAccessProblem"}"#
        );

        let err = ApiError::Network("timeout".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.body(), "");
    }

    #[test]
    fn test_workflow_error_is_transparent() {
        let err: WorkflowError = ApiError::Network("connection reset".to_string()).into();
        assert_eq!(err.to_string(), "Request failed: connection reset");

        let err: WorkflowError = RuleTreeError::Precondition { index: 3, len: 1 }.into();
        assert!(err.to_string().starts_with("Precondition failed"));
    }
}
