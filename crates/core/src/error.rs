//! Core error types

use thiserror::Error;

/// Structural precondition violated by a rule-tree edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleTreeError {
    #[error("Precondition failed: index {index} out of range for {len} children")]
    Precondition { index: usize, len: usize },
}

/// Requirements file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid requirements JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message() {
        let err = RuleTreeError::Precondition { index: 5, len: 2 };
        assert_eq!(
            err.to_string(),
            "Precondition failed: index 5 out of range for 2 children"
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::MissingField {
            field: "contractId".to_string(),
        };
        assert_eq!(err.to_string(), "Missing required field: contractId");

        let err = ConfigError::InvalidField {
            field: "groupId".to_string(),
            reason: "not numeric".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for groupId: not numeric");
    }
}
