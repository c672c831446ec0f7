//! Run report (`result.json`)

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::error::FileStoreError;
use crate::file_store::FileStore;
use crate::workflows::WorkflowKind;

/// Per-workflow results of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub customer_facing_property_id: String,
    pub customer_facing_property_version: u64,
    sections: Map<String, Value>,
}

impl RunReport {
    pub fn new(property_id: impl Into<String>, property_version: u64) -> Self {
        Self {
            customer_facing_property_id: property_id.into(),
            customer_facing_property_version: property_version,
            sections: Map::new(),
        }
    }

    pub fn record_success(&mut self, kind: WorkflowKind, outcome: Value) {
        self.sections.insert(kind.report_key().to_string(), outcome);
    }

    pub fn record_error(&mut self, kind: WorkflowKind, error: &dyn std::fmt::Display) {
        self.sections.insert(
            format!("{}Error", kind.report_key()),
            Value::String(error.to_string()),
        );
    }

    pub fn record_skipped(&mut self, kind: WorkflowKind, reason: &str) {
        self.sections.insert(
            format!("{}Skipped", kind.report_key()),
            Value::String(reason.to_string()),
        );
    }

    pub fn outcome(&self, kind: WorkflowKind) -> Option<&Value> {
        self.sections.get(kind.report_key())
    }

    pub fn error(&self, kind: WorkflowKind) -> Option<&str> {
        self.sections
            .get(&format!("{}Error", kind.report_key()))
            .and_then(Value::as_str)
    }

    pub fn skipped(&self, kind: WorkflowKind) -> Option<&str> {
        self.sections
            .get(&format!("{}Skipped", kind.report_key()))
            .and_then(Value::as_str)
    }

    pub fn has_failures(&self) -> bool {
        WorkflowKind::ALL.iter().any(|kind| self.error(*kind).is_some())
    }

    pub fn to_json(&self, timestamp: DateTime<Utc>) -> Value {
        let mut root = Map::new();
        root.insert(
            "customerFacingPropertyId".to_string(),
            json!(self.customer_facing_property_id),
        );
        root.insert(
            "customerFacingPropertyVersion".to_string(),
            json!(self.customer_facing_property_version),
        );
        root.extend(self.sections.clone());
        root.insert(
            "timestamp".to_string(),
            json!(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        Value::Object(root)
    }

    /// Writes the report as pretty JSON, replacing any previous file.
    pub async fn write(&self, files: &dyn FileStore, path: &str) -> Result<(), FileStoreError> {
        let text = serde_json::to_string_pretty(&self.to_json(Utc::now())).map_err(|e| {
            FileStoreError::Io {
                path: path.into(),
                source: std::io::Error::other(e),
            }
        })?;
        files.write_string(path, &text).await
    }
}
