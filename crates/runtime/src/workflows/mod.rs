//! Provisioning workflows
//!
//! Each workflow is a straight sequence of awaited control-plane calls. They
//! share a `WorkflowContext` and return a serializable outcome that ends up in
//! the run report.

pub mod customer_property;
pub mod edgeworker;
pub mod gtm;
pub mod internal_property;

pub use customer_property::CustomerPropertyOutcome;
pub use edgeworker::EdgeWorkerOutcome;
pub use gtm::{GtmOptions, GtmOutcome, PropagationPoll};
pub use internal_property::InternalPropertyOutcome;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use edgeprov_core::{ActivationNetwork, Requirements, SharedDiagnostics};
use serde_json::Value;
use tracing::info;

use crate::api::{EdgeWorkersApi, GtmApi, PapiApi, PapiScope};
use crate::error::WorkflowError;
use crate::file_store::{FileStore, SharedFileStore};
use crate::transport::SharedTransport;

/// The four workflows, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    Gtm,
    InternalProperty,
    EdgeWorker,
    CustomerProperty,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::Gtm,
        WorkflowKind::InternalProperty,
        WorkflowKind::EdgeWorker,
        WorkflowKind::CustomerProperty,
    ];

    /// Key of the workflow's section in the run report.
    pub fn report_key(&self) -> &'static str {
        match self {
            WorkflowKind::Gtm => "gtm",
            WorkflowKind::InternalProperty => "internalProperty",
            WorkflowKind::EdgeWorker => "edgeworker",
            WorkflowKind::CustomerProperty => "customerProperty",
        }
    }

    /// Name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Gtm => "gtm",
            WorkflowKind::InternalProperty => "internal-property",
            WorkflowKind::EdgeWorker => "edgeworker",
            WorkflowKind::CustomerProperty => "customer-property",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown workflow: {s}"))
    }
}

/// Everything a workflow needs for one run.
#[derive(Clone)]
pub struct WorkflowContext {
    pub requirements: Arc<Requirements>,
    pub transport: SharedTransport,
    pub files: SharedFileStore,
    pub network: ActivationNetwork,
    pub diagnostics: SharedDiagnostics,
}

impl WorkflowContext {
    pub fn scope(&self) -> PapiScope {
        PapiScope::from_requirements(&self.requirements)
    }

    pub fn papi(&self) -> PapiApi {
        PapiApi::new(self.transport.clone())
    }

    pub fn gtm(&self) -> GtmApi {
        GtmApi::new(self.transport.clone())
    }

    pub fn edgeworkers(&self) -> EdgeWorkersApi {
        EdgeWorkersApi::new(self.transport.clone())
    }
}

/// Reads and parses `requirements.json` through the file store.
pub async fn load_requirements(files: &dyn FileStore, path: &str) -> Result<Requirements, WorkflowError> {
    let text = files.read_to_string(path).await?;
    let requirements = Requirements::from_json_str(&text)?;
    info!(path, "Loaded requirements");
    Ok(requirements)
}

/// Report value for an activation that was not requested.
pub(crate) fn skipped_activation(network: ActivationNetwork) -> Value {
    Value::String(format!("skipped ({network})"))
}

/// `dir/name` for file-store paths.
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::file_store::MemoryFileStore;
    use crate::testing::MockTransport;
    use edgeprov_core::RecordingDiagnostics;

    pub const REQUIREMENTS: &str = r#"{
        "contractId": "ctr_1-ABCDE",
        "groupId": "grp_12345",
        "activationEmails": ["ops@example.com"],
        "gtmDomain": "example.akadns.net",
        "gtmPropertyName": "origin",
        "livenessHostHeader": "origin.example.com",
        "livenessTestObject": "/health",
        "datacenterDetails": "datacenters.csv",
        "propertyManager": {
            "customerFacingHostname": {"propertyName": "www.example.com", "propertyVersion": 7},
            "internalHarperHostname": {
                "internalPmConfigName": "internal-harper",
                "internalHostname": "internal.example.com",
                "edgeHostname": "internal.example.com.edgekey.net",
                "originHostname": "origin.example.com",
                "forwardCustomHeader": "origin.example.com"
            }
        },
        "edgeworker": {
            "name": "harper-ew",
            "resourceTierId": "200",
            "description": "Redirect and early hints",
            "harper_token": "t0k3n"
        }
    }"#;

    pub fn requirements() -> Requirements {
        Requirements::from_json_str(REQUIREMENTS).unwrap()
    }

    pub fn context(
        mock: Arc<MockTransport>,
        files: Arc<MemoryFileStore>,
        network: ActivationNetwork,
    ) -> WorkflowContext {
        WorkflowContext {
            requirements: Arc::new(requirements()),
            transport: mock,
            files,
            network,
            diagnostics: Arc::new(RecordingDiagnostics::new()),
        }
    }
}
