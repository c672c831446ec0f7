//! EdgeWorkers calls

use serde_json::{Value, json};
use tracing::info;

use crate::error::ApiError;
use crate::transport::{ApiRequest, SharedTransport};

/// EdgeWorkers API
#[derive(Clone)]
pub struct EdgeWorkersApi {
    transport: SharedTransport,
}

impl EdgeWorkersApi {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Registers a new worker id.
    pub async fn create_id(
        &self,
        name: &str,
        group_id: u64,
        resource_tier_id: u64,
        description: &str,
    ) -> Result<u64, ApiError> {
        const CONTEXT: &str = "Create EdgeWorker id";
        let request = ApiRequest::post("/edgeworkers/v1/ids")
            .header("Accept", "application/json")
            .json(json!({
                "name": name,
                "groupId": group_id,
                "resourceTierId": resource_tier_id,
                "description": description,
            }));
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let id = body["edgeWorkerId"]
            .as_u64()
            .ok_or_else(|| ApiError::MissingField {
                context: CONTEXT.to_string(),
                field: "edgeWorkerId".to_string(),
            })?;
        info!(edgeworker_id = id, name, "Created EdgeWorker id");
        Ok(id)
    }

    /// Uploads a gzipped bundle; returns the version it was registered as.
    pub async fn upload_version(&self, edgeworker_id: u64, bundle: Vec<u8>) -> Result<String, ApiError> {
        const CONTEXT: &str = "Upload EdgeWorker version";
        let size = bundle.len();
        let request = ApiRequest::post(format!("/edgeworkers/v1/ids/{edgeworker_id}/versions"))
            .header("Accept", "application/json")
            .bytes(bundle, "application/gzip");
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let version = match &body["version"] {
            Value::String(v) => v.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(ApiError::MissingField {
                    context: CONTEXT.to_string(),
                    field: "version".to_string(),
                });
            }
        };
        info!(edgeworker_id, version = %version, size, "Uploaded EdgeWorker bundle");
        Ok(version)
    }

    pub async fn activate(
        &self,
        edgeworker_id: u64,
        version: &str,
        network: &str,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Activate EdgeWorker";
        let request = ApiRequest::post(format!("/edgeworkers/v1/ids/{edgeworker_id}/activations"))
            .header("Accept", "application/json")
            .json(json!({"network": network, "version": version}));
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;
        info!(edgeworker_id, version, network, "EdgeWorker activation submitted");
        response.json(CONTEXT)
    }
}
