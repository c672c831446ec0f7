//! EdgeWorker workflow
//!
//! Patches the worker source, packs the bundle, registers a new worker id,
//! uploads the bundle as its first version and activates it.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{WorkflowContext, join_path, skipped_activation};
use crate::bundle::{build_bundle, patch_main_js};
use crate::error::WorkflowError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeWorkerOutcome {
    pub edge_worker_id: u64,
    pub version: String,
    pub bundle_path: String,
    pub bundle_size: usize,
    pub activation: Value,
}

pub async fn run(ctx: &WorkflowContext) -> Result<EdgeWorkerOutcome, WorkflowError> {
    let requirements = &ctx.requirements;
    let worker = &requirements.edgeworker;
    let paths = &requirements.paths;
    let group_id = requirements.numeric_group_id()?;

    let main_js_path = join_path(&paths.edgeworker_dir, "main.js");
    let bundle_json_path = join_path(&paths.edgeworker_dir, "bundle.json");
    let bundle_path = join_path(&paths.edgeworker_dir, &paths.bundle_name);

    let source = ctx.files.read_to_string(&main_js_path).await?;
    let patched = patch_main_js(
        &source,
        &worker.harper_token,
        &requirements.subrequest_base_url(),
    )?;
    for name in &patched.missing {
        warn!(constant = *name, path = %main_js_path, "Constant not found in worker source");
    }
    ctx.files.write_string(&main_js_path, &patched.content).await?;

    let bundle_json = ctx.files.read_bytes(&bundle_json_path).await?;
    let bundle = build_bundle(patched.content.as_bytes(), &bundle_json)?;
    let bundle_size = bundle.len();
    ctx.files.write_bytes(&bundle_path, &bundle).await?;
    info!(path = %bundle_path, size = bundle_size, "Wrote EdgeWorker bundle");

    let api = ctx.edgeworkers();
    let edge_worker_id = api
        .create_id(
            &worker.name,
            group_id,
            worker.resource_tier_id,
            &worker.description,
        )
        .await?;
    let version = api.upload_version(edge_worker_id, bundle).await?;

    let activation = match ctx.network.api_network() {
        Some(network) => api.activate(edge_worker_id, &version, network).await?,
        None => {
            info!(edge_worker_id, "EdgeWorker activation skipped");
            skipped_activation(ctx.network)
        }
    };

    Ok(EdgeWorkerOutcome {
        edge_worker_id,
        version,
        bundle_path,
        bundle_size,
        activation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::MemoryFileStore;
    use crate::testing::MockTransport;
    use crate::transport::HttpMethod;
    use crate::workflows::fixtures;
    use edgeprov_core::ActivationNetwork;
    use serde_json::json;
    use std::sync::Arc;

    const MAIN_JS: &str = "const HARPPER_TOKEN = 'xxxxxxx';\n\
        const SUBREQUEST_BASE_URL = 'https://internal-harper-xxx.test.com';\n";

    fn files() -> Arc<MemoryFileStore> {
        Arc::new(
            MemoryFileStore::new()
                .with_file("data/edgeworker/main.js", MAIN_JS)
                .with_file("data/edgeworker/bundle.json", r#"{"edgeworker-version":"1.0"}"#),
        )
    }

    fn mock() -> MockTransport {
        MockTransport::new()
            .on(HttpMethod::Post, "/edgeworkers/v1/ids", 201, json!({"edgeWorkerId": 4242}))
            .on(
                HttpMethod::Post,
                "/edgeworkers/v1/ids/4242/versions",
                201,
                json!({"version": "1.0"}),
            )
            .on(
                HttpMethod::Post,
                "/edgeworkers/v1/ids/4242/activations",
                201,
                json!({"activationId": 1, "status": "PRESUBMIT"}),
            )
    }

    #[tokio::test]
    async fn test_patches_bundles_and_activates() {
        let mock = Arc::new(mock());
        let files = files();
        let ctx = fixtures::context(mock.clone(), files.clone(), ActivationNetwork::Production);

        let outcome = run(&ctx).await.unwrap();

        assert_eq!(outcome.edge_worker_id, 4242);
        assert_eq!(outcome.version, "1.0");
        assert_eq!(outcome.activation["status"], json!("PRESUBMIT"));
        assert_eq!(
            mock.calls(),
            vec![
                "POST /edgeworkers/v1/ids",
                "POST /edgeworkers/v1/ids/4242/versions",
                "POST /edgeworkers/v1/ids/4242/activations",
            ]
        );

        let create = mock.find(HttpMethod::Post, "/edgeworkers/v1/ids").unwrap();
        assert_eq!(create.json_body().unwrap()["groupId"], json!(12345));
        assert_eq!(create.json_body().unwrap()["resourceTierId"], json!(200));

        let activation = mock
            .find(HttpMethod::Post, "/edgeworkers/v1/ids/4242/activations")
            .unwrap();
        assert_eq!(activation.json_body().unwrap()["network"], json!("PRODUCTION"));

        let main_js = String::from_utf8(files.get("data/edgeworker/main.js").unwrap()).unwrap();
        assert!(main_js.contains("const HARPPER_TOKEN = 't0k3n';"));
        assert!(main_js.contains("const SUBREQUEST_BASE_URL = 'https://internal.example.com';"));
        assert_eq!(
            files.get("data/edgeworker/edgeworker_bundle.tgz").map(|b| b.len()),
            Some(outcome.bundle_size)
        );
    }

    #[tokio::test]
    async fn test_saveonly_skips_activation() {
        let mock = Arc::new(mock());
        let ctx = fixtures::context(mock.clone(), files(), ActivationNetwork::SaveOnly);

        let outcome = run(&ctx).await.unwrap();

        assert_eq!(outcome.activation, json!("skipped (saveonly)"));
        assert!(mock
            .find(HttpMethod::Post, "/edgeworkers/v1/ids/4242/activations")
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_bundle_json_fails_before_any_call() {
        let mock = Arc::new(mock());
        let files = Arc::new(MemoryFileStore::new().with_file("data/edgeworker/main.js", MAIN_JS));
        let ctx = fixtures::context(mock.clone(), files, ActivationNetwork::Staging);

        let err = run(&ctx).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Files(_)));
        assert!(mock.calls().is_empty());
    }
}
