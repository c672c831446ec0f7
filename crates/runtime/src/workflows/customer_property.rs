//! Customer property workflow
//!
//! Injects the redirect + early-hints rule, bound to the new EdgeWorker, into
//! the customer-facing property as a new version.

use edgeprov_core::{InjectionOutcome, REQUIRED_VARIABLES, RuleInjector, RuleTree};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{WorkflowContext, skipped_activation};
use crate::error::WorkflowError;
use crate::file_store::FileStore;

pub const ACTIVATION_NOTE: &str = "Automated redirect + early hints injection";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPropertyOutcome {
    pub property_id: String,
    pub base_version: u64,
    pub new_version: u64,
    pub injection: InjectionOutcome,
    pub update_response: Value,
    pub activation: Value,
}

/// Reads a rule template; a malformed file is reported with its path.
pub async fn load_template(files: &dyn FileStore, path: &str) -> Result<RuleTree, WorkflowError> {
    let text = files.read_to_string(path).await?;
    serde_json::from_str(&text).map_err(|e| WorkflowError::Template {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

pub async fn run(
    ctx: &WorkflowContext,
    property_id: &str,
    edge_worker_id: u64,
) -> Result<CustomerPropertyOutcome, WorkflowError> {
    let requirements = &ctx.requirements;
    let base_version = requirements
        .property_manager
        .customer_facing_hostname
        .property_version;
    let scope = ctx.scope();
    let papi = ctx.papi();

    let mut document = papi.get_rules(&scope, property_id, base_version).await?;
    let template = load_template(ctx.files.as_ref(), &requirements.paths.rule_template).await?;

    let injector = RuleInjector::new(ctx.diagnostics.clone());
    let injection = injector.inject_with_identifier(
        &mut document.rules,
        template,
        edge_worker_id,
        &REQUIRED_VARIABLES,
    )?;
    info!(
        property_id,
        edge_worker_id,
        index = injection.index(),
        "Injected redirect rule"
    );

    let new_version = papi
        .create_version(&scope, property_id, base_version, document.etag.as_deref())
        .await?;
    let update_response = papi
        .update_rules(&scope, property_id, new_version, &document, None, true)
        .await?;

    let activation = match ctx.network.api_network() {
        Some(network) => {
            let emails = requirements.activation_emails.to_vec();
            papi.activate(&scope, property_id, new_version, network, &emails, ACTIVATION_NOTE)
                .await?
        }
        None => {
            info!(property_id, new_version, "Customer property activation skipped");
            skipped_activation(ctx.network)
        }
    };

    Ok(CustomerPropertyOutcome {
        property_id: property_id.to_string(),
        base_version,
        new_version,
        injection,
        update_response,
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

    const TEMPLATE_PATH: &str = "data/harper_redirect_earlyhints_rule.json";

    fn template() -> String {
        json!({
            "name": "Harper redirect and early hints",
            "behaviors": [{"name": "edgeWorker", "options": {"enabled": true, "edgeWorkerId": ""}}],
            "children": [{
                "name": "Early hints",
                "behaviors": [{"name": "edgeWorker", "options": {"edgeWorkerId": ""}}]
            }]
        })
        .to_string()
    }

    fn mock() -> MockTransport {
        MockTransport::new()
            .on(
                HttpMethod::Get,
                "/papi/v1/properties/prp_77/versions/7/rules",
                200,
                json!({
                    "etag": "etag-7",
                    "ruleFormat": "v2024-01-09",
                    "rules": {
                        "name": "default",
                        "children": [
                            {"name": "Performance"},
                            {"name": "Conditional origins", "behaviors": [{"name": "allowConditionalOrigins", "options": {}}]}
                        ]
                    }
                }),
            )
            .on(
                HttpMethod::Post,
                "/papi/v1/properties/prp_77/versions",
                201,
                json!({"versionLink": "/papi/v1/properties/prp_77/versions/8?contractId=ctr_1-ABCDE"}),
            )
            .on(HttpMethod::Put, "/papi/v1/properties/prp_77/versions/8/rules", 200, json!({"etag": "etag-8"}))
            .on(
                HttpMethod::Post,
                "/papi/v1/properties/prp_77/activations",
                201,
                json!({"activationLink": "/papi/v1/properties/prp_77/activations/atv_2"}),
            )
    }

    fn files() -> Arc<MemoryFileStore> {
        Arc::new(MemoryFileStore::new().with_file(TEMPLATE_PATH, template()))
    }

    #[tokio::test]
    async fn test_injects_into_new_version() {
        let mock = Arc::new(mock());
        let ctx = fixtures::context(mock.clone(), files(), ActivationNetwork::Staging);

        let outcome = run(&ctx, "prp_77", 4242).await.unwrap();

        assert_eq!(outcome.base_version, 7);
        assert_eq!(outcome.new_version, 8);
        assert_eq!(outcome.injection, InjectionOutcome::Inserted { index: 1 });
        assert_eq!(
            mock.calls(),
            vec![
                "GET /papi/v1/properties/prp_77/versions/7/rules",
                "POST /papi/v1/properties/prp_77/versions",
                "PUT /papi/v1/properties/prp_77/versions/8/rules",
                "POST /papi/v1/properties/prp_77/activations",
            ]
        );

        let version = mock.find(HttpMethod::Post, "/papi/v1/properties/prp_77/versions").unwrap();
        assert_eq!(
            version.json_body().unwrap(),
            &json!({"createFromVersion": 7, "createFromVersionEtag": "etag-7"})
        );

        let upload = mock
            .find(HttpMethod::Put, "/papi/v1/properties/prp_77/versions/8/rules")
            .unwrap();
        assert_eq!(upload.header_value("if-match"), None);
        assert_eq!(upload.query_value("validateRules"), None);
        let rules = &upload.json_body().unwrap()["rules"];
        assert_eq!(rules["children"][1]["name"], json!("Harper redirect and early hints"));
        assert_eq!(
            rules["children"][1]["behaviors"][0]["options"]["edgeWorkerId"],
            json!("4242")
        );
        assert_eq!(
            rules["children"][1]["children"][0]["behaviors"][0]["options"]["edgeWorkerId"],
            json!("4242")
        );
        let variables: Vec<&str> = rules["variables"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(variables, REQUIRED_VARIABLES.to_vec());

        let activation = mock
            .find(HttpMethod::Post, "/papi/v1/properties/prp_77/activations")
            .unwrap();
        assert_eq!(activation.json_body().unwrap()["propertyVersion"], json!(8));
    }

    #[tokio::test]
    async fn test_malformed_template_is_reported() {
        let mock = Arc::new(mock());
        let files = Arc::new(MemoryFileStore::new().with_file(TEMPLATE_PATH, "{not json"));
        let ctx = fixtures::context(mock.clone(), files, ActivationNetwork::Staging);

        let err = run(&ctx, "prp_77", 4242).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Template { ref path, .. } if path == TEMPLATE_PATH));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_saveonly_creates_version_without_activation() {
        let mock = Arc::new(mock());
        let ctx = fixtures::context(mock.clone(), files(), ActivationNetwork::SaveOnly);

        let outcome = run(&ctx, "prp_77", 4242).await.unwrap();
        assert_eq!(outcome.activation, json!("skipped (saveonly)"));
        assert!(mock
            .find(HttpMethod::Post, "/papi/v1/properties/prp_77/activations")
            .is_none());
    }
}
