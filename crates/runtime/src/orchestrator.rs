//! Workflow orchestrator
//!
//! Runs the four workflows in order against one customer-facing property.
//! A failing workflow is recorded in the report and the run moves on; only
//! resolving the customer-facing property is fatal.

use std::future::Future;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::confirm::SharedConfirm;
use crate::error::WorkflowError;
use crate::report::RunReport;
use crate::workflows::{
    GtmOptions, WorkflowContext, WorkflowKind, customer_property, edgeworker, gtm,
    internal_property,
};

pub const SKIPPED_BY_REQUEST: &str = "skipped by request";
pub const NO_EDGEWORKER_ID: &str = "EdgeWorker workflow did not return an EdgeWorker id";

/// What a run should do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub skip: Vec<WorkflowKind>,
    pub gtm: GtmOptions,
}

impl RunOptions {
    pub fn skips(&self, kind: WorkflowKind) -> bool {
        self.skip.contains(&kind)
    }
}

pub struct WorkflowOrchestrator {
    ctx: WorkflowContext,
    confirm: SharedConfirm,
}

impl WorkflowOrchestrator {
    pub fn new(ctx: WorkflowContext, confirm: SharedConfirm) -> Self {
        Self { ctx, confirm }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunReport, WorkflowError> {
        let run_id = Uuid::new_v4();
        let customer = &self.ctx.requirements.property_manager.customer_facing_hostname;
        info!(
            run = %run_id,
            network = %self.ctx.network,
            property = %customer.property_name,
            "Starting provisioning run"
        );

        let property_id = self
            .ctx
            .papi()
            .find_property_id(&self.ctx.scope(), &customer.property_name)
            .await?;
        let mut report = RunReport::new(property_id.as_str(), customer.property_version);

        self.step(
            &mut report,
            run_id,
            WorkflowKind::Gtm,
            options,
            gtm::run(&self.ctx, &options.gtm, self.confirm.as_ref()),
        )
        .await;

        self.step(
            &mut report,
            run_id,
            WorkflowKind::InternalProperty,
            options,
            internal_property::run(&self.ctx),
        )
        .await;

        let edge_worker_id = self
            .step(
                &mut report,
                run_id,
                WorkflowKind::EdgeWorker,
                options,
                edgeworker::run(&self.ctx),
            )
            .await
            .map(|outcome| outcome.edge_worker_id);

        match edge_worker_id {
            Some(id) => {
                self.step(
                    &mut report,
                    run_id,
                    WorkflowKind::CustomerProperty,
                    options,
                    customer_property::run(&self.ctx, &property_id, id),
                )
                .await;
            }
            None if options.skips(WorkflowKind::CustomerProperty) => {
                report.record_skipped(WorkflowKind::CustomerProperty, SKIPPED_BY_REQUEST);
            }
            None => {
                warn!(run = %run_id, workflow = %WorkflowKind::CustomerProperty, "No EdgeWorker id; skipping");
                report.record_skipped(WorkflowKind::CustomerProperty, NO_EDGEWORKER_ID);
            }
        }

        info!(run = %run_id, failures = report.has_failures(), "Provisioning run finished");
        Ok(report)
    }

    /// Runs one workflow unless skipped and records what happened.
    async fn step<T, F>(
        &self,
        report: &mut RunReport,
        run_id: Uuid,
        kind: WorkflowKind,
        options: &RunOptions,
        work: F,
    ) -> Option<T>
    where
        T: Serialize,
        F: Future<Output = Result<T, WorkflowError>>,
    {
        if options.skips(kind) {
            info!(run = %run_id, workflow = %kind, "Workflow skipped");
            report.record_skipped(kind, SKIPPED_BY_REQUEST);
            return None;
        }

        info!(run = %run_id, workflow = %kind, "Running workflow");
        let outcome = match work.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run = %run_id, workflow = %kind, error = %e, "Workflow failed");
                report.record_error(kind, &e);
                return None;
            }
        };

        match serde_json::to_value(&outcome) {
            Ok(value) => {
                info!(run = %run_id, workflow = %kind, "Workflow completed");
                report.record_success(kind, value);
                Some(outcome)
            }
            Err(e) => {
                error!(run = %run_id, workflow = %kind, error = %e, "Workflow result not serializable");
                report.record_error(kind, &e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::FixedAnswer;
    use crate::file_store::MemoryFileStore;
    use crate::testing::MockTransport;
    use crate::transport::HttpMethod;
    use crate::workflows::{PropagationPoll, fixtures};
    use edgeprov_core::{ActivationNetwork, ReusePolicy};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const GTM_DOMAIN: &str = "/config-gtm/v1/domains/example.akadns.net";
    const INTERNAL_VERSION: &str = "/papi/v1/properties/prp_900/versions/1";

    fn files() -> Arc<MemoryFileStore> {
        Arc::new(
            MemoryFileStore::new()
                .with_file(
                    "datacenters.csv",
                    "nickname,city,stateOrProvince,country,latitude,longitude,servers\n\
                     east,New York,NY,US,40.71,-74.01,192.0.2.1\n",
                )
                .with_file("data/edgeworker/main.js", "const HARPPER_TOKEN = 'x';\n")
                .with_file("data/edgeworker/bundle.json", "{}")
                .with_file(
                    "data/harper_redirect_earlyhints_rule.json",
                    r#"{"name": "Harper", "behaviors": [{"name": "edgeWorker", "options": {"edgeWorkerId": ""}}]}"#,
                ),
        )
    }

    fn property_lookup() -> MockTransport {
        MockTransport::new().on(
            HttpMethod::Get,
            "/papi/v1/properties",
            200,
            json!({"properties": {"items": [
                {"propertyName": "other.example.com", "propertyId": "prp_1"},
                {"propertyName": "www.example.com", "propertyId": "prp_77"}
            ]}}),
        )
    }

    fn with_internal_property(mock: MockTransport) -> MockTransport {
        mock.on(HttpMethod::Post, "/papi/v1/cpcodes", 201, json!({"cpcodeLink": "/papi/v1/cpcodes/cpc_555"}))
            .on(HttpMethod::Post, "/papi/v1/properties", 201, json!({"propertyLink": "/papi/v1/properties/prp_900"}))
            .on(HttpMethod::Put, &format!("{INTERNAL_VERSION}/hostnames"), 200, json!({}))
            .on(HttpMethod::Get, &format!("{INTERNAL_VERSION}/rules"), 200, json!({"etag": "e1", "rules": {"name": "default"}}))
            .on(HttpMethod::Put, &format!("{INTERNAL_VERSION}/rules"), 200, json!({}))
            .on(HttpMethod::Post, "/papi/v1/properties/prp_900/activations", 201, json!({}))
    }

    fn with_edgeworker(mock: MockTransport) -> MockTransport {
        mock.on(HttpMethod::Post, "/edgeworkers/v1/ids", 201, json!({"edgeWorkerId": 4242}))
            .on(HttpMethod::Post, "/edgeworkers/v1/ids/4242/versions", 201, json!({"version": "1.0"}))
            .on(HttpMethod::Post, "/edgeworkers/v1/ids/4242/activations", 201, json!({}))
    }

    fn with_customer_property(mock: MockTransport) -> MockTransport {
        mock.on(
            HttpMethod::Get,
            "/papi/v1/properties/prp_77/versions/7/rules",
            200,
            json!({"etag": "e7", "rules": {"name": "default", "children": [{"name": "Performance"}]}}),
        )
        .on(
            HttpMethod::Post,
            "/papi/v1/properties/prp_77/versions",
            201,
            json!({"versionLink": "/papi/v1/properties/prp_77/versions/8"}),
        )
        .on(HttpMethod::Put, "/papi/v1/properties/prp_77/versions/8/rules", 200, json!({}))
        .on(HttpMethod::Post, "/papi/v1/properties/prp_77/activations", 201, json!({}))
    }

    fn options() -> RunOptions {
        RunOptions {
            skip: Vec::new(),
            gtm: GtmOptions {
                reuse_policy: ReusePolicy::Always,
                poll: PropagationPoll {
                    attempts: 1,
                    interval: Duration::ZERO,
                },
            },
        }
    }

    fn orchestrator(mock: Arc<MockTransport>) -> WorkflowOrchestrator {
        let ctx = fixtures::context(mock, files(), ActivationNetwork::Staging);
        WorkflowOrchestrator::new(ctx, Arc::new(FixedAnswer(true)))
    }

    #[tokio::test]
    async fn test_failed_workflow_does_not_stop_the_run() {
        let mock = with_customer_property(with_edgeworker(with_internal_property(
            property_lookup().on(HttpMethod::Get, GTM_DOMAIN, 500, json!({"title": "Internal error"})),
        )));
        let mock = Arc::new(mock);

        let report = orchestrator(mock.clone()).run(&options()).await.unwrap();

        assert_eq!(report.customer_facing_property_id, "prp_77");
        assert_eq!(report.customer_facing_property_version, 7);
        assert!(report.error(WorkflowKind::Gtm).unwrap().contains("500"));
        assert_eq!(
            report.outcome(WorkflowKind::InternalProperty).unwrap()["propertyId"],
            json!("prp_900")
        );
        assert_eq!(
            report.outcome(WorkflowKind::EdgeWorker).unwrap()["edgeWorkerId"],
            json!(4242)
        );
        assert_eq!(
            report.outcome(WorkflowKind::CustomerProperty).unwrap()["newVersion"],
            json!(8)
        );
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_customer_workflow_needs_edgeworker_id() {
        let mock = with_customer_property(with_internal_property(property_lookup()).on(
            HttpMethod::Post,
            "/edgeworkers/v1/ids",
            403,
            json!({"title": "Forbidden"}),
        ));
        let mock = Arc::new(mock);
        let mut options = options();
        options.skip = vec![WorkflowKind::Gtm];

        let report = orchestrator(mock.clone()).run(&options).await.unwrap();

        assert_eq!(report.skipped(WorkflowKind::Gtm), Some(SKIPPED_BY_REQUEST));
        assert!(report.error(WorkflowKind::EdgeWorker).is_some());
        assert_eq!(report.skipped(WorkflowKind::CustomerProperty), Some(NO_EDGEWORKER_ID));
        assert!(mock
            .find(HttpMethod::Get, "/papi/v1/properties/prp_77/versions/7/rules")
            .is_none());
        assert!(mock.calls().iter().all(|call| !call.contains("config-gtm")));
    }

    #[tokio::test]
    async fn test_skipping_everything_only_resolves_the_property() {
        let mock = Arc::new(property_lookup());
        let mut options = options();
        options.skip = WorkflowKind::ALL.to_vec();

        let report = orchestrator(mock.clone()).run(&options).await.unwrap();

        for kind in WorkflowKind::ALL {
            assert_eq!(report.skipped(kind), Some(SKIPPED_BY_REQUEST));
        }
        assert_eq!(mock.calls(), vec!["GET /papi/v1/properties"]);
    }

    #[tokio::test]
    async fn test_unknown_property_is_fatal() {
        let mock = Arc::new(MockTransport::new().on(
            HttpMethod::Get,
            "/papi/v1/properties",
            200,
            json!({"properties": {"items": []}}),
        ));

        let err = orchestrator(mock.clone()).run(&options()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Api(_)));
        assert_eq!(mock.calls().len(), 1);
    }
}
