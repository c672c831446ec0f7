//! Internal property workflow
//!
//! Creates the CP code and property that route worker sub-requests to the
//! origin, attaches the internal hostname, rewrites the default rule tree and
//! activates the result.

use edgeprov_core::{CpCode, InternalEditSummary, OriginRewrite, TreeMutator, apply_internal_edits};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{WorkflowContext, skipped_activation};
use crate::error::WorkflowError;

pub const ACTIVATION_NOTE: &str = "Internal config activation via automation";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalPropertyOutcome {
    pub property_id: String,
    pub property_version: u64,
    pub cpcode_id: String,
    pub hostname: String,
    pub edits: InternalEditSummary,
    pub update_response: Value,
    pub activation: Value,
}

pub async fn run(ctx: &WorkflowContext) -> Result<InternalPropertyOutcome, WorkflowError> {
    let requirements = &ctx.requirements;
    let internal = &requirements.property_manager.internal_harper_hostname;
    let scope = ctx.scope();
    let papi = ctx.papi();

    info!(property = %internal.internal_pm_config_name, "Creating internal property");

    let cpcode_id = papi.create_cpcode(&scope, &internal.internal_hostname).await?;
    let cpcode = CpCode::parse(&cpcode_id, internal.internal_hostname.as_str())?;

    let (property_id, version) = papi
        .create_property(&scope, &internal.internal_pm_config_name)
        .await?;
    papi.add_hostname(
        &scope,
        &property_id,
        version,
        &internal.internal_hostname,
        &internal.edge_hostname,
    )
    .await?;

    let mut document = papi.get_rules(&scope, &property_id, version).await?;
    let origin = OriginRewrite::new(
        internal.origin_hostname.as_str(),
        internal.forward_custom_header.as_str(),
    );
    let mutator = TreeMutator::new(ctx.diagnostics.clone());
    let edits = apply_internal_edits(&mutator, &mut document.rules, &origin, &cpcode);
    info!(
        property_id = %property_id,
        origin_rewritten = edits.origin_rewritten,
        offload_rules_cleared = edits.offload_rules_cleared,
        debug_behaviors_removed = edits.debug_behaviors_removed,
        cpcode_updated = edits.cpcode_updated,
        "Prepared internal rule tree"
    );

    let update_response = papi
        .update_rules(
            &scope,
            &property_id,
            version,
            &document,
            document.etag.as_deref(),
            false,
        )
        .await?;

    let activation = match ctx.network.api_network() {
        Some(network) => {
            let emails = requirements.activation_emails.to_vec();
            papi.activate(&scope, &property_id, version, network, &emails, ACTIVATION_NOTE)
                .await?
        }
        None => {
            info!(property_id = %property_id, "Internal property activation skipped");
            skipped_activation(ctx.network)
        }
    };

    Ok(InternalPropertyOutcome {
        property_id,
        property_version: version,
        cpcode_id,
        hostname: internal.internal_hostname.clone(),
        edits,
        update_response,
        activation,
    })
}
