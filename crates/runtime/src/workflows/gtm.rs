//! GTM workflow
//!
//! Ensures the domain exists, creates (or reuses) the datacenters listed in
//! the CSV file, waits for the domain to propagate and saves the GTM property
//! that spreads traffic evenly over them.

use std::time::Duration;

use chrono::Local;
use edgeprov_core::{DatacenterDecision, ReusePolicy, decide_datacenter};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::WorkflowContext;
use crate::api::GtmApi;
use crate::confirm::Confirm;
use crate::datacenters::{TrafficTarget, gtm_property_payload, parse_datacenters};
use crate::error::{ApiError, WorkflowError};

const PROPAGATION_COMPLETE: &str = "COMPLETE";

/// How long to wait for a domain change to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPoll {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PropagationPoll {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GtmOptions {
    pub reuse_policy: ReusePolicy,
    pub poll: PropagationPoll,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GtmOutcome {
    pub domain: String,
    pub domain_created: bool,
    pub datacenters: Vec<TrafficTarget>,
    pub datacenters_created: usize,
    pub datacenters_reused: usize,
    pub propagation_complete: bool,
    pub gtm_property: Value,
}

/// Steps to create a domain by hand when the contract may not do it via API.
pub fn manual_domain_steps(domain: &str) -> String {
    format!(
        "This contract/group is not allowed to create GTM domains through the API.\n\
         1. Log into Control Center (https://control.akamai.com)\n\
         2. Open Traffic Management > Domains\n\
         3. Create a domain named {domain}\n\
         4. Rerun this command"
    )
}

pub async fn run(
    ctx: &WorkflowContext,
    options: &GtmOptions,
    confirm: &dyn Confirm,
) -> Result<GtmOutcome, WorkflowError> {
    let requirements = &ctx.requirements;
    let settings = requirements.gtm_settings()?;
    let contract_id = requirements.contract_id_clean();
    let gid = requirements.numeric_group_id()?;
    let domain = settings.domain;
    let gtm = ctx.gtm();

    let domain_created = match gtm.get_domain(domain).await? {
        Some(_) => false,
        None => {
            info!(domain, "Creating GTM domain");
            gtm.create_domain(domain, contract_id, gid)
                .await
                .map_err(|e| domain_error(e, domain))?;
            true
        }
    };

    let csv = ctx.files.read_to_string(settings.datacenter_details).await?;
    let specs = parse_datacenters(&csv, Local::now().date_naive()).map_err(|reason| {
        WorkflowError::Datacenters {
            path: settings.datacenter_details.to_string(),
            reason,
        }
    })?;
    if specs.is_empty() {
        return Err(WorkflowError::Datacenters {
            path: settings.datacenter_details.to_string(),
            reason: "no datacenters listed".to_string(),
        });
    }

    let existing = gtm.list_datacenters(domain).await?;
    let mut targets = Vec::with_capacity(specs.len());

    for spec in &specs {
        let found = existing
            .iter()
            .find(|dc| dc.nickname == spec.nickname)
            .map(|dc| dc.datacenter_id);

        let reuse = match decide_datacenter(found, options.reuse_policy) {
            DatacenterDecision::Create => None,
            DatacenterDecision::Reuse { id } => Some(id),
            DatacenterDecision::Conflict { id } => {
                if options.reuse_policy == ReusePolicy::Never {
                    return Err(WorkflowError::DatacenterConflict {
                        nickname: spec.nickname.clone(),
                        id,
                    });
                }
                let question = format!("Reuse existing datacenter '{}' (ID={id})?", spec.nickname);
                if !confirm.confirm(&question).await {
                    return Err(WorkflowError::Aborted(format!(
                        "declined to reuse datacenter '{}'",
                        spec.nickname
                    )));
                }
                Some(id)
            }
        };

        let (datacenter_id, reused) = match reuse {
            Some(id) => {
                info!(tmp_id = %spec.tmp_id, nickname = %spec.nickname, id, "Reusing datacenter");
                (id, true)
            }
            None => {
                info!(tmp_id = %spec.tmp_id, nickname = %spec.nickname, "Creating datacenter");
                (gtm.create_datacenter(domain, contract_id, gid, spec).await?, false)
            }
        };

        targets.push(TrafficTarget {
            datacenter_id,
            nickname: spec.nickname.clone(),
            servers: spec.servers.clone(),
            reused,
        });
    }

    let propagation_complete = wait_for_propagation(&gtm, domain, options.poll).await?;

    let payload = gtm_property_payload(&settings, &targets);
    let gtm_property = gtm
        .put_property(domain, contract_id, gid, settings.property_name, payload)
        .await?;

    let datacenters_reused = targets.iter().filter(|t| t.reused).count();
    Ok(GtmOutcome {
        domain: domain.to_string(),
        domain_created,
        datacenters_created: targets.len() - datacenters_reused,
        datacenters_reused,
        datacenters: targets,
        propagation_complete,
        gtm_property,
    })
}

/// Polls the domain status; `false` when it never reported complete.
pub async fn wait_for_propagation(
    gtm: &GtmApi,
    domain: &str,
    poll: PropagationPoll,
) -> Result<bool, ApiError> {
    for attempt in 1..=poll.attempts {
        let status = gtm.propagation_status(domain).await?;
        info!(
            domain,
            attempt,
            status = status.as_deref().unwrap_or("unknown"),
            "GTM propagation status"
        );
        if status.as_deref() == Some(PROPAGATION_COMPLETE) {
            return Ok(true);
        }
        if attempt < poll.attempts {
            tokio::time::sleep(poll.interval).await;
        }
    }

    warn!(domain, attempts = poll.attempts, "GTM propagation did not complete; continuing");
    Ok(false)
}

fn domain_error(err: ApiError, domain: &str) -> WorkflowError {
    if err.status() == Some(403) || err.body().contains("contractAccessProblem") {
        WorkflowError::DomainForbidden {
            domain: domain.to_string(),
            instructions: manual_domain_steps(domain),
        }
    } else {
        err.into()
    }
}
