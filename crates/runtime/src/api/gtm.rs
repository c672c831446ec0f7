//! Traffic management (GTM) calls

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::datacenters::DatacenterSpec;
use crate::error::ApiError;
use crate::transport::{ApiRequest, SharedTransport};

pub const GTM_V16: &str = "application/vnd.config-gtm.v1.6+json";
pub const GTM_V17: &str = "application/vnd.config-gtm.v1.7+json";

/// A datacenter already defined in a GTM domain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingDatacenter {
    pub datacenter_id: u64,
    #[serde(default)]
    pub nickname: String,
}

/// Traffic management API
#[derive(Clone)]
pub struct GtmApi {
    transport: SharedTransport,
}

impl GtmApi {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Domain details, or `None` when the domain does not exist.
    pub async fn get_domain(&self, domain: &str) -> Result<Option<Value>, ApiError> {
        const CONTEXT: &str = "Get GTM domain";
        let request = ApiRequest::get(format!("/config-gtm/v1/domains/{domain}"))
            .header("Accept", GTM_V16);
        let response = self.transport.send(request).await?;
        if response.status == 404 {
            info!(domain, "GTM domain does not exist yet");
            return Ok(None);
        }
        let details = response.ensure_status(&[200], CONTEXT)?.json(CONTEXT)?;
        info!(domain, "GTM domain already exists");
        Ok(Some(details))
    }

    pub async fn create_domain(
        &self,
        domain: &str,
        contract_id: &str,
        gid: u64,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Create GTM domain";
        let request = ApiRequest::post("/config-gtm/v1/domains")
            .query("contractId", contract_id)
            .query("gid", gid)
            .header("Accept", GTM_V16)
            .header("Content-Type", GTM_V16)
            .json(json!({
                "name": domain,
                "type": "basic",
                "defaultErrorPenalty": 75,
                "defaultTimeoutPenalty": 25,
                "loadFeedback": true,
                "cnameCoalescingEnabled": false,
                "signAndServe": false,
            }));
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;
        info!(domain, "Created GTM domain");
        response.json(CONTEXT)
    }

    pub async fn list_datacenters(&self, domain: &str) -> Result<Vec<ExistingDatacenter>, ApiError> {
        const CONTEXT: &str = "List GTM datacenters";

        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            items: Vec<ExistingDatacenter>,
        }

        let request = ApiRequest::get(format!("/config-gtm/v1/domains/{domain}/datacenters"))
            .header("Accept", GTM_V16);
        let listing: Listing = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200], CONTEXT)?
            .json(CONTEXT)?;
        debug!(domain, count = listing.items.len(), "Listed datacenters");
        Ok(listing.items)
    }

    /// Creates a datacenter and returns its id.
    pub async fn create_datacenter(
        &self,
        domain: &str,
        contract_id: &str,
        gid: u64,
        datacenter: &DatacenterSpec,
    ) -> Result<u64, ApiError> {
        const CONTEXT: &str = "Create GTM datacenter";
        let request = ApiRequest::post(format!("/config-gtm/v1/domains/{domain}/datacenters"))
            .query("contractId", contract_id)
            .query("gid", gid)
            .header("Accept", GTM_V17)
            .json(json!({
                "nickname": datacenter.nickname,
                "city": datacenter.city,
                "stateOrProvince": datacenter.state_or_province,
                "country": datacenter.country,
                "latitude": datacenter.latitude,
                "longitude": datacenter.longitude,
            }));
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let id = body["resource"]["datacenterId"]
            .as_u64()
            .ok_or_else(|| ApiError::MissingField {
                context: CONTEXT.to_string(),
                field: "resource.datacenterId".to_string(),
            })?;
        info!(domain, nickname = %datacenter.nickname, id, "Created datacenter");
        Ok(id)
    }

    /// Current `propagationStatus` of the domain.
    pub async fn propagation_status(&self, domain: &str) -> Result<Option<String>, ApiError> {
        const CONTEXT: &str = "Get GTM domain status";
        let request = ApiRequest::get(format!("/config-gtm/v1/domains/{domain}/status/current"));
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200], CONTEXT)?
            .json(CONTEXT)?;
        Ok(body["propagationStatus"].as_str().map(str::to_string))
    }

    pub async fn put_property(
        &self,
        domain: &str,
        contract_id: &str,
        gid: u64,
        property_name: &str,
        payload: Value,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Create GTM property";
        let request = ApiRequest::put(format!(
            "/config-gtm/v1/domains/{domain}/properties/{property_name}"
        ))
        .query("contractId", contract_id)
        .query("gid", gid)
        .header("Accept", GTM_V17)
        .header("Content-Type", GTM_V16)
        .json(payload);
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;
        info!(domain, property_name, "GTM property saved");
        response.json(CONTEXT)
    }
}
