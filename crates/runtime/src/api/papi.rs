//! Property manager (PAPI) calls

use edgeprov_core::{PropertyRules, Requirements};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::link_id;
use crate::error::ApiError;
use crate::transport::{ApiRequest, SharedTransport};

pub const PRODUCT_ID: &str = "prd_SPM";

/// Contract and group every PAPI call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PapiScope {
    pub contract_id: String,
    pub group_id: String,
}

impl PapiScope {
    pub fn new(contract_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            group_id: group_id.into(),
        }
    }

    /// Prefixed contract and group ids from the requirements.
    pub fn from_requirements(requirements: &Requirements) -> Self {
        Self::new(
            requirements.prefixed_contract_id(),
            requirements.prefixed_group_id(),
        )
    }

    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query("contractId", &self.contract_id)
            .query("groupId", &self.group_id)
            .query("PAPI-Use-Prefixes", "true")
    }
}

/// Property manager API
#[derive(Clone)]
pub struct PapiApi {
    transport: SharedTransport,
}

impl PapiApi {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Looks up a property id by its name.
    pub async fn find_property_id(
        &self,
        scope: &PapiScope,
        property_name: &str,
    ) -> Result<String, ApiError> {
        const CONTEXT: &str = "List properties";
        let request = scope
            .apply(ApiRequest::get("/papi/v1/properties"))
            .header("Accept", "application/json");
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200], CONTEXT)?
            .json(CONTEXT)?;

        let property_id = body["properties"]["items"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|item| item["propertyName"].as_str() == Some(property_name))
            .and_then(|item| item["propertyId"].as_str())
            .ok_or_else(|| ApiError::MissingField {
                context: CONTEXT.to_string(),
                field: format!("property '{property_name}'"),
            })?;

        info!(property = property_name, property_id, "Resolved property id");
        Ok(property_id.to_string())
    }

    /// Creates a CP code and returns its id (`cpc_...`).
    pub async fn create_cpcode(&self, scope: &PapiScope, name: &str) -> Result<String, ApiError> {
        const CONTEXT: &str = "Create CP code";
        let request = scope
            .apply(ApiRequest::post("/papi/v1/cpcodes"))
            .json(json!({"cpcodeName": name, "productId": PRODUCT_ID}));
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let cpcode_id = link_from(&body, "cpcodeLink", CONTEXT)?;
        info!(cpcode_id = %cpcode_id, name, "Created CP code");
        Ok(cpcode_id)
    }

    /// Creates a property; returns its id and first version.
    pub async fn create_property(
        &self,
        scope: &PapiScope,
        property_name: &str,
    ) -> Result<(String, u64), ApiError> {
        const CONTEXT: &str = "Create property";
        let request = scope
            .apply(ApiRequest::post("/papi/v1/properties"))
            .json(json!({
                "productId": PRODUCT_ID,
                "propertyName": property_name,
                "ruleFormat": "latest",
            }));
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let property_id = link_from(&body, "propertyLink", CONTEXT)?;
        info!(property_id = %property_id, property_name, "Created property");
        Ok((property_id, 1))
    }

    /// Points `cname_from` at `edge_hostname` on a property version.
    pub async fn add_hostname(
        &self,
        scope: &PapiScope,
        property_id: &str,
        version: u64,
        cname_from: &str,
        edge_hostname: &str,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Add property hostname";
        let request = scope
            .apply(ApiRequest::put(format!(
                "/papi/v1/properties/{property_id}/versions/{version}/hostnames"
            )))
            .query("validateHostnames", "true")
            .json(json!([{
                "certProvisioningType": "DEFAULT",
                "cnameFrom": cname_from,
                "cnameTo": edge_hostname,
                "cnameType": "EDGE_HOSTNAME",
            }]));
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;

        info!(property_id, cname_from, edge_hostname, "Added hostname");
        response.json(CONTEXT)
    }

    pub async fn get_rules(
        &self,
        scope: &PapiScope,
        property_id: &str,
        version: u64,
    ) -> Result<PropertyRules, ApiError> {
        const CONTEXT: &str = "Get rule tree";
        let request = scope
            .apply(ApiRequest::get(format!(
                "/papi/v1/properties/{property_id}/versions/{version}/rules"
            )))
            .header("Accept", "application/json");
        let rules: PropertyRules = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200], CONTEXT)?
            .json(CONTEXT)?;

        debug!(
            property_id,
            version,
            nodes = rules.rules.node_count(),
            "Fetched rule tree"
        );
        Ok(rules)
    }

    /// Creates a new version from `from_version`; returns its number.
    pub async fn create_version(
        &self,
        scope: &PapiScope,
        property_id: &str,
        from_version: u64,
        from_etag: Option<&str>,
    ) -> Result<u64, ApiError> {
        const CONTEXT: &str = "Create property version";
        let mut payload = json!({"createFromVersion": from_version});
        if let Some(etag) = from_etag {
            payload["createFromVersionEtag"] = json!(etag);
        }
        let request = scope
            .apply(ApiRequest::post(format!(
                "/papi/v1/properties/{property_id}/versions"
            )))
            .json(payload);
        let body: Value = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?
            .json(CONTEXT)?;

        let link = link_from(&body, "versionLink", CONTEXT)?;
        let version = link.parse().map_err(|_| ApiError::Decode {
            context: CONTEXT.to_string(),
            reason: format!("version '{link}' is not a number"),
        })?;
        info!(property_id, from_version, version, "Created property version");
        Ok(version)
    }

    /// Uploads the rule tree of `document` to a version.
    pub async fn update_rules(
        &self,
        scope: &PapiScope,
        property_id: &str,
        version: u64,
        document: &PropertyRules,
        etag: Option<&str>,
        validate: bool,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Update rule tree";
        let body = serde_json::to_value(document.upload_body()).map_err(|e| ApiError::Decode {
            context: CONTEXT.to_string(),
            reason: e.to_string(),
        })?;
        let mut request = scope
            .apply(ApiRequest::put(format!(
                "/papi/v1/properties/{property_id}/versions/{version}/rules"
            )))
            .json(body);
        if !validate {
            request = request.query("validateRules", "false");
        }
        if let Some(etag) = etag {
            request = request.header("If-Match", etag);
        }

        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;
        info!(property_id, version, "Uploaded rule tree");
        response.json(CONTEXT)
    }

    pub async fn activate(
        &self,
        scope: &PapiScope,
        property_id: &str,
        version: u64,
        network: &str,
        emails: &[String],
        note: &str,
    ) -> Result<Value, ApiError> {
        const CONTEXT: &str = "Activate property";
        let request = scope
            .apply(ApiRequest::post(format!(
                "/papi/v1/properties/{property_id}/activations"
            )))
            .json(json!({
                "propertyVersion": version,
                "network": network,
                "note": note,
                "notifyEmails": emails,
                "activationType": "ACTIVATE",
                "acknowledgeAllWarnings": true,
            }));
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status(&[200, 201], CONTEXT)?;
        info!(property_id, version, network, "Activation submitted");
        response.json(CONTEXT)
    }
}

fn link_from(body: &Value, field: &str, context: &str) -> Result<String, ApiError> {
    body[field]
        .as_str()
        .and_then(link_id)
        .map(str::to_string)
        .ok_or_else(|| ApiError::MissingField {
            context: context.to_string(),
            field: field.to_string(),
        })
}
