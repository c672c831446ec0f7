//! Provisioning requirements
//!
//! `requirements.json` holds the user-provided inputs of one deployment:
//! contract and group, notification emails, GTM settings, the two property
//! descriptions and the EdgeWorker to create.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Root of `requirements.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    #[serde(default)]
    pub contract_id: String,

    #[serde(default)]
    pub group_id: String,

    #[serde(default)]
    pub activation_emails: ActivationEmails,

    pub gtm_domain: Option<String>,

    pub gtm_property_name: Option<String>,

    /// GTM property type
    #[serde(default = "default_property_type")]
    pub property_type: String,

    pub liveness_host_header: Option<String>,

    pub liveness_test_object: Option<String>,

    /// CSV file describing the GTM datacenters
    pub datacenter_details: Option<String>,

    #[serde(default)]
    pub property_manager: PropertyManagerConfig,

    #[serde(default)]
    pub edgeworker: EdgeWorkerConfig,

    #[serde(default)]
    pub paths: Paths,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            contract_id: String::new(),
            group_id: String::new(),
            activation_emails: ActivationEmails::default(),
            gtm_domain: None,
            gtm_property_name: None,
            property_type: default_property_type(),
            liveness_host_header: None,
            liveness_test_object: None,
            datacenter_details: None,
            property_manager: PropertyManagerConfig::default(),
            edgeworker: EdgeWorkerConfig::default(),
            paths: Paths::default(),
        }
    }
}

fn default_property_type() -> String {
    "performance".to_string()
}

/// Notification addresses; accepted as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivationEmails {
    One(String),
    Many(Vec<String>),
}

impl Default for ActivationEmails {
    fn default() -> Self {
        ActivationEmails::Many(Vec::new())
    }
}

impl ActivationEmails {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ActivationEmails::One(email) if !email.trim().is_empty() => vec![email.clone()],
            ActivationEmails::One(_) => Vec::new(),
            ActivationEmails::Many(emails) => emails
                .iter()
                .filter(|e| !e.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_vec().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyManagerConfig {
    #[serde(default)]
    pub customer_facing_hostname: CustomerFacingHostname,

    #[serde(default)]
    pub internal_harper_hostname: InternalHostnameConfig,
}

/// The existing customer property that receives the redirect rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFacingHostname {
    #[serde(default)]
    pub property_name: String,

    /// Version the new version is created from
    #[serde(default, deserialize_with = "number_or_string")]
    pub property_version: u64,
}

/// The internal property created to route traffic to the origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalHostnameConfig {
    #[serde(default)]
    pub internal_pm_config_name: String,

    #[serde(default)]
    pub internal_hostname: String,

    #[serde(default)]
    pub edge_hostname: String,

    #[serde(default)]
    pub origin_hostname: String,

    #[serde(default)]
    pub forward_custom_header: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeWorkerConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "number_or_string")]
    pub resource_tier_id: u64,

    #[serde(default)]
    pub description: String,

    /// Token the worker presents to the origin
    #[serde(default, rename = "harper_token")]
    pub harper_token: String,
}

/// Local files used by the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paths {
    #[serde(default = "default_rule_template")]
    pub rule_template: String,

    #[serde(default = "default_edgeworker_dir")]
    pub edgeworker_dir: String,

    #[serde(default = "default_bundle_name")]
    pub bundle_name: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            rule_template: default_rule_template(),
            edgeworker_dir: default_edgeworker_dir(),
            bundle_name: default_bundle_name(),
        }
    }
}

fn default_rule_template() -> String {
    "data/harper_redirect_earlyhints_rule.json".to_string()
}

fn default_edgeworker_dir() -> String {
    "data/edgeworker".to_string()
}

fn default_bundle_name() -> String {
    "edgeworker_bundle.tgz".to_string()
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// GTM settings, present only when every GTM field is filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtmSettings<'a> {
    pub domain: &'a str,
    pub property_name: &'a str,
    pub property_type: &'a str,
    pub liveness_host_header: &'a str,
    pub liveness_test_object: &'a str,
    pub datacenter_details: &'a str,
}

impl Requirements {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks that every field a run needs is filled in.
    ///
    /// GTM fields are only required when `gtm_enabled`.
    pub fn validate(&self, gtm_enabled: bool) -> Result<(), ConfigError> {
        let cf = &self.property_manager.customer_facing_hostname;
        let internal = &self.property_manager.internal_harper_hostname;
        let required = [
            ("contractId", self.contract_id.as_str()),
            ("groupId", self.group_id.as_str()),
            ("propertyManager.customerFacingHostname.propertyName", cf.property_name.as_str()),
            (
                "propertyManager.internalHarperHostname.internalPmConfigName",
                internal.internal_pm_config_name.as_str(),
            ),
            (
                "propertyManager.internalHarperHostname.internalHostname",
                internal.internal_hostname.as_str(),
            ),
            (
                "propertyManager.internalHarperHostname.edgeHostname",
                internal.edge_hostname.as_str(),
            ),
            (
                "propertyManager.internalHarperHostname.originHostname",
                internal.origin_hostname.as_str(),
            ),
            (
                "propertyManager.internalHarperHostname.forwardCustomHeader",
                internal.forward_custom_header.as_str(),
            ),
            ("edgeworker.name", self.edgeworker.name.as_str()),
            ("edgeworker.harper_token", self.edgeworker.harper_token.as_str()),
        ];
        first_missing(&required)?;

        if self.activation_emails.is_empty() {
            return Err(missing("activationEmails"));
        }
        if cf.property_version == 0 {
            return Err(ConfigError::InvalidField {
                field: "propertyManager.customerFacingHostname.propertyVersion".to_string(),
                reason: "must be a positive version number".to_string(),
            });
        }
        self.numeric_group_id()?;

        if gtm_enabled {
            self.gtm_settings()?;
        }
        Ok(())
    }

    /// GTM fields, or the first one that is missing.
    pub fn gtm_settings(&self) -> Result<GtmSettings<'_>, ConfigError> {
        let fields = [
            ("gtmDomain", self.gtm_domain.as_deref().unwrap_or_default()),
            ("gtmPropertyName", self.gtm_property_name.as_deref().unwrap_or_default()),
            (
                "livenessHostHeader",
                self.liveness_host_header.as_deref().unwrap_or_default(),
            ),
            (
                "livenessTestObject",
                self.liveness_test_object.as_deref().unwrap_or_default(),
            ),
            (
                "datacenterDetails",
                self.datacenter_details.as_deref().unwrap_or_default(),
            ),
        ];
        first_missing(&fields)?;

        Ok(GtmSettings {
            domain: fields[0].1,
            property_name: fields[1].1,
            property_type: &self.property_type,
            liveness_host_header: fields[2].1,
            liveness_test_object: fields[3].1,
            datacenter_details: fields[4].1,
        })
    }

    /// Contract id without the `ctr_` prefix.
    pub fn contract_id_clean(&self) -> &str {
        strip_prefix(&self.contract_id, "ctr_")
    }

    /// Group id without the `grp_` prefix.
    pub fn group_id_clean(&self) -> &str {
        strip_prefix(&self.group_id, "grp_")
    }

    pub fn prefixed_contract_id(&self) -> String {
        format!("ctr_{}", self.contract_id_clean())
    }

    pub fn prefixed_group_id(&self) -> String {
        format!("grp_{}", self.group_id_clean())
    }

    /// Group id as the number EdgeWorkers and GTM expect.
    pub fn numeric_group_id(&self) -> Result<u64, ConfigError> {
        self.group_id_clean()
            .parse()
            .map_err(|_| ConfigError::InvalidField {
                field: "groupId".to_string(),
                reason: format!("'{}' is not numeric", self.group_id),
            })
    }

    /// Base URL the worker sends its sub-requests to.
    pub fn subrequest_base_url(&self) -> String {
        format!(
            "https://{}",
            self.property_manager.internal_harper_hostname.internal_hostname
        )
    }
}

fn strip_prefix<'a>(value: &'a str, prefix: &str) -> &'a str {
    let value = value.trim();
    value.strip_prefix(prefix).unwrap_or(value)
}

fn missing(field: &str) -> ConfigError {
    ConfigError::MissingField {
        field: field.to_string(),
    }
}

fn first_missing(fields: &[(&str, &str)]) -> Result<(), ConfigError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(missing(field)),
        None => Ok(()),
    }
}
