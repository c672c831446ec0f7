//! Activation target of a run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a run activates what it saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationNetwork {
    Staging,
    Production,
    /// Save new versions without activating them
    SaveOnly,
}

impl ActivationNetwork {
    /// Network name sent to the vendor API, `None` for save-only runs.
    pub fn api_network(&self) -> Option<&'static str> {
        match self {
            ActivationNetwork::Staging => Some("STAGING"),
            ActivationNetwork::Production => Some("PRODUCTION"),
            ActivationNetwork::SaveOnly => None,
        }
    }

    pub fn activates(&self) -> bool {
        self.api_network().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationNetwork::Staging => "staging",
            ActivationNetwork::Production => "production",
            ActivationNetwork::SaveOnly => "saveonly",
        }
    }
}

impl fmt::Display for ActivationNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(ActivationNetwork::Staging),
            "production" => Ok(ActivationNetwork::Production),
            "saveonly" => Ok(ActivationNetwork::SaveOnly),
            other => Err(format!(
                "unknown activation network '{other}' (expected staging, production or saveonly)"
            )),
        }
    }
}
