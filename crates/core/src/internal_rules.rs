//! Rule edits applied to a freshly created internal routing property

use serde::Serialize;
use tracing::Level;

use crate::error::ConfigError;
use crate::locator::find_descendant_by_path_mut;
use crate::mutator::TreeMutator;
use crate::origin::OriginRewrite;
use crate::rule_tree::{Behavior, OptionMap, OptionValue, RuleTree};

pub const OFFLOAD_ORIGIN_RULE: &str = "Offload origin";
pub const ENHANCED_DEBUG_BEHAVIOR: &str = "enhancedDebug";
pub const TRAFFIC_REPORTING_PATH: [&str; 2] = ["Augment insights", "Traffic reporting"];

/// A content-provider code assigned to the internal property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpCode {
    pub id: i64,
    pub name: String,
}

impl CpCode {
    /// Parses an id with or without the `cpc_` prefix.
    pub fn parse(id: &str, name: impl Into<String>) -> Result<Self, ConfigError> {
        let digits = id.trim().trim_start_matches("cpc_");
        let id = digits.parse::<i64>().map_err(|_| ConfigError::InvalidField {
            field: "cpcodeId".to_string(),
            reason: format!("'{id}' is not a numeric CP code"),
        })?;
        Ok(Self {
            id,
            name: name.into(),
        })
    }

    /// The `cpCode` behavior referencing this code.
    pub fn behavior(&self) -> Behavior {
        let mut value = OptionMap::new();
        value.insert("id".to_string(), self.id.into());
        value.insert("name".to_string(), self.name.as_str().into());

        Behavior::new("cpCode")
            .with_option("enableDefaultContentProviderCode", false)
            .with_option("value", OptionValue::Map(value))
    }
}

/// Counts of what `apply_internal_edits` touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalEditSummary {
    pub origin_rewritten: bool,
    pub offload_rules_cleared: usize,
    pub debug_behaviors_removed: usize,
    pub cpcode_updated: bool,
}

/// Prepares the default rule tree of a new internal property.
pub fn apply_internal_edits(
    mutator: &TreeMutator,
    rules: &mut RuleTree,
    origin: &OriginRewrite,
    cpcode: &CpCode,
) -> InternalEditSummary {
    let origin_rewritten = origin.apply(mutator, rules);
    let offload_rules_cleared = mutator.clear_children(rules, OFFLOAD_ORIGIN_RULE);
    let debug_behaviors_removed =
        mutator.filter_behaviors(rules, |b| b.name != ENHANCED_DEBUG_BEHAVIOR);

    let cpcode_updated = match find_descendant_by_path_mut(rules, &TRAFFIC_REPORTING_PATH) {
        Some(node) => {
            mutator.replace_behaviors(node, vec![cpcode.behavior()]);
            true
        }
        None => {
            mutator.log(
                Level::WARN,
                &format!("No '{}' rule; CP code not set", TRAFFIC_REPORTING_PATH.join(" / ")),
            );
            false
        }
    };

    InternalEditSummary {
        origin_rewritten,
        offload_rules_cleared,
        debug_behaviors_removed,
        cpcode_updated,
    }
}
