//! edgeprov core - rule tree model and editing
//!
//! Contains:
//! - RuleTree / Behavior / Variable: the property rule document
//! - locator / mutator: lookups and structural edits
//! - RuleInjector: template rule injection
//! - OriginRewrite / internal rule edits
//! - Requirements: provisioning inputs
//! - Diagnostics: where editors report what they did

mod activation;
mod config;
mod decision;
mod diagnostics;
mod error;
mod injector;
mod internal_rules;
pub mod locator;
mod mutator;
mod origin;
mod rule_tree;

pub use activation::*;
pub use config::*;
pub use decision::*;
pub use diagnostics::*;
pub use error::*;
pub use injector::*;
pub use internal_rules::*;
pub use mutator::*;
pub use origin::*;
pub use rule_tree::*;
