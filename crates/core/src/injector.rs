//! Template rule injection
//!
//! Places a pre-authored rule (the redirect / early-hints template) into a
//! property's rule tree:
//! 1. bind the EdgeWorker id into every `edgeWorkerId` key of the template
//! 2. declare the user variables the template relies on
//! 3. insert the template ahead of the first catch-all override or
//!    conditional-origin rule, or append it when neither exists

use serde::Serialize;
use serde_json::Value;
use tracing::Level;

use crate::diagnostics::SharedDiagnostics;
use crate::error::RuleTreeError;
use crate::locator::{find_child_index_by_behavior_name, find_child_index_by_name};
use crate::mutator::TreeMutator;
use crate::rule_tree::{OptionValue, RuleTree};

/// Key holding the compute-worker identifier inside templates.
pub const EDGE_WORKER_ID_KEY: &str = "edgeWorkerId";

/// Variables the early-hints template reads and writes.
pub const REQUIRED_VARIABLES: [&str; 2] = ["PMUSER_103_HINTS", "PMUSER_103_HINTS_ENABLED"];

pub const CONDITIONAL_ORIGIN_ANCHOR: &str = "allowConditionalOrigins";
pub const ADVANCED_ANCHORS: [&str; 2] = ["advanced", "advancedOverride"];

/// What to do when the tree already has a child named like the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Swap the existing child for the new template, keeping its position.
    #[default]
    Replace,
    /// Leave the tree untouched.
    Skip,
    /// Insert anyway; repeated runs accumulate copies.
    Allow,
}

/// Result of an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum InjectionOutcome {
    Inserted { index: usize },
    Replaced { index: usize },
    Skipped { index: usize },
}

impl InjectionOutcome {
    pub fn index(&self) -> usize {
        match self {
            InjectionOutcome::Inserted { index }
            | InjectionOutcome::Replaced { index }
            | InjectionOutcome::Skipped { index } => *index,
        }
    }
}

enum Slot<'a> {
    Node(&'a mut RuleTree),
    Option(&'a mut OptionValue),
    Json(&'a mut Value),
}

/// Injects templated rules into property rule trees.
#[derive(Debug, Clone, Default)]
pub struct RuleInjector {
    mutator: TreeMutator,
    policy: DuplicatePolicy,
}

impl RuleInjector {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        Self {
            mutator: TreeMutator::new(diagnostics),
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn mutator(&self) -> &TreeMutator {
        &self.mutator
    }

    /// Overwrites every `edgeWorkerId` value in the template with `identifier`.
    ///
    /// Visits children, behavior options at any depth (maps and lists) and
    /// the vendor fields kept alongside them.
    pub fn bind_identifier(&self, mut template: RuleTree, identifier: impl ToString) -> RuleTree {
        let identifier = identifier.to_string();
        let mut bound = 0usize;
        {
            let mut stack = vec![Slot::Node(&mut template)];

            while let Some(slot) = stack.pop() {
                match slot {
                    Slot::Node(node) => {
                        let RuleTree {
                            behaviors,
                            children,
                            extra,
                            ..
                        } = node;
                        for behavior in behaviors.iter_mut() {
                            for (key, value) in behavior.options.iter_mut() {
                                if key == EDGE_WORKER_ID_KEY {
                                    *value = OptionValue::String(identifier.clone());
                                    bound += 1;
                                } else {
                                    stack.push(Slot::Option(value));
                                }
                            }
                            for (key, value) in behavior.extra.iter_mut() {
                                if key == EDGE_WORKER_ID_KEY {
                                    *value = Value::String(identifier.clone());
                                    bound += 1;
                                } else {
                                    stack.push(Slot::Json(value));
                                }
                            }
                        }
                        for (key, value) in extra.iter_mut() {
                            if key == EDGE_WORKER_ID_KEY {
                                *value = Value::String(identifier.clone());
                                bound += 1;
                            } else {
                                stack.push(Slot::Json(value));
                            }
                        }
                        stack.extend(children.iter_mut().map(Slot::Node));
                    }
                    Slot::Option(value) => match value {
                        OptionValue::Map(map) => {
                            for (key, value) in map.iter_mut() {
                                if key == EDGE_WORKER_ID_KEY {
                                    *value = OptionValue::String(identifier.clone());
                                    bound += 1;
                                } else {
                                    stack.push(Slot::Option(value));
                                }
                            }
                        }
                        OptionValue::List(items) => stack.extend(items.iter_mut().map(Slot::Option)),
                        OptionValue::Null
                        | OptionValue::Bool(_)
                        | OptionValue::Number(_)
                        | OptionValue::String(_) => {}
                    },
                    Slot::Json(value) => match value {
                        Value::Object(map) => {
                            for (key, value) in map.iter_mut() {
                                if key == EDGE_WORKER_ID_KEY {
                                    *value = Value::String(identifier.clone());
                                    bound += 1;
                                } else {
                                    stack.push(Slot::Json(value));
                                }
                            }
                        }
                        Value::Array(items) => stack.extend(items.iter_mut().map(Slot::Json)),
                        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
                    },
                }
            }
        }

        self.mutator.log(
            Level::DEBUG,
            &format!("Bound EdgeWorker id {identifier} into {bound} location(s) of '{}'", template.name),
        );
        if bound == 0 {
            self.mutator.log(
                Level::WARN,
                &format!("Template '{}' has no {EDGE_WORKER_ID_KEY} key", template.name),
            );
        }
        template
    }

    /// Declares each required variable on the root node.
    ///
    /// Returns how many were missing and got added.
    pub fn ensure_declarations(&self, tree: &mut RuleTree, required: &[&str]) -> usize {
        required
            .iter()
            .filter(|name| self.mutator.ensure_variable(tree, name, "", ""))
            .count()
    }

    /// Position at which an injected rule must be placed among the root's
    /// children: the earliest of the first conditional-origin rule and the
    /// first advanced-override rule, or the end when neither is present.
    pub fn compute_insertion_index(&self, tree: &RuleTree) -> usize {
        let conditional = find_child_index_by_behavior_name(tree, &[CONDITIONAL_ORIGIN_ANCHOR]);
        let advanced = find_child_index_by_behavior_name(tree, &ADVANCED_ANCHORS);

        match (advanced, conditional) {
            (Some(a), Some(c)) => a.min(c),
            (Some(index), None) | (None, Some(index)) => index,
            (None, None) => tree.children.len(),
        }
    }

    /// Places an already bound template into the tree.
    pub fn inject(
        &self,
        tree: &mut RuleTree,
        bound_template: RuleTree,
    ) -> Result<InjectionOutcome, RuleTreeError> {
        if self.policy != DuplicatePolicy::Allow && !bound_template.name.is_empty() {
            if let Some(existing) = find_child_index_by_name(tree, &bound_template.name) {
                return match self.policy {
                    DuplicatePolicy::Skip => {
                        self.mutator.log(
                            Level::INFO,
                            &format!(
                                "Rule '{}' already present at {existing}; leaving it",
                                bound_template.name
                            ),
                        );
                        Ok(InjectionOutcome::Skipped { index: existing })
                    }
                    _ => {
                        self.mutator.replace_child_at(tree, existing, bound_template)?;
                        Ok(InjectionOutcome::Replaced { index: existing })
                    }
                };
            }
        }

        let index = self.compute_insertion_index(tree);
        self.mutator.insert_child_at(tree, index, bound_template)?;
        Ok(InjectionOutcome::Inserted { index })
    }

    /// Binds the identifier, declares the required variables and injects.
    pub fn inject_with_identifier(
        &self,
        tree: &mut RuleTree,
        template: RuleTree,
        identifier: impl ToString,
        required: &[&str],
    ) -> Result<InjectionOutcome, RuleTreeError> {
        let bound = self.bind_identifier(template, identifier);
        self.ensure_declarations(tree, required);
        self.inject(tree, bound)
    }
}
