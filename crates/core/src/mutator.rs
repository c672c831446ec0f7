//! Structural edits on a rule tree
//!
//! Contracts:
//! - a missing target (behavior, child, key) makes an edit a no-op
//! - behavior, child and option order is preserved unless an edit explicitly
//!   replaces the list
//! - only an out-of-range structural index is an error

use tracing::Level;

use crate::diagnostics::{SharedDiagnostics, tracing_diagnostics};
use crate::error::RuleTreeError;
use crate::locator::find_behavior_mut;
use crate::rule_tree::{Behavior, OptionValue, RuleTree, Variable};

/// Applies edits to rule trees and reports them to a diagnostics sink.
#[derive(Clone)]
pub struct TreeMutator {
    diagnostics: SharedDiagnostics,
}

impl std::fmt::Debug for TreeMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeMutator").finish_non_exhaustive()
    }
}

impl Default for TreeMutator {
    fn default() -> Self {
        Self::new(tracing_diagnostics())
    }
}

impl TreeMutator {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        Self { diagnostics }
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        self.diagnostics.log(level, message);
    }

    /// Declares `name` on the node unless a variable with that name exists.
    ///
    /// Returns `true` when a variable was added.
    pub fn ensure_variable(
        &self,
        node: &mut RuleTree,
        name: &str,
        value: &str,
        description: &str,
    ) -> bool {
        if node.variables.iter().any(|v| v.name == name) {
            self.log(Level::DEBUG, &format!("Variable {name} already declared"));
            return false;
        }
        node.variables.push(Variable::new(name, value, description));
        self.log(Level::DEBUG, &format!("Declared missing variable {name}"));
        true
    }

    /// Sets `options[key]` on the named behavior, overwriting any prior value.
    ///
    /// Never creates the behavior; returns `false` when it is absent.
    pub fn set_behavior_option(
        &self,
        node: &mut RuleTree,
        behavior_name: &str,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> bool {
        match find_behavior_mut(node, behavior_name) {
            Some(behavior) => {
                behavior.options.insert(key.to_string(), value.into());
                true
            }
            None => {
                self.log(
                    Level::DEBUG,
                    &format!("Behavior {behavior_name} not found on '{}'; {key} left unset", node.name),
                );
                false
            }
        }
    }

    /// Removes the given option keys from the named behavior.
    ///
    /// Returns how many keys were actually present and removed.
    pub fn remove_behavior_option_keys(
        &self,
        node: &mut RuleTree,
        behavior_name: &str,
        keys: &[&str],
    ) -> usize {
        let Some(behavior) = find_behavior_mut(node, behavior_name) else {
            return 0;
        };
        keys.iter()
            .filter(|key| behavior.options.shift_remove(**key).is_some())
            .count()
    }

    /// Empties `children` of every descendant named `match_name`.
    ///
    /// The node itself is not considered. Subtrees that get discarded are not
    /// visited.
    pub fn clear_children(&self, node: &mut RuleTree, match_name: &str) -> usize {
        let mut cleared = 0;
        let mut stack: Vec<&mut RuleTree> = node.children.iter_mut().collect();

        while let Some(current) = stack.pop() {
            if current.name == match_name {
                let removed = current.children.len();
                current.children.clear();
                cleared += 1;
                self.log(
                    Level::DEBUG,
                    &format!("Cleared {removed} children under '{match_name}'"),
                );
            } else {
                stack.extend(current.children.iter_mut());
            }
        }

        cleared
    }

    /// Keeps only the behaviors satisfying `keep`, in their original order.
    ///
    /// Returns the number of behaviors removed.
    pub fn filter_behaviors<F>(&self, node: &mut RuleTree, mut keep: F) -> usize
    where
        F: FnMut(&Behavior) -> bool,
    {
        let before = node.behaviors.len();
        node.behaviors.retain(|b| keep(b));
        let removed = before - node.behaviors.len();
        if removed > 0 {
            self.log(
                Level::DEBUG,
                &format!("Removed {removed} behaviors from '{}'", node.name),
            );
        }
        removed
    }

    /// Replaces the node's behavior list wholesale.
    pub fn replace_behaviors(&self, node: &mut RuleTree, behaviors: Vec<Behavior>) -> Vec<Behavior> {
        self.log(
            Level::DEBUG,
            &format!("Replacing {} behaviors on '{}'", node.behaviors.len(), node.name),
        );
        std::mem::replace(&mut node.behaviors, behaviors)
    }

    /// Inserts `child` at `index`, shifting later children right.
    pub fn insert_child_at(
        &self,
        node: &mut RuleTree,
        index: usize,
        child: RuleTree,
    ) -> Result<(), RuleTreeError> {
        let len = node.children.len();
        if index > len {
            return Err(RuleTreeError::Precondition { index, len });
        }
        self.log(
            Level::DEBUG,
            &format!("Inserting '{}' at position {index} of '{}'", child.name, node.name),
        );
        node.children.insert(index, child);
        Ok(())
    }

    /// Swaps the child at `index` for `child`, returning the previous one.
    pub fn replace_child_at(
        &self,
        node: &mut RuleTree,
        index: usize,
        child: RuleTree,
    ) -> Result<RuleTree, RuleTreeError> {
        let len = node.children.len();
        let slot = node
            .children
            .get_mut(index)
            .ok_or(RuleTreeError::Precondition { index, len })?;
        self.log(
            Level::DEBUG,
            &format!("Replacing '{}' at position {index}", slot.name),
        );
        Ok(std::mem::replace(slot, child))
    }
}
