//! Read-only lookups over a rule tree
//!
//! Every lookup is total: absence is reported as `None`, never as an error.

use crate::rule_tree::{Behavior, RuleTree};

/// Index of the first child carrying a behavior whose name is in `candidates`.
pub fn find_child_index_by_behavior_name(node: &RuleTree, candidates: &[&str]) -> Option<usize> {
    node.children.iter().position(|child| {
        child
            .behaviors
            .iter()
            .any(|b| candidates.contains(&b.name.as_str()))
    })
}

/// Index of the first direct child with the given name.
pub fn find_child_index_by_name(node: &RuleTree, name: &str) -> Option<usize> {
    node.children.iter().position(|child| child.name == name)
}

pub fn find_behavior<'a>(node: &'a RuleTree, name: &str) -> Option<&'a Behavior> {
    node.behaviors.iter().find(|b| b.name == name)
}

pub fn find_behavior_mut<'a>(node: &'a mut RuleTree, name: &str) -> Option<&'a mut Behavior> {
    node.behaviors.iter_mut().find(|b| b.name == name)
}

/// Walks `children` by name, one path segment per level.
///
/// The first child matching a segment is followed; an empty path yields the
/// node itself.
pub fn find_descendant_by_path<'a>(node: &'a RuleTree, path: &[&str]) -> Option<&'a RuleTree> {
    let mut current = node;
    for segment in path {
        current = current.children.iter().find(|c| c.name == *segment)?;
    }
    Some(current)
}

pub fn find_descendant_by_path_mut<'a>(
    node: &'a mut RuleTree,
    path: &[&str],
) -> Option<&'a mut RuleTree> {
    let mut current = node;
    for segment in path {
        current = current.children.iter_mut().find(|c| c.name == *segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> RuleTree {
        RuleTree::new("default")
            .with_behavior(Behavior::new("origin"))
            .with_behavior(Behavior::new("cpCode"))
            .with_child(RuleTree::new("Performance").with_behavior(Behavior::new("caching")))
            .with_child(
                RuleTree::new("Augment insights")
                    .with_child(RuleTree::new("Traffic reporting").with_behavior(Behavior::new("cpCode"))),
            )
            .with_child(RuleTree::new("Overrides").with_behavior(Behavior::new("advancedOverride")))
            .with_child(RuleTree::new("Second caching").with_behavior(Behavior::new("caching")))
    }

    #[test]
    fn test_find_child_index_first_match_wins() {
        let tree = sample_tree();
        assert_eq!(find_child_index_by_behavior_name(&tree, &["caching"]), Some(0));
        assert_eq!(
            find_child_index_by_behavior_name(&tree, &["advanced", "advancedOverride"]),
            Some(2)
        );
    }

    #[test]
    fn test_find_child_index_only_looks_at_direct_children() {
        let tree = sample_tree();
        // cpCode exists on the root and on a grandchild, never on a direct child
        assert_eq!(find_child_index_by_behavior_name(&tree, &["cpCode"]), None);
        assert_eq!(find_child_index_by_behavior_name(&tree, &[]), None);
    }

    #[test]
    fn test_find_child_index_by_name() {
        let tree = sample_tree();
        assert_eq!(find_child_index_by_name(&tree, "Overrides"), Some(2));
        assert_eq!(find_child_index_by_name(&tree, "Traffic reporting"), None);
    }

    #[test]
    fn test_find_behavior() {
        let mut tree = sample_tree();
        assert_eq!(find_behavior(&tree, "cpCode").map(|b| b.name.as_str()), Some("cpCode"));
        assert!(find_behavior(&tree, "caching").is_none());

        find_behavior_mut(&mut tree, "origin")
            .unwrap()
            .options
            .insert("hostname".into(), "o.example.com".into());
        assert_eq!(
            tree.behaviors[0].options["hostname"].as_str(),
            Some("o.example.com")
        );
    }

    #[test]
    fn test_find_descendant_by_path() {
        let tree = sample_tree();
        let found = find_descendant_by_path(&tree, &["Augment insights", "Traffic reporting"]);
        assert_eq!(found.map(|n| n.name.as_str()), Some("Traffic reporting"));

        assert!(find_descendant_by_path(&tree, &["Augment insights", "Missing"]).is_none());
        assert!(find_descendant_by_path(&tree, &["Traffic reporting"]).is_none());
        assert_eq!(find_descendant_by_path(&tree, &[]).map(|n| n.name.as_str()), Some("default"));
    }

    #[test]
    fn test_find_descendant_by_path_mut() {
        let mut tree = sample_tree();
        let node = find_descendant_by_path_mut(&mut tree, &["Augment insights", "Traffic reporting"])
            .unwrap();
        node.behaviors.clear();

        let node = find_descendant_by_path(&tree, &["Augment insights", "Traffic reporting"]).unwrap();
        assert!(node.behaviors.is_empty());
    }
}
