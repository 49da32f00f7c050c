//! Node Materializer
//!
//! Turns walked tree nodes into display items: a human-readable label plus
//! the originating node identity, kept so a later click can resolve a
//! navigation target. Also implements the recursive text filter the views
//! apply on top of the materialized tree.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::node::CallNode;
use crate::domain::tree::TreeNode;
use crate::ports::NameDemangler;

/// One row of a rendered tree view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayItem {
    /// Demangled name, or the raw name when demangling fails.
    pub label: String,
    /// Identity of the underlying node, for navigation resolution.
    pub node: CallNode,
    pub expanded: bool,
    pub children: Vec<DisplayItem>,
}

impl DisplayItem {
    /// Materialize one walked node and its subtree.
    pub fn materialize(tree_node: &TreeNode, demangler: &dyn NameDemangler) -> DisplayItem {
        let label = demangler
            .demangle(&tree_node.node.name)
            .unwrap_or_else(|| tree_node.node.name.clone());
        DisplayItem {
            label,
            node: tree_node.node.clone(),
            expanded: true,
            children: tree_node
                .children
                .iter()
                .map(|c| DisplayItem::materialize(c, demangler))
                .collect(),
        }
    }

    fn set_expanded_recursive(&mut self, expanded: bool) {
        self.expanded = expanded;
        for child in &mut self.children {
            child.set_expanded_recursive(expanded);
        }
    }
}

/// Materialize the top-level entries of a walked tree.
pub fn materialize_all(entries: &[TreeNode], demangler: &dyn NameDemangler) -> Vec<DisplayItem> {
    entries
        .iter()
        .map(|e| DisplayItem::materialize(e, demangler))
        .collect()
}

pub fn set_expanded(items: &mut [DisplayItem], expanded: bool) {
    for item in items {
        item.set_expanded_recursive(expanded);
    }
}

/// Recursive filtering: an item survives when its label matches or any
/// descendant does; ancestors of a match stay visible so the path to the
/// match is intact. Surviving items come back fully expanded.
pub fn filter_items(items: &[DisplayItem], pattern: &Regex) -> Vec<DisplayItem> {
    let mut kept = Vec::new();
    for item in items {
        let children = filter_items(&item.children, pattern);
        if pattern.is_match(&item.label) || !children.is_empty() {
            kept.push(DisplayItem {
                label: item.label.clone(),
                node: item.node.clone(),
                expanded: true,
                children,
            });
        }
    }
    kept
}

/// Look up an item by its child-index path. Empty paths address nothing.
pub fn item_at<'a>(items: &'a [DisplayItem], path: &[usize]) -> Option<&'a DisplayItem> {
    let (&first, rest) = path.split_first()?;
    let item = items.get(first)?;
    if rest.is_empty() {
        Some(item)
    } else {
        item_at(&item.children, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::TreeNode;

    struct NoDemangle;
    impl NameDemangler for NoDemangle {
        fn demangle(&self, _raw: &str) -> Option<String> {
            None
        }
    }

    struct Upper;
    impl NameDemangler for Upper {
        fn demangle(&self, raw: &str) -> Option<String> {
            Some(raw.to_uppercase())
        }
    }

    fn sample() -> Vec<TreeNode> {
        vec![
            TreeNode {
                node: CallNode::function("init", 0x2000),
                children: vec![TreeNode::leaf(CallNode::function("malloc", 0x9000))],
            },
            TreeNode::leaf(CallNode::function("run", 0x3000)),
        ]
    }

    #[test]
    fn test_materialize_falls_back_to_raw_name() {
        let items = materialize_all(&sample(), &NoDemangle);
        assert_eq!(items[0].label, "init");
        assert!(items[0].expanded);
    }

    #[test]
    fn test_materialize_round_trip_identity() {
        let entries = sample();
        let items = materialize_all(&entries, &Upper);
        assert_eq!(items[0].label, "INIT");
        // The label changed but the identity used to build the item is intact.
        assert_eq!(items[0].node, entries[0].node);
        assert_eq!(items[0].children[0].node, entries[0].children[0].node);
    }

    #[test]
    fn test_filter_keeps_ancestors_of_match() {
        let items = materialize_all(&sample(), &NoDemangle);
        let re = Regex::new("malloc").unwrap();
        let visible = filter_items(&items, &re);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].label, "init");
        assert_eq!(visible[0].children[0].label, "malloc");
    }

    #[test]
    fn test_filter_drops_non_matching_subtrees() {
        let items = materialize_all(&sample(), &NoDemangle);
        let re = Regex::new("^run$").unwrap();
        let visible = filter_items(&items, &re);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].label, "run");
        assert!(visible[0].children.is_empty());
    }

    #[test]
    fn test_item_at_path() {
        let items = materialize_all(&sample(), &NoDemangle);
        assert_eq!(item_at(&items, &[0, 0]).unwrap().label, "malloc");
        assert_eq!(item_at(&items, &[1]).unwrap().label, "run");
        assert!(item_at(&items, &[]).is_none());
        assert!(item_at(&items, &[5]).is_none());
    }

    #[test]
    fn test_collapse_and_expand_all() {
        let mut items = materialize_all(&sample(), &NoDemangle);
        set_expanded(&mut items, false);
        assert!(!items[0].expanded && !items[0].children[0].expanded);
        set_expanded(&mut items, true);
        assert!(items[0].children[0].expanded);
    }
}
