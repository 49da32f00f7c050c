// Result tree produced by the walker.
// The focused function is the tree root; `entries` are its immediate callers
// or callees, each carrying its own bounded subtree.

use serde::{Deserialize, Serialize};

use crate::domain::node::CallNode;

/// Which call relation a tree was walked over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Functions that call the root.
    Callers,
    /// Functions the root calls.
    Callees,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Direction> {
        match s.to_lowercase().as_str() {
            "in" | "callers" | "incoming" => Some(Direction::Callers),
            "out" | "callees" | "outgoing" => Some(Direction::Callees),
            _ => None,
        }
    }

    /// Label used for view headers and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Callers => "Incoming Calls",
            Direction::Callees => "Outgoing Calls",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One node of the walked tree with its (possibly truncated) children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub node: CallNode,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(node: CallNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Longest path below this node, in edges. A leaf reports 0.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}

/// A bounded call tree for one focused function in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTree {
    /// The focused function the walk started from. Not itself an entry.
    pub root: CallNode,
    pub direction: Direction,
    /// Immediate relations of the root, each with its bounded subtree.
    pub entries: Vec<TreeNode>,
}

impl CallTree {
    pub fn empty(root: CallNode, direction: Direction) -> Self {
        Self {
            root,
            direction,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total nodes materialized, excluding the root.
    pub fn node_count(&self) -> usize {
        self.entries.iter().map(TreeNode::count).sum()
    }

    /// Longest path from the root, in edges. Empty trees report 0.
    pub fn max_path_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(name: &str, addr: u64) -> CallNode {
        CallNode::function(name, addr)
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("in"), Some(Direction::Callers));
        assert_eq!(Direction::parse("OUT"), Some(Direction::Callees));
        assert_eq!(Direction::parse("incoming"), Some(Direction::Callers));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn test_tree_metrics() {
        let tree = CallTree {
            root: f("main", 0x1000),
            direction: Direction::Callees,
            entries: vec![
                TreeNode {
                    node: f("init", 0x2000),
                    children: vec![TreeNode::leaf(f("malloc", 0x3000))],
                },
                TreeNode::leaf(f("run", 0x4000)),
            ],
        };
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.max_path_len(), 2);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree = CallTree::empty(f("main", 0x1000), Direction::Callers);
        assert!(tree.is_empty());
        assert_eq!(tree.max_path_len(), 0);
        assert_eq!(tree.node_count(), 0);
    }
}
