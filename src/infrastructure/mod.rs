// Infrastructure implementations for Calltree.

pub mod concurrency;
pub mod demangle;
pub mod snapshot;

use std::collections::HashSet;

use crate::domain::node::CallNode;
use crate::domain::tree::{CallTree, Direction, TreeNode};
use crate::ports::TreeExporter;

/// Plain indented text, one node per line.
pub struct TextExporter;

impl TreeExporter for TextExporter {
    fn export(&self, tree: &CallTree, path: &str) -> std::io::Result<()> {
        std::fs::write(path, Self::to_text(tree))
    }
}

impl TextExporter {
    pub fn to_text(tree: &CallTree) -> String {
        let mut lines = Vec::new();
        lines.push(format!("{}: {}", tree.direction.label(), tree.root));
        for entry in &tree.entries {
            Self::push_node(entry, 1, &mut lines);
        }
        lines.join("\n") + "\n"
    }

    fn push_node(node: &TreeNode, indent: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}{}", "  ".repeat(indent), node.node));
        for child in &node.children {
            Self::push_node(child, indent + 1, lines);
        }
    }
}

/// Graphviz DOT. Edges always point caller -> callee, so a callers tree is
/// drawn with arrows into the parent.
pub struct DotExporter;

impl TreeExporter for DotExporter {
    fn export(&self, tree: &CallTree, path: &str) -> std::io::Result<()> {
        std::fs::write(path, Self::to_dot(tree))
    }
}

impl DotExporter {
    pub fn to_dot(tree: &CallTree) -> String {
        let mut lines = Vec::new();
        lines.push("digraph CallTree {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12, shape=box];".to_string());
        lines.push(String::new());

        let mut declared = HashSet::new();
        Self::declare_node(&tree.root, true, &mut declared, &mut lines);
        for entry in &tree.entries {
            Self::walk_nodes(entry, &mut declared, &mut lines);
        }

        lines.push(String::new());
        for entry in &tree.entries {
            Self::walk_edges(&tree.root, entry, tree.direction, &mut lines);
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    fn node_id(node: &CallNode) -> String {
        format!("n{:x}", node.address)
    }

    fn declare_node(
        node: &CallNode,
        is_root: bool,
        declared: &mut HashSet<String>,
        lines: &mut Vec<String>,
    ) {
        let id = Self::node_id(node);
        if !declared.insert(id.clone()) {
            return;
        }
        let style = if is_root {
            "filled,bold"
        } else if node.kind.is_expandable() {
            "filled"
        } else {
            "filled,dashed"
        };
        lines.push(format!(
            "    {} [label=\"{}\", style=\"{}\"];",
            id,
            Self::escape_label(&node.name),
            style
        ));
    }

    fn walk_nodes(node: &TreeNode, declared: &mut HashSet<String>, lines: &mut Vec<String>) {
        Self::declare_node(&node.node, false, declared, lines);
        for child in &node.children {
            Self::walk_nodes(child, declared, lines);
        }
    }

    fn walk_edges(
        parent: &CallNode,
        node: &TreeNode,
        direction: Direction,
        lines: &mut Vec<String>,
    ) {
        let (from, to) = match direction {
            Direction::Callees => (parent, &node.node),
            Direction::Callers => (&node.node, parent),
        };
        lines.push(format!(
            "    {} -> {};",
            Self::node_id(from),
            Self::node_id(to)
        ));
        for child in &node.children {
            Self::walk_edges(&node.node, child, direction, lines);
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

/// The tree itself, pretty-printed JSON.
pub struct JsonExporter;

impl TreeExporter for JsonExporter {
    fn export(&self, tree: &CallTree, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(tree)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CallTree {
        CallTree {
            root: CallNode::function("main", 0x1000),
            direction: Direction::Callees,
            entries: vec![
                TreeNode {
                    node: CallNode::function("init", 0x2000),
                    children: vec![TreeNode::leaf(CallNode::function("malloc", 0x9000))],
                },
                TreeNode::leaf(CallNode::function("run", 0x3000)),
            ],
        }
    }

    #[test]
    fn test_to_text_indents_by_depth() {
        let text = TextExporter::to_text(&sample());
        assert!(text.starts_with("Outgoing Calls: main @ 0x1000"));
        assert!(text.contains("\n  init @ 0x2000"));
        assert!(text.contains("\n    malloc @ 0x9000"));
        assert!(text.contains("\n  run @ 0x3000"));
    }

    #[test]
    fn test_to_dot_declares_nodes_and_edges() {
        let dot = DotExporter::to_dot(&sample());
        assert!(dot.contains("digraph CallTree"));
        assert!(dot.contains("n1000 [label=\"main\""));
        assert!(dot.contains("n1000 -> n2000;"));
        assert!(dot.contains("n2000 -> n9000;"));
    }

    #[test]
    fn test_callers_edges_point_into_parent() {
        let mut tree = sample();
        tree.direction = Direction::Callers;
        let dot = DotExporter::to_dot(&tree);
        assert!(dot.contains("n2000 -> n1000;"));
        assert!(dot.contains("n9000 -> n2000;"));
    }

    #[test]
    fn test_dot_escapes_labels() {
        let tree = CallTree {
            root: CallNode::function("operator\"\"_x", 0x10),
            direction: Direction::Callees,
            entries: vec![],
        };
        let dot = DotExporter::to_dot(&tree);
        assert!(dot.contains("operator\\\"\\\"_x"));
    }
}
