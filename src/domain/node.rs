// Call-graph node identity for Calltree.
// A node is either a defined function or an external symbol; the kind decides
// whether traversal may expand it.

use serde::{Deserialize, Serialize};

/// Symbol kind backing a call-graph node.
///
/// Only `Function` nodes have a body worth expanding. The other kinds are
/// stubs or thunks (import table entries, library stubs, symbolic functions)
/// and terminate traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    ImportAddress,
    LibraryFunction,
    Symbolic,
}

impl NodeKind {
    /// Whether a node of this kind may be expanded into children.
    pub fn is_expandable(&self) -> bool {
        matches!(self, NodeKind::Function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Function => "function",
            NodeKind::ImportAddress => "import_address",
            NodeKind::LibraryFunction => "library_function",
            NodeKind::Symbolic => "symbolic",
        }
    }
}

/// Identity of a call-graph node.
///
/// For a defined function `address` is the function start; for an external
/// symbol it is the symbol address. Two nodes are the same node exactly when
/// all three fields agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallNode {
    pub name: String,
    pub address: u64,
    pub kind: NodeKind,
}

impl CallNode {
    pub fn function(name: impl Into<String>, start: u64) -> Self {
        Self {
            name: name.into(),
            address: start,
            kind: NodeKind::Function,
        }
    }

    pub fn symbol(name: impl Into<String>, address: u64, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            address,
            kind,
        }
    }
}

impl std::fmt::Display for CallNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {:#x}", self.name, self.address)
    }
}

/// A call instruction inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Address of the call instruction itself.
    pub address: u64,
    /// Decoded shape of the call destination.
    pub expr: CallExpr,
}

/// Classification of a call instruction's destination, as decoded from the
/// host's IL. Direct and import calls carry a constant target address;
/// indirect calls are resolved later through cross-references from the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CallExpr {
    /// Call to a constant address.
    Direct { target: u64 },
    /// Call through an import table entry.
    Import { target: u64 },
    /// Call through a register, variable, or memory load.
    Indirect,
    /// An encoding the decoder did not recognize.
    Unknown { operation: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_functions_expand() {
        assert!(NodeKind::Function.is_expandable());
        assert!(!NodeKind::ImportAddress.is_expandable());
        assert!(!NodeKind::LibraryFunction.is_expandable());
        assert!(!NodeKind::Symbolic.is_expandable());
    }

    #[test]
    fn test_identity_distinguishes_kind_and_address() {
        let f = CallNode::function("memcpy", 0x1000);
        let s = CallNode::symbol("memcpy", 0x1000, NodeKind::ImportAddress);
        assert_ne!(f, s);
        assert_eq!(f, CallNode::function("memcpy", 0x1000));
    }

    #[test]
    fn test_call_expr_json_shape() {
        let expr = CallExpr::Direct { target: 0x2000 };
        let json = serde_json::to_string(&expr).unwrap();
        assert!(json.contains("\"op\":\"direct\""));

        let back: CallExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);

        let unknown: CallExpr =
            serde_json::from_str(r#"{"op":"unknown","operation":"MLIL_TAILCALL"}"#).unwrap();
        assert!(matches!(unknown, CallExpr::Unknown { .. }));
    }
}
