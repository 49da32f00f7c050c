// Ports: the seams between the explorer core and its host.
// A disassembler host implements `CallGraphSource` and `Navigator` over its
// analysis engine; the bundled snapshot source implements them for headless
// use.

use crate::domain::node::{CallNode, CallSite};
use crate::domain::tree::CallTree;

/// Read access to one program's call graph, treated as an immutable snapshot
/// for the duration of a walk.
pub trait CallGraphSource {
    /// Functions with at least one call site targeting `func`. May contain
    /// duplicates; the walker deduplicates.
    fn callers(&self, func: &CallNode) -> Vec<CallNode>;

    /// Call instructions inside `func`, with their decoded destinations.
    fn call_sites(&self, func: &CallNode) -> Vec<CallSite>;

    /// The defined function starting at `address`, if any.
    fn function_at(&self, address: u64) -> Option<CallNode>;

    /// The symbol at `address`, if any.
    fn symbol_at(&self, address: u64) -> Option<CallNode>;

    /// Recorded cross-reference targets from a call-site address. Used to
    /// resolve indirect calls.
    fn code_refs_from(&self, address: u64) -> Vec<u64>;
}

/// Host navigation. Clicking a tree item ends up here.
pub trait Navigator {
    fn navigate(&self, address: u64);
}

/// Name demangling service. `None` means "could not demangle"; callers fall
/// back to the raw name.
pub trait NameDemangler {
    fn demangle(&self, raw: &str) -> Option<String>;
}

/// Rendering of a walked tree to some output format.
pub trait TreeExporter {
    fn export(&self, tree: &CallTree, path: &str) -> std::io::Result<()>;
}
