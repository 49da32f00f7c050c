//! Depth-Bounded Call Graph Walker
//!
//! Pure traversal over a [`CallGraphSource`]: given a focused function, a
//! direction, and settings, produces a [`CallTree`] whose longest path never
//! exceeds the configured depth. Blacklists and the sibling limit bound work
//! on pathological graphs (deep recursion, huge fan-out/fan-in).
//!
//! Nothing here fails: unresolvable targets and unrecognized call encodings
//! degrade to "show less of the graph", reported through `log`.

use std::collections::HashSet;

use crate::domain::node::{CallExpr, CallNode};
use crate::domain::settings::{Blacklist, Settings};
use crate::domain::tree::{CallTree, Direction, TreeNode};
use crate::ports::CallGraphSource;

/// Resolve every call site of `func` to a concrete target.
///
/// Returns `(site_address, target)` pairs in call-site enumeration order.
/// Direct calls resolve to a function at the target address or, failing that,
/// a symbol (compiler builtins land here). Import calls resolve to the import
/// symbol. Indirect calls are resolved through cross-references recorded from
/// the site address, e.g. targets observed by a tracer. Unrecognized
/// encodings are reported and skipped.
pub fn callee_targets(source: &dyn CallGraphSource, func: &CallNode) -> Vec<(u64, CallNode)> {
    let mut out = Vec::new();
    for site in source.call_sites(func) {
        match site.expr {
            CallExpr::Direct { target } => {
                if let Some(f) = source.function_at(target) {
                    out.push((site.address, f));
                } else if let Some(s) = source.symbol_at(target) {
                    out.push((site.address, s));
                }
            }
            CallExpr::Import { target } => {
                if let Some(s) = source.symbol_at(target) {
                    out.push((site.address, s));
                }
            }
            CallExpr::Indirect => {
                for addr in source.code_refs_from(site.address) {
                    if let Some(f) = source.function_at(addr) {
                        out.push((site.address, f));
                    }
                }
            }
            CallExpr::Unknown { ref operation } => {
                log::warn!(
                    "unknown call operation {} at {:#x} in {}",
                    operation,
                    site.address,
                    func.name
                );
            }
        }
    }
    out
}

/// Find the call site in `caller` whose resolved target is `callee`.
/// First match wins; `None` if no site realizes the edge.
pub fn find_call_site(
    source: &dyn CallGraphSource,
    caller: &CallNode,
    callee: &CallNode,
) -> Option<u64> {
    callee_targets(source, caller)
        .into_iter()
        .find(|(_, target)| target == callee)
        .map(|(addr, _)| addr)
}

/// The traversal itself. Holds the compiled blacklists and the sibling limit;
/// the source and depth are supplied per walk.
pub struct Walker {
    soft: Blacklist,
    hard: Blacklist,
    limit: usize,
}

impl Walker {
    pub fn new(soft: Blacklist, hard: Blacklist, limit: usize) -> Self {
        Self { soft, hard, limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Blacklist::compile(&settings.soft_blacklist),
            Blacklist::compile(&settings.hard_blacklist),
            settings.limit,
        )
    }

    /// Walk the call relation of `root` to at most `max_depth` edges.
    ///
    /// The root itself is never an entry of the result. A root that is
    /// hard-blacklisted, or whose kind is not expandable, yields an empty
    /// tree, as does `max_depth == 0`.
    pub fn walk(
        &self,
        source: &dyn CallGraphSource,
        root: &CallNode,
        direction: Direction,
        max_depth: usize,
    ) -> CallTree {
        CallTree {
            root: root.clone(),
            direction,
            entries: self.expand(source, root, direction, 0, max_depth),
        }
    }

    /// Materialize the children of `func` at `depth` edges from the root.
    ///
    /// The limit check fires after inserting a candidate, so up to
    /// `limit + 1` siblings land in the result before truncation; the
    /// truncated tail is dropped, already-inserted items stay.
    fn expand(
        &self,
        source: &dyn CallGraphSource,
        func: &CallNode,
        direction: Direction,
        depth: usize,
        max_depth: usize,
    ) -> Vec<TreeNode> {
        if depth >= max_depth {
            return Vec::new();
        }
        if !func.kind.is_expandable() {
            return Vec::new();
        }
        if self.hard.matches(&func.name) {
            return Vec::new();
        }

        let mut children = Vec::new();
        let mut count = 0usize;
        for candidate in self.relation(source, func, direction) {
            children.push(TreeNode::leaf(candidate));
            count += 1;
            if count > self.limit {
                log::info!("subtree limit reached under {}", func.name);
                break;
            }
            // Checks run against the node just inserted; matches and direct
            // self-calls stay in the tree as leaves.
            let inserted = match children.last_mut() {
                Some(n) => n,
                None => break,
            };
            if inserted.node == *func {
                continue;
            }
            if self.soft.matches(&inserted.node.name) {
                continue;
            }
            let candidate = inserted.node.clone();
            let sub = self.expand(source, &candidate, direction, depth + 1, max_depth);
            if let Some(last) = children.last_mut() {
                last.children = sub;
            }
        }
        children
    }

    /// Immediate relation set of `func` in enumeration order.
    ///
    /// Callers are deduplicated (a function calling `func` from several sites
    /// appears once); callees are not, each resolved site contributes.
    fn relation(
        &self,
        source: &dyn CallGraphSource,
        func: &CallNode,
        direction: Direction,
    ) -> Vec<CallNode> {
        match direction {
            Direction::Callers => {
                let mut seen = HashSet::new();
                source
                    .callers(func)
                    .into_iter()
                    .filter(|c| seen.insert(c.clone()))
                    .collect()
            }
            Direction::Callees => callee_targets(source, func)
                .into_iter()
                .map(|(_, target)| target)
                .collect(),
        }
    }
}
