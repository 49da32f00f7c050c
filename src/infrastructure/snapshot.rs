//! Program Snapshot Source
//!
//! An immutable in-memory model of one analyzed binary: functions with their
//! decoded call sites, external symbols, and recorded cross-references.
//! Loaded from a JSON document and indexed up front, it implements the
//! [`CallGraphSource`] port so the explorer can run without a live host.
//!
//! The reverse (caller) index is derived from the call sites in parallel.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::node::{CallNode, CallSite, NodeKind};
use crate::domain::walker::callee_targets;
use crate::ports::CallGraphSource;

/// On-disk snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDoc {
    pub functions: Vec<FunctionDoc>,
    #[serde(default)]
    pub symbols: Vec<SymbolDoc>,
    /// Cross-reference targets keyed by call-site address, e.g. indirect
    /// call targets observed by a tracer.
    #[serde(default)]
    pub code_refs: HashMap<u64, Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    pub start: u64,
    #[serde(default)]
    pub call_sites: Vec<CallSite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDoc {
    pub name: String,
    pub address: u64,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
struct FunctionRecord {
    node: CallNode,
    call_sites: Vec<CallSite>,
}

/// Indexed snapshot. Read-only after construction.
pub struct ProgramSnapshot {
    functions: DashMap<u64, FunctionRecord>,
    by_name: DashMap<String, u64>,
    symbols: DashMap<u64, CallNode>,
    callers: DashMap<u64, Vec<CallNode>>,
    code_refs: DashMap<u64, Vec<u64>>,
}

impl ProgramSnapshot {
    /// Load and index a snapshot JSON file.
    pub fn load(path: &Path) -> Result<ProgramSnapshot> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
        let doc: SnapshotDoc = serde_json::from_str(&content)
            .with_context(|| format!("Invalid snapshot file {}", path.display()))?;
        Ok(Self::from_doc(doc))
    }

    pub fn from_doc(doc: SnapshotDoc) -> ProgramSnapshot {
        let snapshot = ProgramSnapshot {
            functions: DashMap::new(),
            by_name: DashMap::new(),
            symbols: DashMap::new(),
            callers: DashMap::new(),
            code_refs: DashMap::new(),
        };

        for f in doc.functions {
            let node = CallNode::function(f.name.clone(), f.start);
            snapshot.by_name.entry(f.name).or_insert(f.start);
            snapshot.functions.insert(
                f.start,
                FunctionRecord {
                    node,
                    call_sites: f.call_sites,
                },
            );
        }
        for s in doc.symbols {
            snapshot
                .symbols
                .insert(s.address, CallNode::symbol(s.name, s.address, s.kind));
        }
        for (address, targets) in doc.code_refs {
            snapshot.code_refs.insert(address, targets);
        }

        // Derive the caller index in parallel; each resolved call target
        // gains a reverse edge. Duplicates are fine, the walker deduplicates.
        let nodes: Vec<CallNode> = snapshot
            .functions
            .iter()
            .map(|r| r.value().node.clone())
            .collect();
        nodes.par_iter().for_each(|caller| {
            for (_site, target) in callee_targets(&snapshot, caller) {
                snapshot
                    .callers
                    .entry(target.address)
                    .or_default()
                    .push(caller.clone());
            }
        });

        snapshot
    }

    /// First function carrying this exact name.
    pub fn function_named(&self, name: &str) -> Option<CallNode> {
        self.by_name
            .get(name)
            .and_then(|start| self.function_at(*start))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

impl CallGraphSource for ProgramSnapshot {
    fn callers(&self, func: &CallNode) -> Vec<CallNode> {
        self.callers
            .get(&func.address)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    fn call_sites(&self, func: &CallNode) -> Vec<CallSite> {
        self.functions
            .get(&func.address)
            .map(|r| r.call_sites.clone())
            .unwrap_or_default()
    }

    fn function_at(&self, address: u64) -> Option<CallNode> {
        self.functions.get(&address).map(|r| r.node.clone())
    }

    fn symbol_at(&self, address: u64) -> Option<CallNode> {
        self.symbols.get(&address).map(|r| r.value().clone())
    }

    fn code_refs_from(&self, address: u64) -> Vec<u64> {
        self.code_refs
            .get(&address)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::CallExpr;

    fn doc() -> SnapshotDoc {
        serde_json::from_str(
            r#"{
                "functions": [
                    {"name": "main", "start": 4096, "call_sites": [
                        {"address": 4100, "expr": {"op": "direct", "target": 8192}},
                        {"address": 4112, "expr": {"op": "indirect"}}
                    ]},
                    {"name": "helper", "start": 8192, "call_sites": [
                        {"address": 8200, "expr": {"op": "import", "target": 36864}}
                    ]},
                    {"name": "handler", "start": 12288}
                ],
                "symbols": [
                    {"name": "free", "address": 36864, "kind": "import_address"}
                ],
                "code_refs": {"4112": [12288]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_address_and_name() {
        let snap = ProgramSnapshot::from_doc(doc());
        assert_eq!(snap.function_count(), 3);
        assert_eq!(snap.symbol_count(), 1);

        let main = snap.function_named("main").unwrap();
        assert_eq!(main.address, 4096);
        assert_eq!(snap.function_at(8192).unwrap().name, "helper");
        assert_eq!(snap.symbol_at(36864).unwrap().kind, NodeKind::ImportAddress);
        assert!(snap.function_named("missing").is_none());
    }

    #[test]
    fn test_caller_index_covers_direct_and_indirect_edges() {
        let snap = ProgramSnapshot::from_doc(doc());
        let helper = snap.function_named("helper").unwrap();
        let handler = snap.function_named("handler").unwrap();

        let callers: Vec<String> = snap.callers(&helper).iter().map(|c| c.name.clone()).collect();
        assert_eq!(callers, vec!["main"]);
        // handler is only reachable through the recorded code ref.
        let callers: Vec<String> = snap.callers(&handler).iter().map(|c| c.name.clone()).collect();
        assert_eq!(callers, vec!["main"]);
        // the import symbol gains a reverse edge as well
        let free = snap.symbol_at(36864).unwrap();
        assert_eq!(snap.callers(&free).len(), 1);
    }

    #[test]
    fn test_call_sites_preserved_in_order() {
        let snap = ProgramSnapshot::from_doc(doc());
        let main = snap.function_named("main").unwrap();
        let sites = snap.call_sites(&main);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].address, 4100);
        assert!(matches!(sites[1].expr, CallExpr::Indirect));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        fs::write(&path, serde_json::to_string(&doc()).unwrap()).unwrap();

        let snap = ProgramSnapshot::load(&path).unwrap();
        assert_eq!(snap.function_count(), 3);

        let missing = ProgramSnapshot::load(&dir.path().join("nope.json"));
        assert!(missing.is_err());
    }
}
