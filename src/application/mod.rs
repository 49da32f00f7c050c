pub mod display;
pub mod view;

use crate::domain::node::CallNode;
use crate::domain::tree::Direction;
use crate::domain::walker::Walker;
use crate::ports::{CallGraphSource, TreeExporter};

/// Walk one direction of one root and hand the tree to an exporter.
pub struct ExportUsecase<'a> {
    pub source: &'a dyn CallGraphSource,
    pub exporter: &'a dyn TreeExporter,
}

impl<'a> ExportUsecase<'a> {
    pub fn run(
        &self,
        walker: &Walker,
        root: &CallNode,
        direction: Direction,
        max_depth: usize,
        out_path: &str,
    ) -> std::io::Result<()> {
        let tree = walker.walk(self.source, root, direction, max_depth);
        self.exporter.export(&tree, out_path)
    }
}
