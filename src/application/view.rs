//! Incremental View Binder
//!
//! Model of one sidebar tree view (incoming or outgoing), minus the widget
//! toolkit. Owns the walker configuration, the current focus, the
//! materialized display tree, and the text filter, and resolves clicks into
//! navigation targets.
//!
//! A view is `Empty` until the first focus arrives and stays `Populated`
//! through focus/depth/filter changes; only an explicit clear empties it
//! again. Rebuilds are skipped while the view is hidden.

use regex::Regex;

use crate::application::display::{self, DisplayItem};
use crate::domain::node::CallNode;
use crate::domain::settings::Settings;
use crate::domain::tree::Direction;
use crate::domain::walker::{find_call_site, Walker};
use crate::ports::{CallGraphSource, NameDemangler, Navigator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Empty,
    Populated,
}

pub struct CallTreeView {
    direction: Direction,
    depth: usize,
    walker: Walker,
    visible: bool,
    skip_refresh: bool,
    focus: Option<CallNode>,
    items: Vec<DisplayItem>,
    filter_text: String,
    filter: Option<Regex>,
}

impl CallTreeView {
    pub fn new(direction: Direction, settings: &Settings) -> Self {
        Self {
            direction,
            depth: settings.depth_for(direction),
            walker: Walker::from_settings(settings),
            visible: true,
            skip_refresh: false,
            focus: None,
            items: Vec::new(),
            filter_text: String::new(),
            filter: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> ViewState {
        if self.focus.is_some() {
            ViewState::Populated
        } else {
            ViewState::Empty
        }
    }

    pub fn focus(&self) -> Option<&CallNode> {
        self.focus.as_ref()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the host should skip its next sidebar refresh. Reading the
    /// flag consumes it.
    pub fn take_skip_refresh(&mut self) -> bool {
        std::mem::take(&mut self.skip_refresh)
    }

    /// The full materialized tree, ignoring the filter.
    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    /// The tree as presented: filtered when a filter is active, fully
    /// expanded after a rebuild or filter change.
    pub fn visible_items(&self) -> Vec<DisplayItem> {
        match &self.filter {
            Some(re) => display::filter_items(&self.items, re),
            None => self.items.to_vec(),
        }
    }

    /// React to the host focusing a new function. No-op while hidden; the
    /// stale tree is rebuilt when focus next changes with the view shown.
    pub fn update_focus(
        &mut self,
        source: &dyn CallGraphSource,
        demangler: &dyn NameDemangler,
        func: &CallNode,
    ) {
        if !self.visible {
            return;
        }
        self.focus = Some(func.clone());
        self.rebuild(source, demangler);
    }

    /// Change the depth bound and re-walk the current root.
    pub fn set_depth(
        &mut self,
        source: &dyn CallGraphSource,
        demangler: &dyn NameDemangler,
        depth: usize,
    ) {
        self.depth = depth;
        if self.focus.is_some() && self.visible {
            self.rebuild(source, demangler);
        }
    }

    /// Change the text filter. An empty string clears it; a pattern that
    /// fails to compile is treated as no filter.
    pub fn set_filter(&mut self, text: &str) {
        self.filter_text = text.to_string();
        self.filter = if text.is_empty() {
            None
        } else {
            match Regex::new(text) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("invalid filter pattern {:?}: {}", text, e);
                    None
                }
            }
        };
        // Filtering re-presents the tree fully expanded.
        display::set_expanded(&mut self.items, true);
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn expand_all(&mut self) {
        display::set_expanded(&mut self.items, true);
    }

    pub fn collapse_all(&mut self) {
        display::set_expanded(&mut self.items, false);
    }

    /// Drop the tree and return to `Empty`.
    pub fn clear(&mut self) {
        self.focus = None;
        self.items.clear();
    }

    /// Single click: navigate to the call-site address realizing the edge
    /// between the clicked item and its parent (the focused function for
    /// top-level items). Which endpoint is the caller depends on direction.
    /// First matching site wins; no match is a silent no-op. On success the
    /// skip-refresh flag is raised so the host does not rebuild the sidebar
    /// for its own navigation.
    ///
    /// Paths address the tree as presented, so with a filter active they
    /// index the filtered rows the user is looking at.
    pub fn click(
        &mut self,
        source: &dyn CallGraphSource,
        navigator: &dyn Navigator,
        path: &[usize],
    ) -> Option<u64> {
        let presented = self.visible_items();
        let item = display::item_at(&presented, path)?.node.clone();
        let parent = if path.len() > 1 {
            display::item_at(&presented, &path[..path.len() - 1])?
                .node
                .clone()
        } else {
            self.focus.clone()?
        };

        let (caller, callee) = match self.direction {
            Direction::Callers => (item, parent),
            Direction::Callees => (parent, item),
        };
        let site = find_call_site(source, &caller, &callee)?;
        self.skip_refresh = true;
        navigator.navigate(site);
        Some(site)
    }

    /// Double click: navigate to the clicked node's own definition or symbol
    /// address. Clears the skip-refresh flag so the sidebar follows. Paths
    /// address the presented tree, as for [`CallTreeView::click`].
    pub fn double_click(&mut self, navigator: &dyn Navigator, path: &[usize]) -> Option<u64> {
        let presented = self.visible_items();
        let item = display::item_at(&presented, path)?;
        let address = item.node.address;
        self.skip_refresh = false;
        navigator.navigate(address);
        Some(address)
    }

    fn rebuild(&mut self, source: &dyn CallGraphSource, demangler: &dyn NameDemangler) {
        self.items.clear();
        let root = match &self.focus {
            Some(f) => f.clone(),
            None => return,
        };
        let tree = self.walker.walk(source, &root, self.direction, self.depth);
        self.items = display::materialize_all(&tree.entries, demangler);
    }
}
