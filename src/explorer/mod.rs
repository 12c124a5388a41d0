//! Explorer feature - document structure exploration.
//!
//! This module provides the overview tree, its cursor and expansion state,
//! and the tree and details panes drawn from it.

pub mod details;
mod node;
pub mod tree;

pub use node::{Node, TreeBuilder, WidthTier};

use crate::data::Path;
use std::collections::HashSet;

/// Explorer state - combines tree navigation and details display.
#[derive(Debug)]
pub struct ExplorerState {
    /// All tree items in display order (only visible items).
    items: Vec<TreeItem>,
    /// Cursor position (index into items).
    cursor: usize,
    /// The root node for rebuilding.
    root: Option<Node>,
    /// Set of expanded node paths.
    expanded_paths: HashSet<Path>,
    /// Scroll offset for the tree view.
    scroll_offset: usize,
    /// Show preview/details panel.
    pub show_preview: bool,
    /// Preview scroll offset.
    pub preview_scroll: u16,
}

/// A single item in the tree view.
#[derive(Debug, Clone)]
pub struct TreeItem {
    /// The node, without its children.
    pub node: Node,
    /// Nesting level.
    pub level: usize,
    /// Whether this node is expanded.
    pub expanded: bool,
    /// Whether this node has built children.
    pub expandable: bool,
}

impl ExplorerState {
    /// Create a new explorer state.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            root: None,
            expanded_paths: HashSet::new(),
            scroll_offset: 0,
            show_preview: true,
            preview_scroll: 0,
        }
    }

    /// Show a new tree with only the root expanded.
    pub fn build_from_root(&mut self, root: Node) {
        self.expanded_paths.clear();
        self.expanded_paths.insert(root.path.clone());
        self.root = Some(root);
        self.rebuild_visible_items();
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    /// The tree being shown.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Rebuild the visible items list based on expanded state.
    fn rebuild_visible_items(&mut self) {
        let mut items = Vec::new();
        if let Some(root) = &self.root {
            Self::add_visible_recursive(root, 0, &self.expanded_paths, &mut items);
        }
        self.items = items;
        if self.cursor >= self.items.len() {
            self.cursor = self.items.len().saturating_sub(1);
        }
    }

    fn add_visible_recursive(
        node: &Node,
        level: usize,
        expanded_paths: &HashSet<Path>,
        items: &mut Vec<TreeItem>,
    ) {
        let is_expanded = node.is_expandable() && expanded_paths.contains(&node.path);

        items.push(TreeItem {
            node: node.shallow(),
            level,
            expanded: is_expanded,
            expandable: node.is_expandable(),
        });

        if is_expanded {
            for child in &node.children {
                Self::add_visible_recursive(child, level + 1, expanded_paths, items);
            }
        }
    }

    /// Move the cursor up one position.
    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.preview_scroll = 0;
        }
    }

    /// Move the cursor down one position.
    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
            self.preview_scroll = 0;
        }
    }

    /// Adjust scroll to keep cursor visible.
    pub fn adjust_scroll(&mut self, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }

        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        }

        if self.cursor >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor.saturating_sub(viewport_height - 1);
        }
    }

    /// Get the current scroll offset.
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Expand the node at the current cursor position.
    ///
    /// Returns `false` when the node has no built children to show.
    pub fn expand_current(&mut self) -> bool {
        let Some(item) = self.items.get(self.cursor) else {
            return false;
        };
        if !item.expandable {
            return false;
        }
        if !item.expanded {
            let path = item.node.path.clone();
            self.expanded_paths.insert(path);
            self.rebuild_visible_items();
        }
        true
    }

    /// Collapse the node at the current cursor position, or jump to its parent.
    pub fn collapse_current(&mut self) {
        let Some(item) = self.items.get(self.cursor) else {
            return;
        };
        if item.expanded {
            let path = item.node.path.clone();
            self.expanded_paths.remove(&path);
            self.rebuild_visible_items();
        } else if item.level > 0 {
            let level = item.level;
            if let Some(parent) = self.items[..self.cursor]
                .iter()
                .rposition(|candidate| candidate.level < level)
            {
                self.cursor = parent;
            }
        }
    }

    /// Replace the subtree at `node.path` with `node` and expand it.
    ///
    /// Used to swap an overview subtree for one built with a wider limit, or
    /// to fill in a node whose children were never built.
    pub fn graft(&mut self, node: Node) -> bool {
        let path = node.path.clone();
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let Some(slot) = find_mut(root, &path) else {
            return false;
        };
        let label = std::mem::take(&mut slot.label);
        *slot = Node { label, ..node };
        self.expanded_paths.insert(path);
        self.rebuild_visible_items();
        true
    }

    /// Go to the first item.
    pub fn goto_first(&mut self) {
        self.cursor = 0;
    }

    /// Go to the last visible item.
    pub fn goto_last(&mut self) {
        if !self.items.is_empty() {
            self.cursor = self.items.len() - 1;
        }
    }

    /// Get all currently visible items in the tree.
    pub fn visible_items(&self) -> &[TreeItem] {
        &self.items
    }

    /// Get the current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Get the current node.
    pub fn current_node(&self) -> Option<&Node> {
        self.items.get(self.cursor).map(|item| &item.node)
    }

    /// Move the cursor to a node with the given path.
    pub fn goto_node(&mut self, target: &Path) -> bool {
        match self
            .items
            .iter()
            .position(|item| &item.node.path == target && !item.node.is_placeholder())
        {
            Some(i) => {
                self.cursor = i;
                self.preview_scroll = 0;
                true
            },
            None => false,
        }
    }

    /// Expand all nodes in the tree.
    pub fn expand_all(&mut self) {
        if let Some(root) = &self.root {
            Self::collect_expandable_paths(root, &mut self.expanded_paths);
        }
        self.rebuild_visible_items();
    }

    fn collect_expandable_paths(node: &Node, paths: &mut HashSet<Path>) {
        if node.is_expandable() {
            paths.insert(node.path.clone());
        }
        for child in &node.children {
            Self::collect_expandable_paths(child, paths);
        }
    }

    /// Toggle preview panel.
    pub fn toggle_preview(&mut self) {
        self.show_preview = !self.show_preview;
    }

    /// Scroll preview down.
    pub fn scroll_down(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_add(5);
    }

    /// Scroll preview up.
    pub fn scroll_up(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_sub(5);
    }
}

impl Default for ExplorerState {
    fn default() -> Self {
        Self::new()
    }
}

fn find_mut<'a>(node: &'a mut Node, path: &Path) -> Option<&'a mut Node> {
    if &node.path == path && !node.is_placeholder() {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| find_mut(child, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn sample() -> Value {
        Value::map_from([
            ("a", Value::list((0..25).map(Value::Int).collect())),
            ("b", Value::map_from([("c", Value::Int(1))])),
        ])
    }

    fn explorer() -> ExplorerState {
        let mut explorer = ExplorerState::new();
        explorer.build_from_root(TreeBuilder::default().build(&sample(), WidthTier::Overview));
        explorer
    }

    #[test]
    fn only_root_starts_expanded() {
        let explorer = explorer();
        let labels: Vec<_> = explorer
            .visible_items()
            .iter()
            .map(|item| item.node.label.as_str())
            .collect();
        assert_eq!(labels, ["root", "a", "b"]);
        assert!(explorer.visible_items()[0].expanded);
    }

    #[test]
    fn expand_and_collapse() {
        let mut explorer = explorer();
        explorer.cursor_down();
        assert!(explorer.expand_current());
        assert_eq!(explorer.visible_items().len(), 3 + 11);

        explorer.cursor_down();
        assert_eq!(explorer.current_node().unwrap().label, "[0]");
        assert!(!explorer.expand_current());

        explorer.collapse_current();
        assert_eq!(explorer.current_node().unwrap().label, "a");
        explorer.collapse_current();
        assert_eq!(explorer.visible_items().len(), 3);
    }

    #[test]
    fn graft_replaces_subtree_with_wider_one() {
        let mut explorer = explorer();
        let mut wide = TreeBuilder::default()
            .build_with_width(&Value::list((0..25).map(Value::Int).collect()), 100);
        wide.path = Path::root().key("a");
        for (i, child) in wide.children.iter_mut().enumerate() {
            child.path = Path::root().key("a").index(&[i]);
        }

        assert!(explorer.graft(wide));
        assert_eq!(explorer.visible_items().len(), 3 + 25);
        assert_eq!(explorer.visible_items()[1].node.label, "a");
    }

    #[test]
    fn goto_node_after_expand_all() {
        let mut explorer = explorer();
        let target = Path::root().key("b").key("c");
        assert!(!explorer.goto_node(&target));
        explorer.expand_all();
        assert!(explorer.goto_node(&target));
        assert_eq!(explorer.current_node().unwrap().label, "c");
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut explorer = explorer();
        explorer.expand_all();
        for _ in 0..10 {
            explorer.cursor_down();
        }
        explorer.adjust_scroll(4);
        assert_eq!(explorer.scroll_offset(), 7);
        explorer.goto_first();
        explorer.adjust_scroll(4);
        assert_eq!(explorer.scroll_offset(), 0);
    }
}
