//! Application state and logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::data::{DecodedDocument, Path, ShapeKind};
use crate::explorer::ExplorerState;
use crate::loader::{LoadEvent, LoadWorker, LoaderRegistry, Ticket};
use crate::navigation::{CellAction, Navigator, NodeDetail, SearchState};
use crate::render::{DisplayMode, Rendered};
use crate::util::{self, EngineConfig};

/// Application theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    /// Gruvbox dark theme.
    GruvboxDark,
    /// Gruvbox light theme.
    GruvboxLight,
}

impl Theme {
    /// Get the next theme in the cycle.
    pub fn next(self) -> Self {
        match self {
            Theme::GruvboxDark => Theme::GruvboxLight,
            Theme::GruvboxLight => Theme::GruvboxDark,
        }
    }

    /// Get the theme name.
    pub fn name(self) -> &'static str {
        match self {
            Theme::GruvboxDark => "Gruvbox Dark",
            Theme::GruvboxLight => "Gruvbox Light",
        }
    }
}

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The overview tree.
    Tree,
    /// The current frame's rendering.
    Frame,
}

/// Application state.
#[derive(Debug)]
pub struct App {
    /// Engine state: document, frames, render cache.
    pub navigator: Navigator,
    /// Explorer state (tree navigation + details).
    pub explorer: ExplorerState,
    /// Search state.
    pub search: SearchState,
    /// Details of the last selection.
    pub detail: Option<NodeDetail>,
    /// Display mode of the frame pane.
    pub mode: DisplayMode,
    /// Pane with keyboard focus.
    pub focus: Focus,
    /// Selected `(row, column)` in table mode.
    pub table_cursor: (usize, usize),
    /// Scroll offset of the frame pane in text and raw modes.
    pub frame_scroll: u16,
    /// Status message.
    pub status: String,
    /// Current theme.
    pub theme: Theme,
    /// Loading indicator.
    pub loading: bool,
    /// Error message from the last failed load.
    pub error_message: Option<String>,
    worker: LoadWorker,
    pending: Option<Ticket>,
}

impl App {
    /// Create a new application instance and start its loader thread.
    pub fn new(config: EngineConfig) -> Self {
        let worker = LoadWorker::spawn(LoaderRegistry::new(config.loader.clone()));
        Self {
            navigator: Navigator::new(config),
            explorer: ExplorerState::new(),
            search: SearchState::new(),
            detail: None,
            mode: DisplayMode::Text,
            focus: Focus::Tree,
            table_cursor: (0, 0),
            frame_scroll: 0,
            status: "Ready".to_string(),
            theme: Theme::GruvboxDark,
            loading: false,
            error_message: None,
            worker,
            pending: None,
        }
    }

    /// Ask the worker to load a file. The result arrives through [`App::poll_worker`].
    pub fn load_file(&mut self, path: PathBuf) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        match self.worker.submit(path) {
            Ok(ticket) => {
                self.pending = Some(ticket);
                self.loading = true;
                self.status = format!("Loading {}...", name);
            },
            Err(e) => {
                self.error_message = Some(e.to_string());
                self.status = "Loader unavailable".to_string();
            },
        }
    }

    /// Apply finished loads. Results of superseded requests are dropped.
    ///
    /// Returns `true` when anything changed.
    pub fn poll_worker(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.worker.try_recv() {
            if !self.worker.is_current(event.ticket()) {
                tracing::debug!("Dropping stale load event for ticket {}", event.ticket());
                continue;
            }
            changed = true;
            match event {
                LoadEvent::Started { path, .. } => {
                    self.status = format!("Decoding {}...", path.display());
                },
                LoadEvent::Finished { result, .. } => {
                    self.pending = None;
                    self.loading = false;
                    match result {
                        Ok(document) => self.show_document(document),
                        Err(e) => {
                            tracing::error!("Error loading file: {}", e);
                            self.error_message = Some(format!("Error loading file: {}", e));
                            self.status = format!("{} error: {}", e.category(), e);
                        },
                    }
                },
            }
        }
        changed
    }

    /// Replace the shown document.
    pub fn show_document(&mut self, document: Arc<DecodedDocument>) {
        let name = document.file_name();
        let tree = self.navigator.set_document(document).clone();
        self.explorer.build_from_root(tree);
        self.search.cancel();
        self.table_cursor = (0, 0);
        self.frame_scroll = 0;
        self.error_message = None;
        self.status = format!("{} loaded", name);
        self.select_current();
    }

    /// Whether a load is in flight.
    pub fn pending_load(&self) -> Option<Ticket> {
        self.pending
    }

    /// The loaded document.
    pub fn document(&self) -> Option<&Arc<DecodedDocument>> {
        self.navigator.document()
    }

    /// Refresh the details pane from the tree cursor.
    pub fn select_current(&mut self) {
        let Some(node) = self.explorer.current_node() else {
            self.detail = None;
            return;
        };
        match self.navigator.select(&node.path) {
            Ok(detail) => self.detail = Some(detail),
            Err(e) => self.status = format!("Selection failed: {}", e),
        }
    }

    /// Expand the tree node under the cursor.
    ///
    /// Lists cut at the overview width and values whose children were never
    /// built are rebuilt at the table width and grafted in.
    pub fn expand_current(&mut self) {
        let Some(node) = self.explorer.current_node() else {
            return;
        };
        let path = node.path.clone();
        let placeholder = node.is_placeholder();
        let walkable = node.kind.is_collection() || node.kind == ShapeKind::Opaque;
        let needs_rebuild = placeholder || (walkable && !self.explorer.expand_current());
        if !needs_rebuild {
            return;
        }
        match self.navigator.expand(&path) {
            Ok(subtree) if subtree.is_expandable() => {
                self.explorer.graft(subtree);
                self.explorer.goto_node(&path);
                self.status = format!("Expanded {}", path);
            },
            Ok(_) => {},
            Err(e) => self.status = format!("Cannot expand {}: {}", path, e),
        }
    }

    /// Drill into the value under the tree cursor.
    pub fn push_current(&mut self) {
        let Some(node) = self.explorer.current_node() else {
            return;
        };
        if !node.kind.is_navigable() {
            self.status = format!("{} is not navigable", node.path);
            return;
        }
        let path = node.path.clone();
        self.push(&path);
    }

    fn push(&mut self, path: &Path) {
        match self.navigator.push(path) {
            Ok(true) => {
                self.table_cursor = (0, 0);
                self.frame_scroll = 0;
                self.focus = Focus::Frame;
                self.status = format!("Entered {}", path);
            },
            Ok(false) => self.status = "Already at root".to_string(),
            Err(e) => self.status = format!("Cannot enter {}: {}", path, e),
        }
    }

    /// Return to the previous frame.
    pub fn pop(&mut self) {
        match self.navigator.pop() {
            Some(frame) => {
                self.table_cursor = (0, 0);
                self.frame_scroll = 0;
                self.status = format!("Left {}", frame.path);
                if self.navigator.depth() == 0 {
                    self.focus = Focus::Tree;
                }
            },
            None => self.status = "Already at root".to_string(),
        }
    }

    /// The current frame rendered in the active mode.
    pub fn rendered(&mut self) -> Arc<Rendered> {
        self.navigator.render(self.mode)
    }

    /// Switch to the next display mode.
    pub fn cycle_mode(&mut self) {
        self.mode = self.mode.next();
        self.frame_scroll = 0;
        self.status = format!("Mode: {}", self.mode);
    }

    /// Toggle keyboard focus between tree and frame.
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Frame,
            Focus::Frame => Focus::Tree,
        };
    }

    /// Move the table cursor, clamped to the current grid.
    pub fn move_table_cursor(&mut self, rows: isize, cols: isize) {
        let rendered = self.rendered();
        let Some(grid) = rendered.as_grid() else {
            return;
        };
        let (row, col) = self.table_cursor;
        let clamp = |pos: usize, delta: isize, len: usize| {
            pos.saturating_add_signed(delta).min(len.saturating_sub(1))
        };
        self.table_cursor = (
            clamp(row, rows, grid.row_count()),
            clamp(col, cols, grid.column_count()),
        );
    }

    /// Select the table cell under the cursor. A quick second select drills in.
    pub fn select_cell(&mut self, now: Instant) {
        let (row, col) = self.table_cursor;
        match self.navigator.select_cell(row, col, now) {
            Ok(CellAction::Selected(detail)) => {
                self.status = format!("Selected {}", detail.path);
                self.detail = Some(detail);
            },
            Ok(CellAction::Pushed(path)) => {
                self.table_cursor = (0, 0);
                self.frame_scroll = 0;
                self.status = format!("Entered {}", path);
            },
            Err(e) => self.status = format!("Selection failed: {}", e),
        }
    }

    /// Move the tree cursor to the current search match.
    pub fn goto_search_match(&mut self) {
        if let Some(path) = self.search.current_match_path().cloned() {
            self.explorer.goto_node(&path);
            self.select_current();
        }
    }

    /// Run the submitted search over the tree.
    pub fn run_search(&mut self) {
        self.search.submit();
        let Some(root) = self.explorer.root() else {
            return;
        };
        self.search.perform_search(root);
        self.explorer.expand_all();
        if self.search.match_count() == 0 {
            self.status = format!("No matches for '{}'", self.search.query());
        }
        self.goto_search_match();
    }

    /// Copy the tree to the clipboard.
    pub fn copy_tree(&mut self) {
        let Some(root) = self.explorer.root() else {
            self.status = "No file loaded".to_string();
            return;
        };
        let file_name = self.navigator.document().map(|d| d.file_name());
        self.status = match util::copy_tree_structure(root, file_name.as_deref()) {
            Ok(()) => "Tree copied!".to_string(),
            Err(e) => format!("Copy failed: {}", e),
        };
    }

    /// Copy the selected node's summary to the clipboard.
    pub fn copy_node(&mut self) {
        let Some(node) = self.explorer.current_node() else {
            self.status = "No node selected".to_string();
            return;
        };
        self.status = match util::copy_node_info(node) {
            Ok(()) => format!("Copied {}!", node.label),
            Err(e) => format!("Copy failed: {}", e),
        };
    }

    /// Copy the current frame's rendering to the clipboard.
    pub fn copy_rendered(&mut self) {
        let text = self.rendered().to_text();
        self.status = match util::copy_text(&text) {
            Ok(()) => format!("Copied {} view", self.mode),
            Err(e) => format!("Copy failed: {}", e),
        };
    }

    /// Cycle to the next theme.
    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
        self.status = format!("Theme: {}", self.theme.name());
    }

    /// Toggle preview panel.
    pub fn toggle_preview(&mut self) {
        self.explorer.toggle_preview();
        self.status = if self.explorer.show_preview {
            "Preview: ON".to_string()
        } else {
            "Preview: OFF".to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn wait_for_load(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while app.pending_load().is_some() && Instant::now() < deadline {
            app.poll_worker();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn loads_in_background_and_keeps_document_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(&good, r#"{"a": [1, 2, 3], "b": {"c": "x"}}"#).unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();

        let mut app = App::new(EngineConfig::default());
        app.load_file(good);
        wait_for_load(&mut app);
        assert!(app.error_message.is_none(), "{:?}", app.error_message);
        assert_eq!(app.document().unwrap().file_name(), "good.json");
        assert_eq!(app.detail.as_ref().unwrap().path, Path::root());

        app.load_file(bad);
        wait_for_load(&mut app);
        assert!(app.error_message.is_some());
        assert_eq!(app.document().unwrap().file_name(), "good.json");
    }

    #[test]
    fn superseded_load_is_never_shown() {
        let dir = tempfile::tempdir().unwrap();
        let slow = dir.path().join("slow.json");
        let items: Vec<String> = (0..50_000).map(|i| i.to_string()).collect();
        fs::write(&slow, format!("[{}]", items.join(","))).unwrap();
        let fast = dir.path().join("fast.json");
        fs::write(&fast, r#"{"ok": true}"#).unwrap();

        for finish_first in [true, false] {
            let mut app = App::new(EngineConfig::default());
            app.load_file(slow.clone());
            if finish_first {
                // Started and Finished for the first request are queued but unread.
                let deadline = Instant::now() + Duration::from_secs(10);
                while app.worker.queued_events() < 2 && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(5));
                }
                assert_eq!(app.worker.queued_events(), 2);
            }
            app.load_file(fast.clone());

            let mut shown = Vec::new();
            let deadline = Instant::now() + Duration::from_secs(10);
            while app.pending_load().is_some() && Instant::now() < deadline {
                if app.poll_worker() {
                    shown.extend(app.document().map(|d| d.file_name()));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            std::thread::sleep(Duration::from_millis(50));
            app.poll_worker();

            assert_eq!(app.document().unwrap().file_name(), "fast.json");
            assert!(!shown.iter().any(|name| name == "slow.json"), "{:?}", shown);
            assert!(app.error_message.is_none());
        }
    }

    #[test]
    fn drill_and_return() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested.json");
        fs::write(&file, r#"{"a": [[1, 2], [3, 4]]}"#).unwrap();

        let mut app = App::new(EngineConfig::default());
        app.load_file(file);
        wait_for_load(&mut app);

        app.explorer.cursor_down();
        app.push_current();
        assert_eq!(app.navigator.depth(), 1);
        assert_eq!(app.focus, Focus::Frame);
        assert_eq!(app.rendered().to_text(), "[[1, 2], [3, 4]]");

        app.pop();
        assert_eq!(app.navigator.depth(), 0);
        assert_eq!(app.focus, Focus::Tree);
    }

    #[test]
    fn search_moves_the_tree_cursor() {
        let mut app = App::new(EngineConfig::default());
        let value = crate::data::Value::map_from([
            ("alpha", crate::data::Value::Int(1)),
            ("beta", crate::data::Value::map_from([("gamma", crate::data::Value::Int(2))])),
        ]);
        app.show_document(Arc::new(DecodedDocument::new(
            PathBuf::from("x.json"),
            value,
            Default::default(),
        )));

        app.search.start();
        for c in "gam".chars() {
            app.search.input(c);
        }
        app.run_search();
        assert_eq!(app.search.match_count(), 1);
        assert_eq!(app.explorer.current_node().unwrap().label, "gamma");
        assert_eq!(app.detail.as_ref().unwrap().path.to_string(), "root.beta.gamma");
    }
}
