//! The navigator: the engine's pull-based API for a presentation layer.
//!
//! It owns the current document, its overview tree, the navigation stack and
//! the render cache. Callers decide when to select, render, push or pop; the
//! navigator never calls back.

use super::click::ClickTracker;
use super::stack::{Frame, NavigationStack};
use crate::data::shape::child_count;
use crate::data::{resolve, DecodedDocument, Path, ShapeKind, Value};
use crate::error::PathError;
use crate::explorer::{Node, TreeBuilder, WidthTier};
use crate::loader::SUMMARY_MAX_ELEMENTS;
use crate::render::{DisplayMode, RenderCache, Rendered, Renderer, Statistics};
use crate::util::limits::EngineConfig;
use std::sync::Arc;
use std::time::Instant;

/// Everything the details pane shows about one selected value.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDetail {
    /// Address of the value.
    pub path: Path,
    /// Label (last path segment, or `root`).
    pub label: String,
    /// Shape kind.
    pub kind: ShapeKind,
    /// Value type name.
    pub type_name: String,
    /// Size summary.
    pub size: String,
    /// Short description.
    pub description: String,
    /// Error raised while describing the value.
    pub error: Option<String>,
    /// Number of direct children, for values with a length.
    pub child_count: Option<usize>,
    /// Numeric statistics, for numeric arrays of bounded size.
    pub statistics: Option<Statistics>,
}

/// Result of selecting a table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellAction {
    /// The cell was selected; here is what it holds.
    Selected(NodeDetail),
    /// A double select on a navigable cell pushed a frame at this path.
    Pushed(Path),
}

/// Engine state behind the display boundary.
#[derive(Debug)]
pub struct Navigator {
    config: EngineConfig,
    builder: TreeBuilder,
    renderer: Renderer,
    document: Option<Arc<DecodedDocument>>,
    tree: Option<Node>,
    stack: Option<NavigationStack>,
    cache: RenderCache,
    clicks: ClickTracker,
}

impl Navigator {
    /// Create a navigator with no document.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            builder: TreeBuilder::new(config.tree.clone()),
            renderer: Renderer::new(config.render.clone(), config.tree.clone()),
            cache: RenderCache::new(config.render.cache_errors),
            clicks: ClickTracker::new(config.navigation.double_select_window),
            document: None,
            tree: None,
            stack: None,
            config,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the document. The overview tree is rebuilt and navigation starts over at the root.
    pub fn set_document(&mut self, document: Arc<DecodedDocument>) -> &Node {
        tracing::info!("Showing {}", document.file_path.display());
        let tree = self.builder.build(&document.value, WidthTier::Overview);
        self.stack = Some(NavigationStack::new(document.value.clone()));
        self.document = Some(document);
        self.cache.clear();
        self.clicks.reset();
        self.tree.insert(tree)
    }

    /// The loaded document.
    pub fn document(&self) -> Option<&Arc<DecodedDocument>> {
        self.document.as_ref()
    }

    /// Overview tree of the loaded document.
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    /// The frame being shown.
    pub fn current(&self) -> Option<&Frame> {
        self.stack.as_ref().map(NavigationStack::current)
    }

    /// Frames pushed above the root.
    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, NavigationStack::depth)
    }

    /// Paths from the root to the current frame.
    pub fn breadcrumbs(&self) -> Vec<Path> {
        self.stack
            .as_ref()
            .map(|stack| stack.breadcrumbs().cloned().collect())
            .unwrap_or_default()
    }

    /// Render cache of the current frame.
    pub fn render_cache(&self) -> &RenderCache {
        &self.cache
    }

    fn resolve(&self, path: &Path) -> Result<Value, PathError> {
        let document = self.document.as_ref().ok_or(PathError::NoDocument)?;
        resolve(&document.value, path, self.config.navigation.max_path_depth)
    }

    /// Describe the value at `path`. Frame and cache are left alone.
    pub fn select(&self, path: &Path) -> Result<NodeDetail, PathError> {
        let value = self.resolve(path).map_err(|e| {
            tracing::debug!("Selection of {} failed: {}", path, e);
            e
        })?;
        let node = self.builder.describe(path.label(), &value, path.clone());
        Ok(NodeDetail {
            path: node.path,
            label: node.label,
            kind: node.kind,
            type_name: node.type_name,
            size: node.size,
            description: node.description,
            error: node.error,
            child_count: child_count(&value),
            statistics: value
                .as_array()
                .and_then(|arr| Statistics::compute(arr, SUMMARY_MAX_ELEMENTS)),
        })
    }

    /// Drill into the value at `path`. Returns `false` for the root, which is never pushed twice.
    ///
    /// On failure nothing changes.
    pub fn push(&mut self, path: &Path) -> Result<bool, PathError> {
        let value = self.resolve(path)?;
        let stack = self.stack.as_mut().ok_or(PathError::NoDocument)?;
        if !stack.push(value, path.clone()) {
            return Ok(false);
        }
        tracing::debug!("Pushed {} (depth {})", path, stack.depth());
        self.cache.clear();
        self.clicks.reset();
        Ok(true)
    }

    /// Return to the previous frame. At the root nothing happens.
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.stack.as_mut()?.pop()?;
        tracing::debug!("Popped {}", frame.path);
        self.cache.clear();
        self.clicks.reset();
        Some(frame)
    }

    /// Render the current frame. Repeated calls for the same frame and mode are cached.
    pub fn render(&mut self, mode: DisplayMode) -> Arc<Rendered> {
        let Some(frame) = self.stack.as_ref().map(NavigationStack::current) else {
            return Arc::new(Rendered::Text("No document loaded".to_string()));
        };
        self.cache
            .get_or_render(&self.renderer, &frame.value, &frame.path, mode)
    }

    /// Select the table cell at `(row, col)` of the current frame.
    ///
    /// A second select of the same cell within the double-select window
    /// pushes the cell's value when it is navigable.
    pub fn select_cell(&mut self, row: usize, col: usize, now: Instant) -> Result<CellAction, PathError> {
        let rendered = self.render(DisplayMode::Table);
        let cell = rendered
            .as_grid()
            .and_then(|grid| grid.cell(row, col))
            .ok_or(PathError::NoCell { row, col })?;

        let double = self.clicks.register(row, col, now);
        if double && cell.is_navigable() {
            let path = cell.child_path.clone();
            self.push(&path)?;
            return Ok(CellAction::Pushed(path));
        }
        self.select(&cell.child_path).map(CellAction::Selected)
    }

    /// Tree for the value at `path`, built with the table width.
    pub fn expand(&self, path: &Path) -> Result<Node, PathError> {
        let value = self.resolve(path)?;
        let mut node = self.builder.build(&value, WidthTier::Table);
        rebase(&mut node, path);
        node.label = path.label();
        Ok(node)
    }
}

/// Prefix every path in `node` with `base`.
fn rebase(node: &mut Node, base: &Path) {
    let mut segments = base.segments().to_vec();
    segments.extend_from_slice(node.path.segments());
    node.path = Path::from_segments(segments);
    for child in &mut node.children {
        rebase(child, base);
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Metadata, NdArray};
    use std::path::PathBuf;
    use std::time::Duration;

    fn navigator(value: Value) -> Navigator {
        let mut nav = Navigator::default();
        nav.set_document(Arc::new(DecodedDocument::new(
            PathBuf::from("test.json"),
            value,
            Metadata::new(),
        )));
        nav
    }

    fn cube() -> Value {
        Value::Array(NdArray::from_i64(&[5, 5, 5], (0..125).collect()).unwrap())
    }

    #[test]
    fn double_select_drills_into_sub_array() {
        let mut nav = navigator(cube());
        let t0 = Instant::now();

        let first = nav.select_cell(2, 3, t0).unwrap();
        assert!(matches!(first, CellAction::Selected(ref d) if d.kind == ShapeKind::NDArray));
        assert_eq!(nav.depth(), 0);

        let second = nav.select_cell(2, 3, t0 + Duration::from_millis(100)).unwrap();
        let CellAction::Pushed(path) = second else {
            panic!("expected a push");
        };
        assert_eq!(path.to_string(), "root[2,3]");
        assert_eq!(nav.current().unwrap().path, path);

        let text = nav.render(DisplayMode::Text).to_text();
        assert_eq!(text, "[65 66 67 68 69]");
    }

    #[test]
    fn slow_second_select_only_selects() {
        let mut nav = navigator(cube());
        let t0 = Instant::now();
        nav.select_cell(0, 0, t0).unwrap();
        let again = nav.select_cell(0, 0, t0 + Duration::from_millis(900)).unwrap();
        assert!(matches!(again, CellAction::Selected(_)));
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn terminal_cells_never_push() {
        let mut nav = navigator(Value::map_from([("x", Value::Int(1))]));
        let t0 = Instant::now();
        nav.select_cell(0, 0, t0).unwrap();
        let again = nav.select_cell(0, 0, t0).unwrap();
        assert!(matches!(again, CellAction::Selected(ref d) if d.path.to_string() == "root.x"));
    }

    #[test]
    fn failed_selection_changes_nothing() {
        let mut nav = navigator(Value::map_from([("a", Value::list(vec![Value::Int(1)]))]));
        nav.render(DisplayMode::Text);
        let before = nav.render_cache().recomputations();

        let missing = Path::root().key("nope");
        assert_eq!(
            nav.select(&missing),
            Err(PathError::MissingKey { key: "nope".into() })
        );
        assert!(nav.push(&missing).is_err());
        assert_eq!(nav.depth(), 0);

        nav.render(DisplayMode::Text);
        assert_eq!(nav.render_cache().recomputations(), before);
    }

    #[test]
    fn push_and_pop_clear_the_cache() {
        let mut nav = navigator(Value::map_from([("a", Value::list(vec![Value::Int(1)]))]));
        nav.render(DisplayMode::Text);
        nav.render(DisplayMode::Text);
        assert_eq!(nav.render_cache().recomputations(), 1);

        assert!(nav.push(&Path::root().key("a")).unwrap());
        assert!(nav.render_cache().is_empty());
        assert_eq!(nav.render(DisplayMode::Text).to_text(), "[1]");

        assert!(nav.pop().is_some());
        assert!(nav.render_cache().is_empty());
        assert!(nav.pop().is_none());
        assert!(!nav.push(&Path::root()).unwrap());
    }

    #[test]
    fn select_reports_statistics_for_arrays() {
        let nav = navigator(Value::map_from([(
            "xs",
            Value::Array(NdArray::from_f64(&[4], vec![1.0, 2.0, 3.0, 4.0]).unwrap()),
        )]));
        let detail = nav.select(&Path::root().key("xs")).unwrap();
        assert_eq!(detail.size, "(4,)");
        assert_eq!(detail.child_count, Some(4));
        assert_eq!(detail.statistics.unwrap().mean, 2.5);
    }

    #[test]
    fn no_document() {
        let mut nav = Navigator::default();
        assert_eq!(nav.select(&Path::root()), Err(PathError::NoDocument));
        assert_eq!(nav.render(DisplayMode::Table).to_text(), "No document loaded");
        assert!(nav.pop().is_none());
    }

    #[test]
    fn expand_uses_table_width_and_absolute_paths() {
        let nav = navigator(Value::map_from([(
            "xs",
            Value::list((0..250).map(Value::Int).collect()),
        )]));
        let overview = nav.tree().unwrap();
        assert_eq!(overview.children[0].children.len(), 11);

        let expanded = nav.expand(&Path::root().key("xs")).unwrap();
        assert_eq!(expanded.label, "xs");
        assert_eq!(expanded.children.len(), 101);
        assert_eq!(expanded.children[5].path.to_string(), "root.xs[5]");
    }
}
