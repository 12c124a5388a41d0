//! Engine limits and tunables.
//!
//! Every bound that keeps tree building and rendering cheap lives here so
//! callers can override it instead of hard-wiring numbers.

use std::time::Duration;

/// Limits for the lazy tree builder.
#[derive(Debug, Clone)]
pub struct TreeLimits {
    /// Maximum recursion depth below the root.
    pub max_depth: usize,
    /// Children shown per sequence in the compact overview tree.
    pub overview_width: usize,
    /// Children shown per sequence when expanding into the table.
    pub table_width: usize,
    /// Stop recursing into a child whose text size estimate reaches this many characters.
    pub size_threshold: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_depth: 5,
            overview_width: 10,
            table_width: 100,
            size_threshold: 10_000,
        }
    }
}

/// Limits for the windowed renderer.
#[derive(Debug, Clone)]
pub struct RenderLimits {
    /// Arrays with more elements than this are previewed, not printed in full.
    pub preview_threshold: usize,
    /// Elements shown for a 1-D preview.
    pub preview_len: usize,
    /// Rows and columns shown for a 2-D preview.
    pub preview_edge: usize,
    /// Edge length of the corner slice for arrays with three or more dimensions.
    pub corner_edge: usize,
    /// Hard cap on the characters of any rendered text.
    pub max_chars: usize,
    /// Characters kept for one value inside a mapping or table cell.
    pub value_chars: usize,
    /// Keep error placeholders in the render cache (debugging aid).
    pub cache_errors: bool,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            preview_threshold: 100,
            preview_len: 10,
            preview_edge: 10,
            corner_edge: 3,
            max_chars: 10_000,
            value_chars: 100,
            cache_errors: false,
        }
    }
}

/// Navigation behavior.
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    /// Deepest path that resolution will follow.
    pub max_path_depth: usize,
    /// Two selects of the same cell inside this window count as a double select.
    pub double_select_window: Duration,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_path_depth: 64,
            double_select_window: Duration::from_millis(300),
        }
    }
}

/// Loader policy switches.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Decode pickle payloads. Off unless the user opts in.
    pub allow_pickle: bool,
}

/// Combined configuration for the introspection engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Tree builder limits.
    pub tree: TreeLimits,
    /// Renderer limits.
    pub render: RenderLimits,
    /// Navigation settings.
    pub navigation: NavigationConfig,
    /// Loader settings.
    pub loader: LoaderConfig,
}
