//! Windowed renderer.
//!
//! Turns the value of the current frame into text or a grid of cells. Large
//! arrays and collections are previewed through a bounded window, so the
//! cost of a render never depends on how big the underlying value is.
//!
//! Rendering never fails from the caller's point of view: internal errors
//! become a placeholder that names the problem and the value's kind.

mod cache;
mod stats;
mod table;
mod text;

pub use cache::RenderCache;
pub use stats::Statistics;

use crate::data::{classify, Path, ShapeKind, Value};
use crate::util::limits::{RenderLimits, TreeLimits};
use std::fmt;
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

/// How the current frame is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Readable text with previews of large values.
    Text,
    /// Grid of cells that can be drilled into.
    Table,
    /// Literal representation.
    Raw,
}

impl DisplayMode {
    /// All modes in cycling order.
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Text, DisplayMode::Table, DisplayMode::Raw];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::Text => "text",
            DisplayMode::Table => "table",
            DisplayMode::Raw => "raw",
        }
    }

    /// The next mode in the cycle.
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Text => DisplayMode::Table,
            DisplayMode::Table => DisplayMode::Raw,
            DisplayMode::Raw => DisplayMode::Text,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What selecting a cell leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// The cell holds a mapping, sequence or array and can be drilled into.
    Navigable,
    /// The cell holds a terminal value.
    Terminal,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Display text, already truncated.
    pub text: String,
    /// Whether the cell can be drilled into.
    pub kind: CellKind,
    /// Absolute path of the value behind the cell.
    pub child_path: Path,
}

impl Cell {
    /// Whether a double select on this cell pushes a frame.
    pub fn is_navigable(&self) -> bool {
        self.kind == CellKind::Navigable
    }
}

/// Tabular rendering of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    /// Column headers.
    pub columns: Vec<String>,
    /// Row headers, one per row.
    pub row_labels: Vec<String>,
    /// Cells, row-major.
    pub rows: Vec<Vec<Cell>>,
    /// Truncation notice when rows or columns were left out.
    pub notice: Option<String>,
}

impl Grid {
    /// Cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Number of rows shown.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns shown.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Aligned plain-text layout; navigable cells are marked with `▸`.
    pub fn to_text(&self) -> String {
        let cell_text = |cell: &Cell| match cell.kind {
            CellKind::Navigable => format!("▸ {}", cell.text),
            CellKind::Terminal => cell.text.clone(),
        };

        let label_width = self
            .row_labels
            .iter()
            .map(|l| l.width())
            .max()
            .unwrap_or(0);
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell_text(cell).width());
                }
            }
        }

        let mut out = String::new();
        out.push_str(&pad(&String::new(), label_width));
        for (header, width) in self.columns.iter().zip(&widths) {
            out.push_str(" | ");
            out.push_str(&pad(header, *width));
        }
        out.push('\n');

        for (label, row) in self.row_labels.iter().zip(&self.rows) {
            out.push_str(&pad(label, label_width));
            for (cell, width) in row.iter().zip(&widths) {
                out.push_str(" | ");
                out.push_str(&pad(&cell_text(cell), *width));
            }
            out.push('\n');
        }

        if let Some(notice) = &self.notice {
            out.push_str(notice);
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// A rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Text and raw modes, and every placeholder.
    Text(String),
    /// Table mode.
    Table(Grid),
}

impl Rendered {
    /// Plain text of the rendering.
    pub fn to_text(&self) -> String {
        match self {
            Rendered::Text(text) => text.clone(),
            Rendered::Table(grid) => grid.to_text(),
        }
    }

    /// The grid, in table mode.
    pub fn as_grid(&self) -> Option<&Grid> {
        match self {
            Rendered::Table(grid) => Some(grid),
            Rendered::Text(_) => None,
        }
    }
}

/// Why a value could not be rendered. Recovered into a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The decoder could not provide the value.
    #[error("{reason}")]
    Unavailable {
        /// Why.
        reason: String,
    },
    /// An array element inside the preview window could not be read.
    #[error("array element {index:?} is not readable")]
    Element {
        /// Index relative to the rendered view.
        index: Vec<usize>,
    },
}

/// Renders values under fixed limits.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    limits: RenderLimits,
    widths: TreeLimits,
}

impl Renderer {
    /// Create a renderer. Collection widths follow the tree limits so the
    /// overview and the table agree on how many items they show.
    pub fn new(limits: RenderLimits, widths: TreeLimits) -> Self {
        Self { limits, widths }
    }

    /// Limits in effect.
    pub fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    /// Render `value`, found at `path`, in `mode`. Never fails.
    pub fn render(&self, value: &Value, path: &Path, mode: DisplayMode) -> Rendered {
        self.try_render(value, path, mode)
            .unwrap_or_else(|e| self.placeholder(&e, value))
    }

    /// Render, reporting failures instead of replacing them.
    pub fn try_render(
        &self,
        value: &Value,
        path: &Path,
        mode: DisplayMode,
    ) -> Result<Rendered, RenderError> {
        if let Value::Unavailable { reason, .. } = value {
            return Err(RenderError::Unavailable {
                reason: reason.clone(),
            });
        }
        match mode {
            DisplayMode::Text => text::render_text(value, &self.limits, &self.widths).map(Rendered::Text),
            DisplayMode::Raw => text::render_raw(value, &self.limits, &self.widths).map(Rendered::Text),
            DisplayMode::Table => {
                table::render_table(value, path, &self.limits, &self.widths).map(Rendered::Table)
            },
        }
    }

    /// Placeholder shown in place of a failed rendering.
    pub fn placeholder(&self, error: &RenderError, value: &Value) -> Rendered {
        let kind: ShapeKind = classify(value);
        Rendered::Text(format!(
            "Unable to display data: {}\nData type: {} ({})",
            error,
            value.type_name(),
            kind
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NdArray;

    #[test]
    fn modes_cycle() {
        let mut mode = DisplayMode::Text;
        for expected in [DisplayMode::Table, DisplayMode::Raw, DisplayMode::Text] {
            mode = mode.next();
            assert_eq!(mode, expected);
        }
    }

    #[test]
    fn unavailable_values_become_placeholders() {
        let value = Value::unavailable("char", "character data is not decoded");
        let renderer = Renderer::default();
        for mode in DisplayMode::ALL {
            let rendered = renderer.render(&value, &Path::root(), mode);
            let Rendered::Text(text) = rendered else {
                panic!("placeholder must be text");
            };
            assert!(text.contains("character data is not decoded"));
            assert!(text.contains("char (Scalar)"));
        }
    }

    #[test]
    fn grid_text_marks_navigable_cells() {
        let arr = NdArray::from_i64(&[2, 2, 2], (0..8).collect()).unwrap();
        let rendered = Renderer::default().render(&Value::Array(arr), &Path::root(), DisplayMode::Table);
        let text = rendered.to_text();
        assert!(text.contains("▸ "));
        assert!(text.lines().count() >= 3);
    }
}
