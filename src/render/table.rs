//! Table mode.

use super::text::{inline_value, preview_window};
use super::{Cell, CellKind, Grid, RenderError};
use crate::data::{classify, size_descriptor, NdArray, Path, ShapeDisplay, ShapeKind, Value};
use crate::util::limits::{RenderLimits, TreeLimits};
use indexmap::IndexSet;

pub(super) fn render_table(
    value: &Value,
    path: &Path,
    limits: &RenderLimits,
    widths: &TreeLimits,
) -> Result<Grid, RenderError> {
    match value {
        Value::Array(arr) if arr.ndim() == 1 => array_column(arr, path, limits),
        Value::Array(arr) if arr.ndim() == 2 => array_matrix(arr, path, limits),
        Value::Array(arr) if arr.ndim() > 2 => Ok(array_blocks(arr, path, limits)),
        Value::Map(map) => Ok(entries_grid(map.iter(), map.len(), "keys", path, limits, widths)),
        Value::Object(obj) => Ok(entries_grid(
            obj.fields().iter(),
            obj.fields().len(),
            "fields",
            path,
            limits,
            widths,
        )),
        Value::List(items) => Ok(list_grid(items, path, limits, widths)),
        _ => Ok(Grid {
            columns: vec!["Value".to_string()],
            row_labels: vec!["value".to_string()],
            rows: vec![vec![Cell {
                text: inline_value(value, limits, widths),
                kind: CellKind::Terminal,
                child_path: path.clone(),
            }]],
            notice: None,
        }),
    }
}

fn value_cell(value: &Value, child_path: Path, limits: &RenderLimits, widths: &TreeLimits) -> Cell {
    let kind = classify(value);
    if kind.is_navigable() {
        let size = size_descriptor(value).unwrap_or_default();
        let text = match kind {
            ShapeKind::NDArray => format!("{} {} {}", value.type_name(), size, value_dtype(value)),
            _ => format!("{} {}", value.type_name(), size),
        };
        Cell {
            text,
            kind: CellKind::Navigable,
            child_path,
        }
    } else {
        Cell {
            text: inline_value(value, limits, widths),
            kind: CellKind::Terminal,
            child_path,
        }
    }
}

fn value_dtype(value: &Value) -> &str {
    value.as_array().map(NdArray::dtype).unwrap_or_default()
}

fn element_cell(arr: &NdArray, index: &[usize], path: &Path) -> Result<Cell, RenderError> {
    let text = arr.format_at(index).ok_or_else(|| RenderError::Element {
        index: index.to_vec(),
    })?;
    Ok(Cell {
        text,
        kind: CellKind::Terminal,
        child_path: path.index(index),
    })
}

fn array_column(arr: &NdArray, path: &Path, limits: &RenderLimits) -> Result<Grid, RenderError> {
    let len = arr.shape()[0];
    let shown = preview_window(arr.shape(), limits).map_or(len, |w| w[0]);

    let mut grid = Grid {
        columns: vec!["Value".to_string()],
        ..Grid::default()
    };
    for i in 0..shown {
        grid.row_labels.push(format!("[{}]", i));
        grid.rows.push(vec![element_cell(arr, &[i], path)?]);
    }
    if shown < len {
        grid.notice = Some(format!(
            "Showing {} of {} rows, {} omitted",
            shown,
            len,
            len - shown
        ));
    }
    Ok(grid)
}

fn array_matrix(arr: &NdArray, path: &Path, limits: &RenderLimits) -> Result<Grid, RenderError> {
    let (rows, cols) = (arr.shape()[0], arr.shape()[1]);
    let (shown_rows, shown_cols) =
        preview_window(arr.shape(), limits).map_or((rows, cols), |w| (w[0], w[1]));

    let mut grid = Grid {
        columns: (0..shown_cols).map(|j| format!("Col {}", j)).collect(),
        ..Grid::default()
    };
    for i in 0..shown_rows {
        grid.row_labels.push(format!("[{}]", i));
        let row = (0..shown_cols)
            .map(|j| element_cell(arr, &[i, j], path))
            .collect::<Result<Vec<_>, _>>()?;
        grid.rows.push(row);
    }
    if (shown_rows, shown_cols) != (rows, cols) {
        grid.notice = Some(format!(
            "Showing {}x{} of {}x{}, {} elements omitted",
            shown_rows,
            shown_cols,
            rows,
            cols,
            rows * cols - shown_rows * shown_cols
        ));
    }
    Ok(grid)
}

/// Grid over the first two axes; every cell stands for the sub-array at `[i, j]`.
fn array_blocks(arr: &NdArray, path: &Path, limits: &RenderLimits) -> Grid {
    let (rows, cols) = (arr.shape()[0], arr.shape()[1]);
    let (shown_rows, shown_cols) = if rows * cols > limits.preview_threshold {
        (rows.min(limits.preview_edge), cols.min(limits.preview_edge))
    } else {
        (rows, cols)
    };
    let block = ShapeDisplay(&arr.shape()[2..]).to_string();

    let mut grid = Grid {
        columns: (0..shown_cols).map(|j| format!("Col {}", j)).collect(),
        ..Grid::default()
    };
    for i in 0..shown_rows {
        grid.row_labels.push(format!("[{}]", i));
        let mut row = Vec::with_capacity(shown_cols);
        for j in 0..shown_cols {
            row.push(Cell {
                text: format!("ndarray {} {}", block, arr.dtype()),
                kind: CellKind::Navigable,
                child_path: path.index(&[i, j]),
            });
        }
        grid.rows.push(row);
    }
    if (shown_rows, shown_cols) != (rows, cols) {
        grid.notice = Some(format!(
            "Showing {}x{} of {}x{} sub-arrays of shape {}",
            shown_rows, shown_cols, rows, cols, block
        ));
    }
    grid
}

fn entries_grid<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    len: usize,
    noun: &str,
    path: &Path,
    limits: &RenderLimits,
    widths: &TreeLimits,
) -> Grid {
    let shown = len.min(widths.table_width);
    let mut grid = Grid {
        columns: vec!["Value".to_string()],
        ..Grid::default()
    };
    for (key, item) in entries.take(shown) {
        grid.row_labels.push(key.clone());
        grid.rows
            .push(vec![value_cell(item, path.key(key.as_str()), limits, widths)]);
    }
    if shown < len {
        grid.notice = Some(format!(
            "Showing {} of {} {}, {} omitted",
            shown,
            len,
            noun,
            len - shown
        ));
    }
    grid
}

fn list_grid(items: &[Value], path: &Path, limits: &RenderLimits, widths: &TreeLimits) -> Grid {
    let shown = items.len().min(widths.table_width);
    let records = shown > 0 && items[..shown].iter().all(|item| matches!(item, Value::Map(_)));

    let mut grid = Grid::default();
    if records {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for item in &items[..shown] {
            if let Value::Map(map) = item {
                columns.extend(map.keys().map(String::as_str));
            }
        }
        let columns: Vec<&str> = columns.into_iter().take(widths.table_width).collect();

        for (i, item) in items[..shown].iter().enumerate() {
            let row_path = path.index(&[i]);
            let row = columns
                .iter()
                .map(|&key| match item.as_map().and_then(|map| map.get(key)) {
                    Some(value) => value_cell(value, row_path.key(key), limits, widths),
                    None => Cell {
                        text: String::new(),
                        kind: CellKind::Terminal,
                        child_path: row_path.clone(),
                    },
                })
                .collect();
            grid.row_labels.push(format!("[{}]", i));
            grid.rows.push(row);
        }
        grid.columns = columns.into_iter().map(str::to_string).collect();
    } else {
        grid.columns = vec!["Value".to_string()];
        for (i, item) in items[..shown].iter().enumerate() {
            grid.row_labels.push(format!("[{}]", i));
            grid.rows
                .push(vec![value_cell(item, path.index(&[i]), limits, widths)]);
        }
    }

    if shown < items.len() {
        grid.notice = Some(format!(
            "Showing {} of {} items, {} omitted",
            shown,
            items.len(),
            items.len() - shown
        ));
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(value: &Value) -> Grid {
        render_table(value, &Path::root(), &RenderLimits::default(), &TreeLimits::default()).unwrap()
    }

    fn cube(n: usize) -> Value {
        let total = n * n * n;
        Value::Array(NdArray::from_i64(&[n, n, n], (0..total as i64).collect()).unwrap())
    }

    #[test]
    fn three_dimensional_cells_are_navigable_sub_arrays() {
        let grid = table(&cube(5));
        assert_eq!(grid.row_count(), 5);
        assert_eq!(grid.column_count(), 5);

        let cell = grid.cell(2, 3).unwrap();
        assert!(cell.is_navigable());
        assert_eq!(cell.child_path.to_string(), "root[2,3]");
        assert_eq!(cell.text, "ndarray (5,) int64");
        assert!(grid.notice.is_none());
    }

    #[test]
    fn matrix_cells_are_terminal_elements() {
        let value = Value::Array(NdArray::from_f64(&[2, 2], vec![1.0, 2.5, 3.0, 4.0]).unwrap());
        let grid = table(&value);
        assert_eq!(grid.columns, ["Col 0", "Col 1"]);
        let cell = grid.cell(0, 1).unwrap();
        assert_eq!(cell.text, "2.5");
        assert_eq!(cell.kind, CellKind::Terminal);
        assert_eq!(cell.child_path, Path::root().index(&[0, 1]));
    }

    #[test]
    fn large_matrix_is_windowed() {
        let value = Value::Array(NdArray::from_f64(&[20, 30], vec![0.0; 600]).unwrap());
        let grid = table(&value);
        assert_eq!((grid.row_count(), grid.column_count()), (10, 10));
        assert_eq!(
            grid.notice.as_deref(),
            Some("Showing 10x10 of 20x30, 500 elements omitted")
        );
    }

    #[test]
    fn sequences_use_the_table_width() {
        let value = Value::list((0..250).map(Value::Int).collect());
        let grid = table(&value);
        assert_eq!(grid.row_count(), 100);
        assert_eq!(grid.notice.as_deref(), Some("Showing 100 of 250 items, 150 omitted"));
    }

    #[test]
    fn records_become_columns() {
        let value = Value::list(vec![
            Value::map_from([("id", Value::Int(1)), ("tags", Value::list(vec![Value::from("a")]))]),
            Value::map_from([("id", Value::Int(2)), ("name", Value::from("b"))]),
        ]);
        let grid = table(&value);
        assert_eq!(grid.columns, ["id", "tags", "name"]);

        let tags = grid.cell(0, 1).unwrap();
        assert!(tags.is_navigable());
        assert_eq!(tags.text, "list length: 1");
        assert_eq!(tags.child_path.to_string(), "root[0].tags");

        assert_eq!(grid.cell(1, 1).unwrap().text, "");
        assert_eq!(grid.cell(1, 2).unwrap().text, "b");
    }

    #[test]
    fn mapping_rows_are_keyed() {
        let value = Value::map_from([
            ("n", Value::Int(3)),
            ("grid", Value::Array(NdArray::from_f64(&[2], vec![0.0, 1.0]).unwrap())),
        ]);
        let grid = table(&value);
        assert_eq!(grid.row_labels, ["n", "grid"]);
        assert_eq!(grid.cell(0, 0).unwrap().kind, CellKind::Terminal);
        assert_eq!(grid.cell(1, 0).unwrap().text, "ndarray (2,) float64");
    }
}
