//! Text and raw modes.

use super::RenderError;
use crate::data::shape::scalar_literal;
use crate::data::{unravel, NdArray, ShapeDisplay, Value};
use crate::util::limits::{RenderLimits, TreeLimits};

const TRUNCATED: &str = "\n... (truncated for performance)";
/// Nesting below this depth is elided in literal output.
const MAX_NESTING: usize = 64;

/// Output buffer that stops accepting text at a fixed length.
pub(super) struct Budget {
    out: String,
    limit: usize,
    cut: bool,
}

impl Budget {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            out: String::new(),
            limit,
            cut: false,
        }
    }

    pub(super) fn push(&mut self, s: &str) {
        if self.cut {
            return;
        }
        let room = self.limit.saturating_sub(self.out.len());
        if s.len() <= room {
            self.out.push_str(s);
            return;
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.out.push_str(&s[..end]);
        self.cut = true;
    }

    pub(super) fn is_cut(&self) -> bool {
        self.cut
    }

    /// Text so far, with `suffix` appended when it was cut.
    pub(super) fn finish_with(self, suffix: &str) -> String {
        let mut out = self.out;
        if self.cut {
            out.push_str(suffix);
        }
        out
    }
}

/// Per-axis element counts of the preview window, or `None` if the array is shown in full.
pub(super) fn preview_window(shape: &[usize], limits: &RenderLimits) -> Option<Vec<usize>> {
    let total: usize = shape.iter().product();
    if total <= limits.preview_threshold {
        return None;
    }
    Some(match shape {
        [len] => vec![(*len).min(limits.preview_len)],
        [rows, cols] => vec![(*rows).min(limits.preview_edge), (*cols).min(limits.preview_edge)],
        dims => dims.iter().map(|&d| d.min(limits.corner_edge)).collect(),
    })
}

fn window_label(window: &[usize]) -> String {
    let dims = window
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("x");
    if window.len() > 2 {
        format!("corner {}", dims)
    } else {
        format!("first {}", dims)
    }
}

fn omitted_notice(shown: usize, total: usize, noun: &str) -> String {
    format!(
        "... (showing first {} of {} {}, {} omitted)",
        shown,
        total,
        noun,
        total - shown
    )
}

/// Text mode: readable text, large values previewed.
pub(super) fn render_text(
    value: &Value,
    limits: &RenderLimits,
    widths: &TreeLimits,
) -> Result<String, RenderError> {
    match value {
        Value::Array(arr) if arr.ndim() > 0 => array_text(arr, limits),
        Value::Map(map) => Ok(entries_text(
            None,
            map.iter(),
            map.len(),
            "keys",
            limits,
            widths,
        )),
        Value::Object(obj) => Ok(entries_text(
            Some(obj.type_name()),
            obj.fields().iter(),
            obj.fields().len(),
            "fields",
            limits,
            widths,
        )),
        Value::List(items) if items.len() > limits.preview_threshold => {
            let shown = widths.overview_width.min(items.len());
            let mut budget = Budget::new(limits.max_chars);
            write_items(&items[..shown], true, &mut budget, limits, widths, 0);
            Ok(format!(
                "{}\n{}",
                budget.finish_with(" ..."),
                omitted_notice(shown, items.len(), "items")
            ))
        },
        Value::Str(s) => {
            let mut budget = Budget::new(limits.max_chars);
            budget.push(s);
            Ok(budget.finish_with(TRUNCATED))
        },
        _ => {
            let mut budget = Budget::new(limits.max_chars);
            write_repr(value, &mut budget, limits, widths, 0);
            Ok(budget.finish_with(TRUNCATED))
        },
    }
}

fn array_text(arr: &NdArray, limits: &RenderLimits) -> Result<String, RenderError> {
    let shape = arr.shape();
    let mut budget = Budget::new(limits.max_chars);

    let Some(window) = preview_window(shape, limits) else {
        write_nested(arr, shape, &mut Vec::new(), &mut budget, " ", "")?;
        return Ok(budget.finish_with(TRUNCATED));
    };

    let shown: usize = window.iter().product();
    let total = arr.len();
    write_nested(arr, &window, &mut Vec::new(), &mut budget, " ", "")?;
    Ok(format!(
        "Array shape {}:\n{}\n... (showing {} of {} elements, {} omitted)",
        ShapeDisplay(shape),
        budget.finish_with(" ..."),
        window_label(&window),
        total,
        total - shown
    ))
}

fn entries_text<'a>(
    header: Option<&str>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    len: usize,
    noun: &str,
    limits: &RenderLimits,
    widths: &TreeLimits,
) -> String {
    let shown = if len > limits.preview_threshold {
        widths.overview_width.min(len)
    } else {
        len
    };

    let mut budget = Budget::new(limits.max_chars);
    if let Some(header) = header {
        budget.push(header);
        budget.push("\n");
    }
    for (i, (key, item)) in entries.take(shown).enumerate() {
        if budget.is_cut() {
            break;
        }
        if i > 0 {
            budget.push("\n");
        }
        budget.push(key);
        budget.push(": ");
        budget.push(&inline_value(item, limits, widths));
    }

    let mut out = budget.finish_with(TRUNCATED);
    if shown < len {
        out.push('\n');
        out.push_str(&omitted_notice(shown, len, noun));
    }
    out
}

/// One value on one line: its text, cut at `value_chars` with a trailing `...`.
pub(super) fn inline_value(value: &Value, limits: &RenderLimits, widths: &TreeLimits) -> String {
    let mut budget = Budget::new(limits.value_chars);
    match value {
        Value::Str(s) => budget.push(s),
        _ => write_repr(value, &mut budget, limits, widths, 0),
    }
    budget.finish_with("...")
}

/// Raw mode: the literal representation.
pub(super) fn render_raw(
    value: &Value,
    limits: &RenderLimits,
    widths: &TreeLimits,
) -> Result<String, RenderError> {
    if let Value::Array(arr) = value {
        if arr.len() > limits.preview_threshold {
            return large_array_raw(arr, limits);
        }
    }

    let mut budget = Budget::new(limits.max_chars);
    write_repr(value, &mut budget, limits, widths, 0);
    let mut out = budget.finish_with(TRUNCATED);

    let count = match value {
        Value::List(items) => Some((items.len(), "items")),
        Value::Map(map) => Some((map.len(), "keys")),
        _ => None,
    };
    if let Some((len, noun)) = count {
        if len > limits.preview_threshold {
            out.push('\n');
            out.push_str(&omitted_notice(widths.overview_width.min(len), len, noun));
        }
    }
    Ok(out)
}

fn large_array_raw(arr: &NdArray, limits: &RenderLimits) -> Result<String, RenderError> {
    let shape = arr.shape();
    let total = arr.len();
    let shown = limits.preview_len.min(total);

    let mut budget = Budget::new(limits.max_chars);
    budget.push("[");
    for flat in 0..shown {
        if flat > 0 {
            budget.push(" ");
        }
        let index = unravel(flat, shape);
        let text = arr
            .format_at(&index)
            .ok_or(RenderError::Element { index })?;
        budget.push(&text);
    }
    budget.push("]");

    Ok(format!(
        "Large array {}:\nFirst {} elements: {}\n... (truncated for performance, {} elements omitted)",
        ShapeDisplay(shape),
        shown,
        budget.finish_with(" ..."),
        total - shown
    ))
}

/// Nested bracket text of the `window` corner of `arr`.
///
/// `sep` goes between elements; `row_sep` is put before the line break
/// between sub-blocks.
pub(super) fn write_nested(
    arr: &NdArray,
    window: &[usize],
    index: &mut Vec<usize>,
    budget: &mut Budget,
    sep: &str,
    row_sep: &str,
) -> Result<(), RenderError> {
    let axis = index.len();
    if axis == window.len() {
        let text = arr.format_at(index).ok_or_else(|| RenderError::Element {
            index: index.clone(),
        })?;
        budget.push(&text);
        return Ok(());
    }

    budget.push("[");
    for i in 0..window[axis] {
        if budget.is_cut() {
            return Ok(());
        }
        if i > 0 {
            if axis + 1 == window.len() {
                budget.push(sep);
            } else {
                budget.push(row_sep);
                budget.push(&"\n".repeat(window.len() - axis - 1));
                budget.push(&" ".repeat(axis + 1));
            }
        }
        index.push(i);
        write_nested(arr, window, index, budget, sep, row_sep)?;
        index.pop();
    }
    budget.push("]");
    Ok(())
}

/// Literal representation, bounded by the budget.
pub(super) fn write_repr(
    value: &Value,
    budget: &mut Budget,
    limits: &RenderLimits,
    widths: &TreeLimits,
    depth: usize,
) {
    if budget.is_cut() {
        return;
    }
    if depth >= MAX_NESTING {
        budget.push("...");
        return;
    }

    match value {
        Value::Str(s) => write_quoted(s, budget),
        Value::List(items) => {
            let truncated = items.len() > limits.preview_threshold;
            let shown = if truncated {
                widths.overview_width.min(items.len())
            } else {
                items.len()
            };
            write_items(&items[..shown], truncated, budget, limits, widths, depth);
        },
        Value::Map(map) => {
            let truncated = map.len() > limits.preview_threshold;
            let shown = if truncated {
                widths.overview_width.min(map.len())
            } else {
                map.len()
            };
            budget.push("{");
            for (i, (key, item)) in map.iter().take(shown).enumerate() {
                if budget.is_cut() {
                    return;
                }
                if i > 0 {
                    budget.push(", ");
                }
                write_quoted(key, budget);
                budget.push(": ");
                write_repr(item, budget, limits, widths, depth + 1);
            }
            if truncated {
                budget.push(", ...");
            }
            budget.push("}");
        },
        Value::Object(obj) => {
            budget.push(obj.type_name());
            budget.push("(");
            for (i, (name, item)) in obj.fields().iter().enumerate() {
                if budget.is_cut() {
                    return;
                }
                if i > 0 {
                    budget.push(", ");
                }
                budget.push(name);
                budget.push("=");
                write_repr(item, budget, limits, widths, depth + 1);
            }
            budget.push(")");
        },
        Value::Array(arr) if arr.ndim() > 0 => {
            if arr.len() > limits.preview_threshold {
                budget.push(&format!(
                    "array(shape={}, dtype={})",
                    ShapeDisplay(arr.shape()),
                    arr.dtype()
                ));
                return;
            }
            budget.push("array(");
            let indent = format!(",{}", " ".repeat("array(".len()));
            // Elements inside the shape were checked by construction; a failure
            // here only shortens the literal.
            if write_nested(arr, arr.shape(), &mut Vec::new(), budget, ", ", &indent).is_err() {
                budget.push("...");
            }
            budget.push(&format!(", dtype={})", arr.dtype()));
        },
        _ => budget.push(&scalar_literal(value)),
    }
}

fn write_items(
    items: &[Value],
    truncated: bool,
    budget: &mut Budget,
    limits: &RenderLimits,
    widths: &TreeLimits,
    depth: usize,
) {
    budget.push("[");
    for (i, item) in items.iter().enumerate() {
        if budget.is_cut() {
            return;
        }
        if i > 0 {
            budget.push(", ");
        }
        write_repr(item, budget, limits, widths, depth + 1);
    }
    if truncated {
        budget.push(", ...");
    }
    budget.push("]");
}

fn write_quoted(s: &str, budget: &mut Budget) {
    budget.push("'");
    for c in s.chars() {
        if budget.is_cut() {
            return;
        }
        match c {
            '\'' => budget.push("\\'"),
            '\\' => budget.push("\\\\"),
            '\n' => budget.push("\\n"),
            '\t' => budget.push("\\t"),
            c => budget.push(c.encode_utf8(&mut [0u8; 4])),
        }
    }
    budget.push("'");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: &Value) -> String {
        render_text(value, &RenderLimits::default(), &TreeLimits::default()).unwrap()
    }

    fn raw(value: &Value) -> String {
        render_raw(value, &RenderLimits::default(), &TreeLimits::default()).unwrap()
    }

    fn range(shape: &[usize]) -> Value {
        let total: usize = shape.iter().product();
        Value::Array(NdArray::from_i64(shape, (0..total as i64).collect()).unwrap())
    }

    #[test]
    fn small_arrays_print_in_full() {
        assert_eq!(render(&range(&[5])), "[0 1 2 3 4]");
        assert_eq!(render(&range(&[2, 3])), "[[0 1 2]\n [3 4 5]]");
        assert_eq!(
            render(&range(&[2, 2, 2])),
            "[[[0 1]\n  [2 3]]\n\n [[4 5]\n  [6 7]]]"
        );
    }

    #[test]
    fn large_array_text_is_bounded() {
        let small = render(&range(&[1_000]));
        let large = render(&range(&[1_000_000]));
        assert!(small.contains("showing first 10 of 1000 elements, 990 omitted"));
        assert!(large.contains("showing first 10 of 1000000 elements, 999990 omitted"));
        assert!(large.starts_with("Array shape (1000000,):\n[0 1 2 3 4 5 6 7 8 9]"));
        assert!(large.len() < small.len() + 16);
    }

    #[test]
    fn two_dimensional_preview_is_a_corner() {
        let text = render(&range(&[20, 30]));
        assert!(text.contains("showing first 10x10 of 600 elements, 500 omitted"));
        assert_eq!(text.lines().nth(1), Some("[[0 1 2 3 4 5 6 7 8 9]"));
    }

    #[test]
    fn higher_dimensions_preview_a_corner_slice() {
        let text = render(&range(&[10, 10, 10]));
        assert!(text.contains("corner 3x3x3 of 1000 elements, 973 omitted"));
    }

    #[test]
    fn mapping_values_are_cut() {
        let value = Value::map_from([
            ("short", Value::Int(3)),
            ("long", Value::from("y".repeat(500))),
        ]);
        let text = render(&value);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "short: 3");
        assert_eq!(lines[1], format!("long: {}...", "y".repeat(100)));
    }

    #[test]
    fn long_sequences_report_omitted_items() {
        let value = Value::list((0..250).map(Value::Int).collect());
        let text = render(&value);
        assert!(text.starts_with("[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ...]"));
        assert!(text.ends_with("showing first 10 of 250 items, 240 omitted)"));

        let short = Value::list((0..3).map(Value::Int).collect());
        assert_eq!(render(&short), "[0, 1, 2]");
    }

    #[test]
    fn long_strings_are_cut_at_max_chars() {
        let text = render(&Value::from("z".repeat(20_000)));
        assert!(text.ends_with(TRUNCATED));
        assert_eq!(text.len(), 10_000 + TRUNCATED.len());
    }

    #[test]
    fn raw_literals() {
        let value = Value::map_from([
            ("name", Value::from("it's")),
            ("ok", Value::Bool(true)),
            ("none", Value::Null),
            ("xs", range(&[3])),
        ]);
        assert_eq!(
            raw(&value),
            "{'name': 'it\\'s', 'ok': True, 'none': None, 'xs': array([0, 1, 2], dtype=int64)}"
        );
    }

    #[test]
    fn raw_large_array_shows_first_elements() {
        let text = raw(&range(&[50, 50]));
        assert_eq!(
            text,
            "Large array (50, 50):\nFirst 10 elements: [0 1 2 3 4 5 6 7 8 9]\n\
             ... (truncated for performance, 2490 elements omitted)"
        );
    }
}
