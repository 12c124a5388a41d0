//! Details pane formatting for selected values.

use crate::data::{DecodedDocument, MetaValue, ShapeKind};
use crate::navigation::NodeDetail;
use crate::render::Statistics;
use crate::ui::ThemeColors;
use crate::util::formatters::{format_bytes, format_number, format_stat_value};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Format a selection for display in the details pane.
///
/// The document's metadata is listed when the selection is the root.
pub fn format_node_details(
    detail: &NodeDetail,
    document: Option<&DecodedDocument>,
    colors: &ThemeColors,
) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            detail.label.clone(),
            Style::default()
                .fg(colors.for_kind(detail.kind))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "─".repeat(50),
            Style::default().fg(colors.border),
        )),
        Line::from(""),
        field("Path", detail.path.to_string(), colors),
        field("Kind", detail.kind.name().to_string(), colors),
        field("Type", detail.type_name.clone(), colors),
    ];

    if !detail.size.is_empty() {
        lines.push(field("Size", detail.size.clone(), colors));
    }
    if let Some(count) = detail.child_count {
        lines.push(field("Children", format_number(count), colors));
    }
    if !detail.description.is_empty() {
        lines.push(field("Description", detail.description.clone(), colors));
    }
    if let Some(error) = &detail.error {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(colors.label)),
            Span::styled(error.clone(), Style::default().fg(colors.error)),
        ]));
    }
    lines.push(Line::from(""));

    if let Some(stats) = &detail.statistics {
        push_statistics(&mut lines, stats, colors);
    }

    if let Some(document) = document.filter(|_| detail.path.is_root()) {
        push_metadata(&mut lines, document, colors);
    }

    lines
}

fn field(label: &str, value: String, colors: &ThemeColors) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(colors.label)),
        Span::styled(value, Style::default().fg(colors.value)),
    ])
}

fn heading(text: String, colors: &ThemeColors) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default()
            .fg(colors.heading)
            .add_modifier(Modifier::BOLD),
    ))
}

fn push_statistics(lines: &mut Vec<Line<'static>>, stats: &Statistics, colors: &ThemeColors) {
    lines.push(heading("Statistics".to_string(), colors));
    let accent = colors.for_kind(ShapeKind::NDArray);
    let rows = [
        ("Min", stats.min),
        ("Max", stats.max),
        ("Mean", stats.mean),
        ("Std Dev", stats.std),
        ("Variance", stats.variance),
        ("25%", stats.p25),
        ("Median", stats.median),
        ("75%", stats.p75),
    ];
    for (label, value) in rows {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", label), Style::default().fg(colors.label)),
            Span::styled(format_stat_value(value), Style::default().fg(accent)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("  Finite: ", Style::default().fg(colors.label)),
        Span::styled(format_number(stats.count), Style::default().fg(accent)),
    ]));
    lines.push(Line::from(""));
}

fn push_metadata(lines: &mut Vec<Line<'static>>, document: &DecodedDocument, colors: &ThemeColors) {
    if document.metadata.is_empty() {
        return;
    }
    lines.push(heading(
        format!("File Info ({})", document.metadata.len()),
        colors,
    ));
    for (key, value) in document.metadata.iter() {
        let text = match (key, value) {
            ("file_size", MetaValue::Int(bytes)) => format_bytes(u64::try_from(*bytes).unwrap_or(0)),
            (_, MetaValue::Float(v)) => format_stat_value(*v),
            _ => value.to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", key), Style::default().fg(colors.label)),
            Span::styled(text, Style::default().fg(colors.value)),
        ]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Theme;
    use crate::data::{Metadata, NdArray, Path, Value};
    use crate::navigation::Navigator;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn root_lists_metadata_and_arrays_list_statistics() {
        let value = Value::map_from([(
            "xs",
            Value::Array(NdArray::from_f64(&[4], vec![1.0, 2.0, 3.0, 4.0]).unwrap()),
        )]);
        let metadata = Metadata::new()
            .with("file_size", 2048usize)
            .with("file_format", "JSON file");
        let document = Arc::new(DecodedDocument::new(PathBuf::from("a.json"), value, metadata));
        let mut navigator = Navigator::default();
        navigator.set_document(Arc::clone(&document));
        let colors = ThemeColors::from_theme(&Theme::GruvboxDark);

        let root = navigator.select(&Path::root()).unwrap();
        let root_text = text(&format_node_details(&root, Some(&document), &colors));
        assert!(root_text.contains("file_size: 2.0 KB"));
        assert!(root_text.contains("file_format: JSON file"));
        assert!(!root_text.contains("Statistics"));

        let xs = navigator.select(&Path::root().key("xs")).unwrap();
        let xs_text = text(&format_node_details(&xs, Some(&document), &colors));
        assert!(xs_text.contains("Mean: 2.5000"));
        assert!(xs_text.contains("Path: root.xs"));
        assert!(!xs_text.contains("file_size"));
    }
}
