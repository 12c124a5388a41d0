//! Tree panel UI rendering.

use super::ExplorerState;
use crate::ui::ThemeColors;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Draw the tree panel UI.
pub fn draw_tree(
    f: &mut Frame<'_>,
    explorer: &mut ExplorerState,
    file_name: Option<&str>,
    focused: bool,
    area: Rect,
    colors: &ThemeColors,
) {
    if explorer.root().is_none() {
        draw_welcome(f, area, colors);
        return;
    }

    // Adjust scroll to keep cursor visible (subtract 2 for borders)
    let viewport_height = area.height.saturating_sub(2) as usize;
    explorer.adjust_scroll(viewport_height);

    let cursor = explorer.cursor();
    let scroll_offset = explorer.scroll_offset();

    let items: Vec<ListItem<'_>> = explorer
        .visible_items()
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(viewport_height)
        .map(|(idx, item)| {
            let indent = "  ".repeat(item.level);
            let expand_icon = match (item.expandable, item.expanded) {
                (true, true) => "▼ ",
                (true, false) => "▶ ",
                _ => "  ",
            };
            let node = &item.node;

            let line = if idx == cursor {
                let text = format!("{}{}{}", indent, expand_icon, node.display_name());
                let style = if focused {
                    Style::default()
                        .fg(colors.cursor_fg)
                        .bg(colors.cursor_bg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().add_modifier(Modifier::REVERSED)
                };
                Line::from(text).style(style)
            } else if node.is_placeholder() {
                Line::from(vec![
                    Span::raw(indent),
                    Span::raw(expand_icon),
                    Span::styled(node.label.clone(), Style::default().fg(colors.warning)),
                ])
            } else {
                let name_color = if node.error.is_some() {
                    colors.error
                } else {
                    colors.for_kind(node.kind)
                };
                let mut spans = vec![
                    Span::raw(indent),
                    Span::raw(expand_icon),
                    Span::styled(
                        node.label.clone(),
                        Style::default()
                            .fg(name_color)
                            .add_modifier(Modifier::BOLD),
                    ),
                ];
                if !node.size.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", node.size),
                        Style::default().fg(colors.muted),
                    ));
                }
                if !node.description.is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", node.description),
                        Style::default().fg(colors.muted),
                    ));
                }
                Line::from(spans)
            };

            ListItem::new(line)
        })
        .collect();

    let title = file_name
        .map(|n| format!(" {} ", n))
        .unwrap_or_else(|| " Deepview ".to_string());

    let border = if focused { colors.heading } else { colors.border };
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg)),
    );

    f.render_widget(list, area);
}

/// Draw the welcome screen.
pub fn draw_welcome(f: &mut Frame<'_>, area: Rect, colors: &ThemeColors) {
    let lines = vec![
        Line::from(Span::styled(
            "Welcome to Deepview!",
            Style::default()
                .fg(colors.heading)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Open a data file to get started"),
        Line::from(""),
        Line::from("Usage: deepview <file>"),
        Line::from(""),
        Line::from("Keyboard shortcuts:"),
        Line::from("  j/k or ↓/↑  - Navigate"),
        Line::from("  h/l or ←/→  - Collapse/Expand"),
        Line::from("  Tab         - Switch pane"),
        Line::from("  m           - Cycle display mode"),
        Line::from("  /           - Search"),
        Line::from("  T           - Cycle theme"),
        Line::from("  q           - Quit"),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Deepview ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border))
                .style(Style::default().bg(colors.bg)),
        )
        .style(Style::default().fg(colors.text));

    f.render_widget(paragraph, area);
}
