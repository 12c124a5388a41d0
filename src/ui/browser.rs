//! Browser UI rendering.

use super::{draw_keymap, draw_status, ThemeColors};
use crate::app::{App, Focus};
use crate::explorer::details::format_node_details;
use crate::explorer::tree::draw_tree;
use crate::data::ShapeKind;
use crate::render::{CellKind, Grid, Rendered};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Widest a table column is drawn.
const MAX_COLUMN_WIDTH: usize = 30;

/// Draw the browser UI.
pub(super) fn draw_browser(f: &mut Frame<'_>, app: &mut App) {
    let colors = ThemeColors::from_theme(&app.theme);

    // Main layout with status bar and key map bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
        .split(f.area());

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    let file_name = app.document().map(|d| d.file_name());
    draw_tree(
        f,
        &mut app.explorer,
        file_name.as_deref(),
        app.focus == Focus::Tree,
        content[0],
        &colors,
    );

    if app.explorer.show_preview {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(content[1]);
        draw_details(f, app, right[0], &colors);
        draw_frame(f, app, right[1], &colors);
    } else {
        draw_frame(f, app, content[1], &colors);
    }

    let status = match &app.error_message {
        Some(error) if !app.loading => error.clone(),
        _ => app.status.clone(),
    };
    draw_status(f, chunks[1], &status, &app.search, &colors);
    draw_keymap(f, chunks[2], app.focus, app.search.is_active(), &colors);
}

fn draw_details(f: &mut Frame<'_>, app: &App, area: Rect, colors: &ThemeColors) {
    let lines = match &app.detail {
        Some(detail) => format_node_details(detail, app.document().map(|d| &**d), colors),
        None => vec![Line::from(Span::styled(
            "Select a node to view details",
            Style::default().fg(colors.text),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border))
                .style(Style::default().bg(colors.bg)),
        )
        .style(Style::default().fg(colors.text))
        .wrap(Wrap { trim: true })
        .scroll((app.explorer.preview_scroll, 0));

    f.render_widget(paragraph, area);
}

fn draw_frame(f: &mut Frame<'_>, app: &mut App, area: Rect, colors: &ThemeColors) {
    let path = app
        .navigator
        .current()
        .map(|frame| frame.path.to_string())
        .unwrap_or_default();
    let title = format!(" {} · {} ", path, app.mode);
    let border = if app.focus == Focus::Frame {
        colors.heading
    } else {
        colors.border
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(colors.bg));

    let rendered = app.rendered();
    match rendered.as_ref() {
        Rendered::Table(grid) => draw_grid(f, grid, app.table_cursor, block, area, colors),
        Rendered::Text(text) => {
            let paragraph = Paragraph::new(text.as_str())
                .block(block)
                .style(Style::default().fg(colors.text))
                .scroll((app.frame_scroll, 0));
            f.render_widget(paragraph, area);
        },
    }
}

fn draw_grid(
    f: &mut Frame<'_>,
    grid: &Grid,
    cursor: (usize, usize),
    block: Block<'_>,
    area: Rect,
    colors: &ThemeColors,
) {
    let clip = |width: usize| width.clamp(3, MAX_COLUMN_WIDTH) as u16;
    let label_width = clip(grid.row_labels.iter().map(|l| l.width()).max().unwrap_or(0));
    let mut widths: Vec<u16> = grid.columns.iter().map(|c| clip(c.width())).collect();
    for row in &grid.rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(clip(cell.text.width() + 2));
        }
    }

    // Leftmost column so that the cursor column fits in the inner width.
    let available = area.width.saturating_sub(2 + label_width + 1);
    let mut first = cursor.1.min(widths.len().saturating_sub(1));
    let mut used = widths.get(first).copied().unwrap_or(0) + 1;
    while first > 0 && used + widths[first - 1] + 1 <= available {
        first -= 1;
        used += widths[first] + 1;
    }
    let last = {
        let mut last = first;
        let mut used = 0;
        while last < widths.len() && used + widths[last] + 1 <= available.max(widths[first] + 1) {
            used += widths[last] + 1;
            last += 1;
        }
        last
    };

    let header_style = Style::default()
        .fg(colors.heading)
        .add_modifier(Modifier::BOLD);
    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(grid.columns[first..last].iter().map(|c| Cell::from(c.clone()))),
    )
    .style(header_style);

    let rows = grid.rows.iter().enumerate().map(|(i, row)| {
        let label = grid.row_labels.get(i).cloned().unwrap_or_default();
        let shown = row.get(first..last.min(row.len())).unwrap_or_default();
        let cells = shown.iter().enumerate().map(|(j, cell)| {
            let text = match cell.kind {
                CellKind::Navigable => format!("▸ {}", cell.text),
                CellKind::Terminal => cell.text.clone(),
            };
            let style = if (i, first + j) == cursor {
                Style::default()
                    .fg(colors.cursor_fg)
                    .bg(colors.cursor_bg)
                    .add_modifier(Modifier::BOLD)
            } else if cell.kind == CellKind::Navigable {
                Style::default().fg(colors.for_kind(ShapeKind::Mapping))
            } else {
                Style::default().fg(colors.value)
            };
            Cell::from(text).style(style)
        });
        Row::new(
            std::iter::once(Cell::from(label).style(Style::default().fg(colors.label)))
                .chain(cells),
        )
    });

    let constraints = std::iter::once(Constraint::Length(label_width))
        .chain(widths[first..last].iter().map(|&w| Constraint::Length(w)));

    let block = match &grid.notice {
        Some(notice) => block.title_bottom(Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(colors.warning),
        ))),
        None => block,
    };

    let table = Table::new(rows, constraints).header(header).block(block);
    let mut state = TableState::default().with_selected(Some(cursor.0));
    f.render_stateful_widget(table, area, &mut state);
}
