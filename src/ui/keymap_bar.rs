//! Keymap help bar UI component.

use crate::app::Focus;
use crate::ui::ThemeColors;
use ratatui::{layout::Rect, style::Style, widgets::Paragraph, Frame};

/// Draw the keymap help bar.
pub fn draw_keymap(
    f: &mut Frame<'_>,
    area: Rect,
    focus: Focus,
    search_active: bool,
    colors: &ThemeColors,
) {
    let keymap_text = if search_active {
        "Enter:search | Esc:cancel | Type to search"
    } else {
        match focus {
            Focus::Tree => {
                "q:quit | hjkl:nav | Enter:open | Tab:pane | m:mode | /:search | n/N:next/prev | c/y:copy | T:theme"
            },
            Focus::Frame => {
                "q:quit | hjkl:move | Enter:select (twice:open) | Backspace:back | Tab:pane | m:mode | Y:copy view"
            },
        }
    };

    let paragraph =
        Paragraph::new(keymap_text).style(Style::default().fg(colors.text).bg(colors.bg));

    f.render_widget(paragraph, area);
}
