//! Color themes for the UI.
//!
//! Each theme is a Gruvbox base palette; UI roles and shape-kind accents are
//! both picked from it.

use crate::app::Theme;
use crate::data::ShapeKind;
use ratatui::style::Color;

/// Gruvbox base colors for one variant.
#[derive(Debug, Clone, Copy)]
struct Gruvbox {
    bg0: Color,
    bg1: Color,
    bg3: Color,
    fg1: Color,
    gray: Color,
    red: Color,
    green: Color,
    yellow: Color,
    blue: Color,
    purple: Color,
    aqua: Color,
    orange: Color,
}

const GRUVBOX_DARK: Gruvbox = Gruvbox {
    bg0: Color::Rgb(40, 40, 40),
    bg1: Color::Rgb(60, 56, 54),
    bg3: Color::Rgb(102, 92, 84),
    fg1: Color::Rgb(235, 219, 178),
    gray: Color::Rgb(146, 131, 116),
    red: Color::Rgb(251, 73, 52),
    green: Color::Rgb(184, 187, 38),
    yellow: Color::Rgb(250, 189, 47),
    blue: Color::Rgb(131, 165, 152),
    purple: Color::Rgb(211, 134, 155),
    aqua: Color::Rgb(142, 192, 124),
    orange: Color::Rgb(251, 184, 108),
};

const GRUVBOX_LIGHT: Gruvbox = Gruvbox {
    bg0: Color::Rgb(251, 245, 234),
    bg1: Color::Rgb(235, 219, 178),
    bg3: Color::Rgb(213, 196, 161),
    fg1: Color::Rgb(60, 56, 54),
    gray: Color::Rgb(124, 111, 100),
    red: Color::Rgb(157, 0, 6),
    green: Color::Rgb(121, 116, 14),
    yellow: Color::Rgb(181, 118, 20),
    blue: Color::Rgb(7, 102, 120),
    purple: Color::Rgb(143, 63, 113),
    aqua: Color::Rgb(66, 123, 88),
    orange: Color::Rgb(175, 58, 3),
};

/// Theme color palette.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Background color.
    pub bg: Color,
    /// Primary text color.
    pub text: Color,
    /// Heading text color.
    pub heading: Color,
    /// Label text color.
    pub label: Color,
    /// Value text color.
    pub value: Color,
    /// Border color.
    pub border: Color,
    /// Cursor foreground color.
    pub cursor_fg: Color,
    /// Cursor background color.
    pub cursor_bg: Color,
    /// Status bar foreground color.
    pub status_fg: Color,
    /// Status bar background color.
    pub status_bg: Color,
    /// Omission notices and tree placeholders.
    pub warning: Color,
    /// Error color.
    pub error: Color,
    /// Sizes and descriptions.
    pub muted: Color,
    base: Gruvbox,
}

impl ThemeColors {
    /// Create color palette from theme.
    pub fn from_theme(theme: &Theme) -> Self {
        let base = match theme {
            Theme::GruvboxDark => GRUVBOX_DARK,
            Theme::GruvboxLight => GRUVBOX_LIGHT,
        };
        Self {
            bg: base.bg0,
            text: base.fg1,
            heading: base.orange,
            label: base.green,
            value: base.aqua,
            border: base.bg3,
            cursor_fg: base.bg0,
            cursor_bg: base.orange,
            status_fg: base.fg1,
            status_bg: base.bg1,
            warning: base.yellow,
            error: base.red,
            muted: base.gray,
            base,
        }
    }

    /// Accent for a node of the given shape kind.
    pub fn for_kind(&self, kind: ShapeKind) -> Color {
        match kind {
            ShapeKind::NDArray => self.base.aqua,
            ShapeKind::Mapping | ShapeKind::Sequence | ShapeKind::Opaque => self.base.blue,
            ShapeKind::Scalar => self.base.purple,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable_in_both_themes() {
        for theme in [Theme::GruvboxDark, Theme::GruvboxLight] {
            let colors = ThemeColors::from_theme(&theme);
            let array = colors.for_kind(ShapeKind::NDArray);
            let mapping = colors.for_kind(ShapeKind::Mapping);
            let scalar = colors.for_kind(ShapeKind::Scalar);
            assert_ne!(array, mapping);
            assert_ne!(mapping, scalar);
            assert_eq!(mapping, colors.for_kind(ShapeKind::Sequence));
            assert_ne!(colors.cursor_fg, colors.cursor_bg);
        }
    }
}
