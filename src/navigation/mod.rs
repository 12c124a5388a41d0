//! Navigation: selection, drill-down frames and search.
//!
//! [`Navigator`] is the entry point a presentation layer talks to. It pulls
//! renderings on demand and owns the stack of frames the user drilled into.

mod click;
mod navigator;
mod search;
mod stack;

pub use click::ClickTracker;
pub use navigator::{CellAction, Navigator, NodeDetail};
pub use search::SearchState;
pub use stack::{Frame, NavigationStack};
