//! Utility functions.
//!
//! This module provides engine limits, value formatting and clipboard
//! helpers shared by the engine and the terminal front-end.

pub mod clipboard;
pub mod formatters;
pub mod limits;

pub use clipboard::{copy_node_info, copy_text, copy_tree_structure};
pub use limits::{EngineConfig, LoaderConfig, NavigationConfig, RenderLimits, TreeLimits};
