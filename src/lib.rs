//! Deepview - A fast, terminal-based explorer for scientific data files.
//!
//! Deepview decodes arrays, tables, configuration files, tensors, meshes and
//! images into one value model, and lets you walk any of them the same way:
//! an overview tree, windowed text/table/raw renderings, and drill-down into
//! nested values.
//!
//! # Features
//!
//! - Format-agnostic structure classification and path addressing
//! - Depth- and width-bounded overview trees
//! - Text, table and raw renderings that stay cheap on huge arrays
//! - Drill-down navigation with a per-frame render cache
//! - Background loading that never applies a superseded result
//! - Search, clipboard integration and Gruvbox color themes
//!
//! # Example
//!
//! ```ignore
//! use deepview::loader::LoaderRegistry;
//! use deepview::navigation::Navigator;
//! use deepview::render::DisplayMode;
//! use deepview::util::EngineConfig;
//! use std::path::Path;
//!
//! let config = EngineConfig::default();
//! let mut registry = LoaderRegistry::new(config.loader.clone());
//! let document = registry.load(Path::new("weights.npz"))?;
//!
//! let mut navigator = Navigator::new(config);
//! let tree = navigator.set_document(document);
//! println!("{} top-level entries", tree.children.len());
//! println!("{}", navigator.render(DisplayMode::Text).to_text());
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod app;
pub mod data;
pub mod error;
pub mod explorer;
pub mod loader;
pub mod navigation;
pub mod render;
pub mod ui;
pub mod util;

pub use error::{DeepviewError, Result};
