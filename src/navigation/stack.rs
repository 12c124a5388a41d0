//! Navigation stack of drilled-into frames.

use crate::data::{Path, Value};

/// A value together with its address from the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The value shown.
    pub value: Value,
    /// Where it lives in the document.
    pub path: Path,
}

impl Frame {
    /// Frame for a document root.
    pub fn root(value: Value) -> Self {
        Self {
            value,
            path: Path::root(),
        }
    }
}

/// Last-in-first-out frames over a sticky root.
///
/// The root frame is always at the bottom, is never pushed a second time and
/// is never popped.
#[derive(Debug, Clone)]
pub struct NavigationStack {
    frames: Vec<Frame>,
}

impl NavigationStack {
    /// Start a stack at the document root.
    pub fn new(root: Value) -> Self {
        Self {
            frames: vec![Frame::root(root)],
        }
    }

    /// The frame on top.
    pub fn current(&self) -> &Frame {
        // The root frame is never removed.
        &self.frames[self.frames.len() - 1]
    }

    /// The root frame.
    pub fn root(&self) -> &Frame {
        &self.frames[0]
    }

    /// Push a frame. Pushing the root path is ignored and returns `false`.
    pub fn push(&mut self, value: Value, path: Path) -> bool {
        if path.is_root() {
            return false;
        }
        self.frames.push(Frame { value, path });
        true
    }

    /// Pop the top frame. At the root nothing happens and `None` is returned.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Frames above the root.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Whether only the root is on the stack.
    pub fn is_at_root(&self) -> bool {
        self.frames.len() == 1
    }

    /// Paths from the root to the current frame.
    pub fn breadcrumbs(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(|frame| &frame.path)
    }
}
