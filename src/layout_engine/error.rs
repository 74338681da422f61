use thiserror::Error;

use super::binary_tree::NodeId;
use crate::sys::geometry::Rect;
use crate::sys::window_server::WindowId;

/// Failures of tree and workspace operations. None of them leave a tree in a
/// partially mutated state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),
    #[error("node {0:?} is a split, expected a leaf")]
    NotALeaf(NodeId),
    #[error("leaf {0:?} holds no window and cannot be split")]
    EmptyLeaf(NodeId),
    #[error("window {0} is already in the tree")]
    DuplicateWindow(WindowId),
    #[error("rectangle {0} has no area")]
    DegenerateRect(Rect),
    #[error("split ratio must be strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),
    #[error("no active displays to create workspaces for")]
    NoDisplays,
}
