pub mod binary_tree;
pub mod engine;
mod error;
pub(crate) mod graph;
pub mod utils;
mod workspaces;

pub use binary_tree::{BspTree, InsertionPolicy, Node, NodeId, NodeKind};
pub use engine::{EventResponse, LayoutCommand, LayoutEngine, LayoutEvent};
pub use error::LayoutError;
pub use graph::{Direction, Orientation};
pub use workspaces::{Workspace, Workspaces};
