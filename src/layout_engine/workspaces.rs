use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::binary_tree::{BspTree, NodeId};
use super::error::LayoutError;
use crate::common::config::LayoutSettings;
use crate::sys::geometry::Rect;
use crate::sys::screen::DisplayId;
use crate::sys::window_server::WindowId;

/// The tiled area of one display.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Workspace {
    display: DisplayId,
    bounds: Rect,
    tree: BspTree,
}

impl Workspace {
    pub fn display(&self) -> DisplayId { self.display }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn tree(&self) -> &BspTree { &self.tree }

    pub fn tree_mut(&mut self) -> &mut BspTree { &mut self.tree }
}

/// One workspace per active display, primary display first.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Workspaces {
    workspaces: Vec<Workspace>,
}

impl Workspaces {
    pub fn provision(
        displays: &[(DisplayId, Rect)],
        settings: &LayoutSettings,
    ) -> Result<Self, LayoutError> {
        if displays.is_empty() {
            return Err(LayoutError::NoDisplays);
        }
        let workspaces = displays
            .iter()
            .map(|&(id, bounds)| {
                if bounds.is_degenerate() {
                    return Err(LayoutError::DegenerateRect(bounds));
                }
                let tree = BspTree::with_settings(bounds, settings.split_ratio, settings.insertion)?;
                debug!(display = %id, %bounds, "Created workspace");
                Ok(Workspace { display: id, bounds, tree })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = workspaces.len(), "Provisioned workspaces");
        Ok(Self { workspaces })
    }

    pub fn len(&self) -> usize { self.workspaces.len() }

    pub fn is_empty(&self) -> bool { self.workspaces.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> { self.workspaces.iter() }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Workspace> { self.workspaces.iter_mut() }

    fn index_for_frame(&self, frame: Rect) -> Option<usize> {
        if self.workspaces.is_empty() {
            return None;
        }
        let center = frame.mid();
        Some(self.workspaces.iter().position(|ws| ws.bounds.contains(center)).unwrap_or(0))
    }

    /// The workspace whose display contains the center of `frame`, or the
    /// primary workspace when no display does.
    pub fn for_frame(&self, frame: Rect) -> Option<&Workspace> {
        self.index_for_frame(frame).map(|i| &self.workspaces[i])
    }

    pub fn for_frame_mut(&mut self, frame: Rect) -> Option<&mut Workspace> {
        self.index_for_frame(frame).map(|i| &mut self.workspaces[i])
    }

    pub fn for_display(&self, display: DisplayId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.display == display)
    }

    pub fn for_display_mut(&mut self, display: DisplayId) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|ws| ws.display == display)
    }

    pub fn containing_window(&self, window: WindowId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.tree.contains_window(window))
    }

    pub fn containing_window_mut(&mut self, window: WindowId) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|ws| ws.tree.contains_window(window))
    }

    /// Inserts `window` into the workspace chosen by [`for_frame`](Self::for_frame).
    pub fn insert_window(&mut self, window: WindowId, frame: Rect) -> Result<NodeId, LayoutError> {
        if self.containing_window(window).is_some() {
            return Err(LayoutError::DuplicateWindow(window));
        }
        let ws = self.for_frame_mut(frame).ok_or(LayoutError::NoDisplays)?;
        let leaf = ws.tree.insert(window)?;
        debug!(%window, display = %ws.display, "Inserted window");
        Ok(leaf)
    }

    /// Removes `window` from the first workspace holding it.
    pub fn remove_window(&mut self, window: WindowId) -> bool {
        self.containing_window_mut(window).is_some_and(|ws| ws.tree.remove(window))
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.workspaces.iter().flat_map(|ws| ws.tree.windows()).collect()
    }
}
