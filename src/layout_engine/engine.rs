use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::LayoutError;
use super::utils::apply_gaps;
use super::workspaces::Workspaces;
use super::Direction;
use crate::common::config::LayoutSettings;
use crate::sys::geometry::Rect;
use crate::sys::screen::DisplayId;
use crate::sys::window_server::WindowId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MoveFocus(Direction),
    SwapWindow(Direction),
    ResizeGrow,
    ResizeShrink,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    WindowAdded { window: WindowId, frame: Rect },
    WindowRemoved(WindowId),
    WindowFocused(WindowId),
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub focus_window: Option<WindowId>,
    /// Frames changed and should be pushed to the window server.
    pub needs_retile: bool,
}

impl EventResponse {
    fn retile() -> Self {
        Self {
            focus_window: None,
            needs_retile: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LayoutEngine {
    workspaces: Workspaces,
    focused_window: Option<WindowId>,
    #[serde(skip)]
    layout_settings: LayoutSettings,
}

impl LayoutEngine {
    pub fn new(
        displays: &[(DisplayId, Rect)],
        settings: &LayoutSettings,
    ) -> Result<Self, LayoutError> {
        Ok(Self {
            workspaces: Workspaces::provision(displays, settings)?,
            focused_window: None,
            layout_settings: settings.clone(),
        })
    }

    /// Applies new settings. Only future splits pick up the split ratio.
    pub fn set_layout_settings(&mut self, settings: &LayoutSettings) {
        self.layout_settings = settings.clone();
        for ws in self.workspaces.iter_mut() {
            if let Err(e) = ws.tree_mut().set_split_ratio(settings.split_ratio) {
                warn!("Keeping previous split ratio: {e}");
            }
            ws.tree_mut().set_insertion_policy(settings.insertion);
        }
    }

    pub fn layout_settings(&self) -> &LayoutSettings { &self.layout_settings }

    pub fn workspaces(&self) -> &Workspaces { &self.workspaces }

    pub fn focused_window(&self) -> Option<WindowId> { self.focused_window }

    pub fn handle_event(&mut self, event: LayoutEvent) -> EventResponse {
        debug!(?event);
        match event {
            LayoutEvent::WindowAdded { window, frame } => {
                match self.workspaces.insert_window(window, frame) {
                    Ok(_) => EventResponse::retile(),
                    Err(e) => {
                        warn!(%window, "Could not add window: {e}");
                        EventResponse::default()
                    }
                }
            }
            LayoutEvent::WindowRemoved(window) => {
                if !self.workspaces.remove_window(window) {
                    return EventResponse::default();
                }
                if self.focused_window == Some(window) {
                    self.focused_window = None;
                }
                EventResponse::retile()
            }
            LayoutEvent::WindowFocused(window) => {
                // Focus on an unmanaged window leaves nothing to navigate from.
                self.focused_window =
                    self.workspaces.containing_window(window).map(|_| window);
                EventResponse::default()
            }
        }
    }

    pub fn handle_command(&mut self, command: LayoutCommand) -> EventResponse {
        let Some(focus) = self.focused_window else {
            debug!(?command, "No focused window");
            return EventResponse::default();
        };
        let Some(ws) = self.workspaces.containing_window_mut(focus) else {
            return EventResponse::default();
        };
        let tree = ws.tree_mut();
        let Some(leaf) = tree.find_node_for_window(focus) else {
            return EventResponse::default();
        };

        match command {
            LayoutCommand::MoveFocus(direction) => {
                let target = tree
                    .find_neighbor(leaf, direction)
                    .and_then(|n| tree.node(n))
                    .and_then(|n| n.window());
                match target {
                    Some(target) => {
                        self.focused_window = Some(target);
                        EventResponse {
                            focus_window: Some(target),
                            needs_retile: false,
                        }
                    }
                    None => EventResponse::default(),
                }
            }
            LayoutCommand::SwapWindow(direction) => {
                let Some(neighbor) = tree.find_neighbor(leaf, direction) else {
                    return EventResponse::default();
                };
                if tree.swap_windows(leaf, neighbor) {
                    EventResponse {
                        focus_window: Some(focus),
                        needs_retile: true,
                    }
                } else {
                    EventResponse::default()
                }
            }
            LayoutCommand::ResizeGrow | LayoutCommand::ResizeShrink => {
                let step = self.layout_settings.resize_step;
                let delta = if command == LayoutCommand::ResizeGrow { step } else { -step };
                EventResponse {
                    focus_window: None,
                    needs_retile: tree.adjust_ratio(leaf, delta),
                }
            }
        }
    }

    /// Final frames for every tiled window, in traversal order per display.
    pub fn calculate_layout(&self) -> Vec<(WindowId, Rect)> {
        let gaps = &self.layout_settings.gaps;
        let mut frames = Vec::new();
        for ws in self.workspaces.iter() {
            let bounds = ws.bounds();
            let tree = ws.tree();
            tree.traverse(tree.root(), |_, leaf| {
                if let Some(window) = leaf.window() {
                    frames.push((window, apply_gaps(leaf.rect(), bounds, gaps)));
                }
            });
        }
        frames
    }

    pub fn draw_tree(&self, display: DisplayId) -> Option<String> {
        self.workspaces.for_display(display).map(|ws| ws.tree().draw_tree())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)?.write_all(self.serialize_to_string()?.as_bytes())?;
        Ok(())
    }

    pub fn serialize_to_string(&self) -> Result<String, ron::Error> { ron::ser::to_string(&self) }
}
