//! An in-memory window server and screen arrangement.
//!
//! It stands in for the platform when driving the window manager from the
//! command line or from tests, and is persisted between CLI invocations.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::geometry::Rect;
use super::screen::{DisplayId, ScreenProvider, StaticScreens};
use super::window_server::{WindowId, WindowServer, WindowServerError, WindowServerInfo, pid_t};
use crate::common::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessWindowServer {
    screens: StaticScreens,
    /// Front to back.
    windows: Vec<WindowServerInfo>,
    focused: Option<WindowId>,
    next_id: u32,
    #[serde(default)]
    unplaceable: BTreeSet<WindowId>,
}

impl HeadlessWindowServer {
    pub fn new(displays: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            screens: StaticScreens::from_bounds(displays),
            windows: Vec::new(),
            focused: None,
            next_id: 1,
            unplaceable: BTreeSet::new(),
        }
    }

    /// Opens a window in front of all others and focuses it.
    pub fn open_window(&mut self, pid: pid_t, app_name: &str, frame: Rect) -> WindowId {
        let id = WindowId::new(self.next_id);
        self.next_id += 1;
        self.windows.insert(0, WindowServerInfo {
            id,
            pid,
            app_name: app_name.to_string(),
            frame,
        });
        self.focused = Some(id);
        trace!(%id, pid, app_name, "Opened window");
        id
    }

    pub fn close_window(&mut self, id: WindowId) -> bool {
        let before = self.windows.len();
        self.windows.retain(|w| w.id != id);
        self.forget(&[id]);
        self.windows.len() != before
    }

    /// Closes every window owned by `pid` and returns their ids.
    pub fn close_windows_for_pid(&mut self, pid: pid_t) -> Vec<WindowId> {
        let closed: Vec<WindowId> =
            self.windows.iter().filter(|w| w.pid == pid).map(|w| w.id).collect();
        self.windows.retain(|w| w.pid != pid);
        self.forget(&closed);
        closed
    }

    fn forget(&mut self, ids: &[WindowId]) {
        for id in ids {
            self.unplaceable.remove(id);
        }
        if self.focused.is_some_and(|f| ids.contains(&f)) {
            self.focused = self.windows.first().map(|w| w.id);
        }
    }

    /// Makes every future `set_frame` on `id` fail.
    pub fn mark_unplaceable(&mut self, id: WindowId) { self.unplaceable.insert(id); }

    pub fn window(&self, id: WindowId) -> Option<&WindowServerInfo> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn frame_of(&self, id: WindowId) -> Option<Rect> { self.window(id).map(|w| w.frame) }
}

impl ScreenProvider for HeadlessWindowServer {
    fn active_displays(&self) -> Vec<(DisplayId, Rect)> { self.screens.active_displays() }
}

impl WindowServer for HeadlessWindowServer {
    fn visible_windows(&self) -> Vec<WindowServerInfo> { self.windows.clone() }

    fn set_frame(&mut self, window: WindowId, frame: Rect) -> Result<(), WindowServerError> {
        if self.unplaceable.contains(&window) {
            return Err(WindowServerError::Rejected { window, frame });
        }
        let info = self
            .windows
            .iter_mut()
            .find(|w| w.id == window)
            .ok_or(WindowServerError::NoSuchWindow(window))?;
        info.frame = frame;
        Ok(())
    }

    fn focused_window(&self) -> Option<WindowId> { self.focused }

    fn focus_window(&mut self, window: WindowId) -> Result<(), WindowServerError> {
        let idx = self
            .windows
            .iter()
            .position(|w| w.id == window)
            .ok_or(WindowServerError::NoSuchWindow(window))?;
        let info = self.windows.remove(idx);
        self.windows.insert(0, info);
        self.focused = Some(window);
        Ok(())
    }
}
