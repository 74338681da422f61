use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

#[allow(non_camel_case_types)]
pub type pid_t = i32;

/// Identifier the window server assigns to a window. Stable for the
/// lifetime of the window.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    #[inline]
    pub fn new(id: u32) -> Self { Self(id) }

    #[inline]
    pub fn as_u32(self) -> u32 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowServerInfo {
    pub id: WindowId,
    pub pid: pid_t,
    pub app_name: String,
    pub frame: Rect,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowServerError {
    #[error("window {0} does not exist")]
    NoSuchWindow(WindowId),
    #[error("window {window} refused frame {frame}")]
    Rejected { window: WindowId, frame: Rect },
}

/// Everything the window manager needs from the platform's window server.
pub trait WindowServer {
    /// On-screen windows, front to back.
    fn visible_windows(&self) -> Vec<WindowServerInfo>;

    fn windows_for_pid(&self, pid: pid_t) -> Vec<WindowServerInfo> {
        self.visible_windows().into_iter().filter(|w| w.pid == pid).collect()
    }

    fn set_frame(&mut self, window: WindowId, frame: Rect) -> Result<(), WindowServerError>;

    fn focused_window(&self) -> Option<WindowId>;

    fn focus_window(&mut self, window: WindowId) -> Result<(), WindowServerError>;
}
