//! The WM controller decides which windows get tiled, feeds window lifecycle
//! changes into the layout engine and pushes the resulting frames out to the
//! window server.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::common::collections::BTreeMap;
use crate::common::config::{Config, Hotkey, RuleKind};
use crate::layout_engine::{
    Direction, EventResponse, LayoutCommand, LayoutEngine, LayoutError, LayoutEvent,
};
use crate::sys::geometry::Rect;
use crate::sys::screen::ScreenProvider;
use crate::sys::window_server::{WindowId, WindowServer, WindowServerInfo, pid_t};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WmCommand {
    Focus(Direction),
    Swap(Direction),
    Tile,
    IncreaseSize,
    DecreaseSize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedWindow {
    pub id: WindowId,
    pub pid: pid_t,
    pub app_name: String,
    /// The frame last reported by or pushed to the window server.
    pub frame: Rect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileReport {
    pub placed: usize,
    pub failed: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WmController {
    layout: LayoutEngine,
    managed: BTreeMap<WindowId, ManagedWindow>,
    #[serde(skip)]
    config: Config,
}

impl WmController {
    pub fn new(config: Config, screens: &impl ScreenProvider) -> Result<Self, LayoutError> {
        let displays = screens.active_displays();
        let layout = LayoutEngine::new(&displays, &config.settings.layout)?;
        Ok(Self {
            layout,
            managed: BTreeMap::new(),
            config,
        })
    }

    /// Installs a configuration, e.g. after restoring a saved session.
    pub fn set_config(&mut self, config: Config) {
        self.layout.set_layout_settings(&config.settings.layout);
        self.config = config;
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn layout(&self) -> &LayoutEngine { &self.layout }

    pub fn managed_windows(&self) -> impl Iterator<Item = &ManagedWindow> { self.managed.values() }

    pub fn managed_window(&self, id: WindowId) -> Option<&ManagedWindow> { self.managed.get(&id) }

    pub fn should_manage(&self, info: &WindowServerInfo) -> bool {
        let manage = &self.config.settings.manage;
        if info.frame.size.width < manage.min_window_width
            || info.frame.size.height < manage.min_window_height
        {
            trace!(window = %info.id, frame = %info.frame, "Window too small to tile");
            return false;
        }
        match self.config.rule_for(&info.app_name) {
            Some(RuleKind::Tile) => true,
            Some(RuleKind::Float | RuleKind::Ignore) => false,
            None => !manage.ignored_apps.iter().any(|app| *app == info.app_name),
        }
    }

    fn manage(&mut self, info: WindowServerInfo) -> bool {
        if self.managed.contains_key(&info.id) || !self.should_manage(&info) {
            return false;
        }
        let response = self.layout.handle_event(LayoutEvent::WindowAdded {
            window: info.id,
            frame: info.frame,
        });
        if !response.needs_retile {
            return false;
        }
        debug!(window = %info.id, app = %info.app_name, "Managing window");
        self.managed.insert(info.id, ManagedWindow {
            id: info.id,
            pid: info.pid,
            app_name: info.app_name,
            frame: info.frame,
        });
        true
    }

    fn unmanage(&mut self, window: WindowId) -> bool {
        if self.managed.remove(&window).is_none() {
            return false;
        }
        let _ = self.layout.handle_event(LayoutEvent::WindowRemoved(window));
        true
    }

    /// Brings every manageable on-screen window under management, oldest
    /// first. Returns how many were added.
    pub fn organize_existing_windows(&mut self, server: &impl WindowServer) -> usize {
        let mut added = 0;
        for info in server.visible_windows().into_iter().rev() {
            if self.manage(info) {
                added += 1;
            }
        }
        self.sync_focus(server);
        info!(added, "Organized existing windows");
        added
    }

    pub fn add_windows_for_pid(&mut self, server: &mut impl WindowServer, pid: pid_t) -> usize {
        let mut added = 0;
        for info in server.windows_for_pid(pid).into_iter().rev() {
            if self.manage(info) {
                added += 1;
            }
        }
        if added == 0 {
            info!(pid, "No new windows");
            return 0;
        }
        info!(pid, added, "Added windows");
        if self.config.settings.auto_tile {
            self.tile(server);
        }
        added
    }

    pub fn close_windows_for_pid(&mut self, server: &mut impl WindowServer, pid: pid_t) -> usize {
        let owned: Vec<WindowId> =
            self.managed.values().filter(|w| w.pid == pid).map(|w| w.id).collect();
        let removed = owned.into_iter().filter(|&id| self.unmanage(id)).count();
        if removed == 0 {
            info!(pid, "No managed windows");
            return 0;
        }
        info!(pid, removed, "Removed windows");
        if self.config.settings.auto_tile {
            self.tile(server);
        }
        removed
    }

    /// Drops managed windows the server no longer shows.
    pub fn forget_closed_windows(&mut self, server: &impl WindowServer) -> usize {
        let visible: Vec<WindowId> = server.visible_windows().iter().map(|w| w.id).collect();
        let stale: Vec<WindowId> =
            self.managed.keys().filter(|id| !visible.contains(*id)).copied().collect();
        stale.into_iter().filter(|&id| self.unmanage(id)).count()
    }

    /// Pushes the current layout to the window server. Windows that refuse
    /// their frame are reported and skipped.
    pub fn tile(&mut self, server: &mut impl WindowServer) -> TileReport {
        let mut report = TileReport::default();
        for (window, frame) in self.layout.calculate_layout() {
            match server.set_frame(window, frame) {
                Ok(()) => {
                    report.placed += 1;
                    if let Some(managed) = self.managed.get_mut(&window) {
                        managed.frame = frame;
                    }
                }
                Err(e) => {
                    warn!(%window, "Failed to place window: {e}");
                    report.failed += 1;
                }
            }
        }
        info!(placed = report.placed, failed = report.failed, "Tiled");
        report
    }

    fn sync_focus(&mut self, server: &impl WindowServer) {
        if let Some(focused) = server.focused_window() {
            let _ = self.layout.handle_event(LayoutEvent::WindowFocused(focused));
        }
    }

    /// Moves focus to the neighbouring window. Returns the newly focused window.
    pub fn focus(
        &mut self,
        server: &mut impl WindowServer,
        direction: Direction,
    ) -> Option<WindowId> {
        self.run_layout_command(server, LayoutCommand::MoveFocus(direction)).focus_window
    }

    pub fn handle_command(
        &mut self,
        server: &mut impl WindowServer,
        command: &WmCommand,
    ) -> EventResponse {
        debug!(?command);
        match command {
            WmCommand::Focus(direction) => {
                self.run_layout_command(server, LayoutCommand::MoveFocus(*direction))
            }
            WmCommand::Swap(direction) => {
                self.run_layout_command(server, LayoutCommand::SwapWindow(*direction))
            }
            WmCommand::Tile => {
                self.tile(server);
                EventResponse::default()
            }
            WmCommand::IncreaseSize => self.run_layout_command(server, LayoutCommand::ResizeGrow),
            WmCommand::DecreaseSize => self.run_layout_command(server, LayoutCommand::ResizeShrink),
        }
    }

    /// Runs the command bound to `hotkey`. Returns false if nothing is bound.
    pub fn handle_hotkey(&mut self, server: &mut impl WindowServer, hotkey: &Hotkey) -> bool {
        let Some(command) = self.config.command_for(hotkey).cloned() else {
            debug!(%hotkey, "Unbound hotkey");
            return false;
        };
        let _ = self.handle_command(server, &command);
        true
    }

    fn run_layout_command(
        &mut self,
        server: &mut impl WindowServer,
        command: LayoutCommand,
    ) -> EventResponse {
        self.sync_focus(&*server);
        let response = self.layout.handle_command(command);
        if response.needs_retile {
            self.tile(server);
        }
        if let Some(window) = response.focus_window {
            if let Err(e) = server.focus_window(window) {
                warn!(%window, "Failed to focus window: {e}");
            }
        }
        response
    }
}
