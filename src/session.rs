//! Window manager state persisted between command-line invocations.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::Config;
use crate::sys::geometry::Rect;
use crate::sys::headless::HeadlessWindowServer;
use crate::wm_controller::WmController;

#[derive(Serialize, Deserialize, Debug)]
pub struct Session {
    pub controller: WmController,
    pub server: HeadlessWindowServer,
}

impl Session {
    pub fn new(config: Config, displays: Vec<Rect>) -> anyhow::Result<Self> {
        let server = HeadlessWindowServer::new(displays);
        let controller = WmController::new(config, &server)?;
        Ok(Self { controller, server })
    }

    /// Restores a saved session and installs `config`, which is not part of
    /// the saved state.
    pub fn load(path: &Path, config: Config) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)
            .with_context(|| format!("no session at {}; run `pengwm init` first", path.display()))?
            .read_to_string(&mut buf)?;
        let mut session: Session = ron::from_str(&buf)
            .with_context(|| format!("could not parse session {}", path.display()))?;
        session.controller.set_config(config);
        debug!(path = %path.display(), "Loaded session");
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let pretty = ron::ser::PrettyConfig::default();
        File::create(path)?.write_all(ron::ser::to_string_pretty(self, pretty)?.as_bytes())?;
        Ok(())
    }
}
