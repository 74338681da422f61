use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::bail;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::collections::BTreeMap;
use crate::layout_engine::InsertionPolicy;
use crate::layout_engine::binary_tree::{MAX_RATIO, MIN_RATIO};
use crate::wm_controller::WmCommand;

pub fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir).join(".pengwm")
}
pub fn restore_file() -> PathBuf { data_dir().join("session.ron") }
pub fn config_file() -> PathBuf { data_dir().join("config.toml") }

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const CMD = 1 << 0;
        const ALT = 1 << 1;
        const CTRL = 1 << 2;
        const SHIFT = 1 << 3;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Return,
    Space,
    Tab,
    Escape,
    Equal,
    Minus,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("empty key combination")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

impl FromStr for KeyCode {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_ascii_lowercase();
        Ok(match key.as_str() {
            "return" | "enter" => KeyCode::Return,
            "space" => KeyCode::Space,
            "tab" => KeyCode::Tab,
            "escape" | "esc" => KeyCode::Escape,
            "equal" | "=" => KeyCode::Equal,
            "minus" | "-" => KeyCode::Minus,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_graphic() => KeyCode::Char(c),
                    _ => return Err(HotkeyParseError::UnknownKey(s.to_string())),
                }
            }
        })
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Return => f.write_str("return"),
            KeyCode::Space => f.write_str("space"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::Escape => f.write_str("escape"),
            KeyCode::Equal => f.write_str("equal"),
            KeyCode::Minus => f.write_str("minus"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
        }
    }
}

/// Parses combinations written as `"cmd + alt + h"`. The last component is
/// the key, everything before it a modifier.
impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(HotkeyParseError::Empty);
        };
        if key.is_empty() {
            return Err(HotkeyParseError::Empty);
        }

        let mut mods = Modifiers::empty();
        for m in modifiers {
            mods |= match m.to_ascii_lowercase().as_str() {
                "cmd" | "command" => Modifiers::CMD,
                "alt" | "option" => Modifiers::ALT,
                "ctrl" | "control" => Modifiers::CTRL,
                "shift" => Modifiers::SHIFT,
                _ => return Err(HotkeyParseError::UnknownModifier(m.to_string())),
            };
        }

        Ok(Hotkey {
            modifiers: mods,
            key: key.parse()?,
        })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CMD, "cmd"),
            (Modifiers::ALT, "alt"),
            (Modifiers::CTRL, "ctrl"),
            (Modifiers::SHIFT, "shift"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name} + ")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// What to do with windows of a given application.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Tile,
    Float,
    Ignore,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppRule {
    pub app_name: String,
    pub rule: RuleKind,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    settings: Settings,
    #[serde(default)]
    keys: BTreeMap<String, WmCommand>,
    #[serde(default)]
    app_rules: Vec<AppRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    pub keys: Vec<(Hotkey, WmCommand)>,
    pub app_rules: Vec<AppRule>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Retile whenever windows appear or disappear.
    #[serde(default = "yes")]
    pub auto_tile: bool,
    /// Accepted for compatibility. Currently inert: nothing reports pointer
    /// movement to the controller.
    #[serde(default)]
    pub focus_follows_mouse: bool,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub manage: ManageSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Share of a split given to the first child.
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    #[serde(default)]
    pub insertion: InsertionPolicy,
    /// Ratio change applied by one grow or shrink command.
    #[serde(default = "default_resize_step")]
    pub resize_step: f64,
    #[serde(default)]
    pub gaps: GapSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ManageSettings {
    #[serde(default = "default_min_window_size")]
    pub min_window_width: f64,
    #[serde(default = "default_min_window_size")]
    pub min_window_height: f64,
    /// Applications that are never tiled unless a `tile` rule says otherwise.
    #[serde(default = "default_ignored_apps")]
    pub ignored_apps: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Space between windows and the display edges
    #[serde(default)]
    pub outer: OuterGaps,
    /// Space between neighbouring windows
    #[serde(default)]
    pub inner: InnerGaps,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Gap between windows placed side by side
    #[serde(default)]
    pub horizontal: f64,
    /// Gap between windows stacked on top of each other
    #[serde(default)]
    pub vertical: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_tile: true,
            focus_follows_mouse: false,
            layout: LayoutSettings::default(),
            manage: ManageSettings::default(),
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            split_ratio: default_split_ratio(),
            insertion: InsertionPolicy::default(),
            resize_step: default_resize_step(),
            gaps: GapSettings::default(),
        }
    }
}

impl Default for ManageSettings {
    fn default() -> Self {
        Self {
            min_window_width: default_min_window_size(),
            min_window_height: default_min_window_size(),
            ignored_apps: default_ignored_apps(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.layout.validate());
        issues.extend(self.manage.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.layout.auto_fix_values() + self.manage.auto_fix_values()
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(MIN_RATIO..=MAX_RATIO).contains(&self.split_ratio) {
            issues.push(format!(
                "split_ratio must be between {MIN_RATIO} and {MAX_RATIO}, got {}",
                self.split_ratio
            ));
        }

        if !(self.resize_step > 0.0 && self.resize_step < 0.5) {
            issues.push(format!(
                "resize_step must be positive and below 0.5, got {}",
                self.resize_step
            ));
        }

        issues.extend(self.gaps.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(MIN_RATIO..=MAX_RATIO).contains(&self.split_ratio) {
            self.split_ratio = default_split_ratio();
            fixes += 1;
        }

        if !(self.resize_step > 0.0 && self.resize_step < 0.5) {
            self.resize_step = default_resize_step();
            fixes += 1;
        }

        fixes + self.gaps.auto_fix_values()
    }
}

impl ManageSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.min_window_width < 0.0 {
            issues.push(format!(
                "min_window_width must be non-negative, got {}",
                self.min_window_width
            ));
        }
        if self.min_window_height < 0.0 {
            issues.push(format!(
                "min_window_height must be non-negative, got {}",
                self.min_window_height
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.min_window_width < 0.0 {
            self.min_window_width = default_min_window_size();
            fixes += 1;
        }
        if self.min_window_height < 0.0 {
            self.min_window_height = default_min_window_size();
            fixes += 1;
        }
        fixes
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.outer.validate();
        issues.extend(self.inner.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.outer.auto_fix_values() + self.inner.auto_fix_values()
    }
}

fn negative_gap(issues: &mut Vec<String>, name: &str, value: f64) {
    if value < 0.0 {
        issues.push(format!("{name} gap must be non-negative, got {value}"));
    }
}

fn clamp_gap(value: &mut f64) -> usize {
    if *value < 0.0 {
        *value = 0.0;
        1
    } else {
        0
    }
}

impl OuterGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        negative_gap(&mut issues, "outer.top", self.top);
        negative_gap(&mut issues, "outer.left", self.left);
        negative_gap(&mut issues, "outer.bottom", self.bottom);
        negative_gap(&mut issues, "outer.right", self.right);
        issues
    }

    /// Negative gaps are reset to zero. Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        clamp_gap(&mut self.top)
            + clamp_gap(&mut self.left)
            + clamp_gap(&mut self.bottom)
            + clamp_gap(&mut self.right)
    }
}

impl InnerGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        negative_gap(&mut issues, "inner.horizontal", self.horizontal);
        negative_gap(&mut issues, "inner.vertical", self.vertical);
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        clamp_gap(&mut self.horizontal) + clamp_gap(&mut self.vertical)
    }
}

fn yes() -> bool { true }

fn default_split_ratio() -> f64 { 0.5 }

fn default_resize_step() -> f64 { 0.05 }

fn default_min_window_size() -> f64 { 100.0 }

fn default_ignored_apps() -> Vec<String> {
    ["WindowServer", "Dock", "Control Center", "Notification Center", "SystemUIServer"]
        .into_iter()
        .map(String::from)
        .collect()
}

const DEFAULT_CONFIG: &str = include_str!("../../pengwm.default.toml");

impl Default for Config {
    fn default() -> Self { Self::parse(DEFAULT_CONFIG).expect("bundled default config is valid") }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Self::default()) }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_creating_parent(path, &self.to_toml_string()?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        let config_file = ConfigFile {
            settings: self.settings.clone(),
            keys: self
                .keys
                .iter()
                .map(|(hotkey, command)| (hotkey.to_string(), command.clone()))
                .collect(),
            app_rules: self.app_rules.clone(),
        };

        Ok(toml::to_string_pretty(&config_file)?)
    }

    /// Writes the bundled default configuration, comments included.
    pub fn write_default(path: &Path) -> anyhow::Result<()> {
        write_creating_parent(path, DEFAULT_CONFIG)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        for rule in &self.app_rules {
            if rule.app_name.trim().is_empty() {
                issues.push("app rule has an empty app_name".to_string());
            }
        }

        issues
    }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = self.settings.auto_fix_values();

        let before = self.app_rules.len();
        self.app_rules.retain(|rule| !rule.app_name.trim().is_empty());
        fixes += before - self.app_rules.len();

        fixes
    }

    /// The rule for `app_name`. Later rules win over earlier ones.
    pub fn rule_for(&self, app_name: &str) -> Option<RuleKind> {
        self.app_rules.iter().rev().find(|r| r.app_name == app_name).map(|r| r.rule)
    }

    pub fn command_for(&self, hotkey: &Hotkey) -> Option<&WmCommand> {
        self.keys.iter().find(|(k, _)| k == hotkey).map(|(_, cmd)| cmd)
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        let mut keys = Vec::new();
        for (key, cmd) in c.keys {
            let hotkey = match Hotkey::from_str(&key) {
                Ok(hotkey) => hotkey,
                Err(e) => bail!("Could not parse hotkey `{key}`: {e}"),
            };
            keys.push((hotkey, cmd));
        }
        Ok(Config {
            settings: c.settings,
            keys,
            app_rules: c.app_rules,
        })
    }
}

fn write_creating_parent(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents.as_bytes())?;
    Ok(())
}
