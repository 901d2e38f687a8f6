use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::metric::MetricSet;

pub const INTERVAL_CHOICES: [u32; 3] = [1, 2, 5];

static DEFAULT_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|d| d.join("resmon").join("settings.json")));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    System,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub enabled_metrics: MetricSet,
    pub update_interval_seconds: u32,
    pub font_size: u32,
    pub width: u32,
    pub height: u32,
    pub bg_opacity: u8,
    pub text_opacity: u8,
    pub color_mode: ColorMode,
    pub window_position: (i32, i32),
    pub autostart_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_metrics: MetricSet::default(),
            update_interval_seconds: 2,
            font_size: 16,
            width: 300,
            height: 50,
            bg_opacity: 100,
            text_opacity: 100,
            color_mode: ColorMode::System,
            window_position: (100, 100),
            autostart_enabled: false,
        }
    }
}

impl Settings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.update_interval_seconds.max(1)))
    }

    /// Builds settings from a flat key-value map, substituting defaults per key.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let d = Settings::default();
        Self {
            enabled_metrics: read_key(map, "enabled_metrics").unwrap_or(d.enabled_metrics),
            update_interval_seconds: read_positive(map, "update_interval_seconds").unwrap_or(d.update_interval_seconds),
            font_size: read_positive(map, "font_size").unwrap_or(d.font_size),
            width: read_positive(map, "width").unwrap_or(d.width),
            height: read_positive(map, "height").unwrap_or(d.height),
            bg_opacity: read_opacity(map, "bg_opacity").unwrap_or(d.bg_opacity),
            text_opacity: read_opacity(map, "text_opacity").unwrap_or(d.text_opacity),
            color_mode: read_key(map, "color_mode").unwrap_or(d.color_mode),
            window_position: (
                read_key(map, "window_x").unwrap_or(d.window_position.0),
                read_key(map, "window_y").unwrap_or(d.window_position.1),
            ),
            autostart_enabled: read_key(map, "autostart_enabled").unwrap_or(d.autostart_enabled),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let v = json!({
            "enabled_metrics": self.enabled_metrics,
            "update_interval_seconds": self.update_interval_seconds,
            "font_size": self.font_size,
            "width": self.width,
            "height": self.height,
            "bg_opacity": self.bg_opacity,
            "text_opacity": self.text_opacity,
            "color_mode": self.color_mode,
            "window_x": self.window_position.0,
            "window_y": self.window_position.1,
            "autostart_enabled": self.autostart_enabled,
        });
        match v {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Restores the positivity and opacity invariants after a UI edit.
    pub fn validate(&mut self) {
        let d = Settings::default();
        let or_default = |v: u32, fallback: u32| match v {
            0 => fallback,
            v => v,
        };
        self.update_interval_seconds = or_default(self.update_interval_seconds, d.update_interval_seconds);
        self.font_size = or_default(self.font_size, d.font_size);
        self.width = or_default(self.width, d.width);
        self.height = or_default(self.height, d.height);
        self.bg_opacity = self.bg_opacity.min(100);
        self.text_opacity = self.text_opacity.min(100);
    }
}

fn read_key<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = map.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("settings: ignoring invalid value for {key} ({raw}): {e}");
            None
        }
    }
}

fn read_positive(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let v: i64 = read_key(map, key)?;
    match u32::try_from(v) {
        Ok(n) if n > 0 => Some(n),
        _ => {
            log::warn!("settings: {key} must be positive, got {v}");
            None
        }
    }
}

fn read_opacity(map: &Map<String, Value>, key: &str) -> Option<u8> {
    let v: i64 = read_key(map, key)?;
    Some(v.clamp(0, 100) as u8)
}

// ===================== Storage =====================

#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/resmon/settings.json`.
    pub fn default_location() -> Result<Self, SettingsError> {
        (*DEFAULT_PATH).clone().map(Self::new).ok_or(SettingsError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<Settings, SettingsError> {
        let data = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SettingsError::Missing { path: self.path.clone() },
            _ => SettingsError::Load { path: self.path.clone(), reason: e.to_string() },
        })?;
        let value: Value = serde_json::from_str(&data)
            .map_err(|e| SettingsError::Load { path: self.path.clone(), reason: e.to_string() })?;
        match value {
            Value::Object(map) => Ok(Settings::from_map(&map)),
            other => Err(SettingsError::Load {
                path: self.path.clone(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Loads settings, falling back to defaults on any error.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(s) => s,
            Err(e) if e.is_missing_file() => {
                log::info!("{e}, using defaults");
                Settings::default()
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.write_atomic(settings).map_err(|source| SettingsError::Save { path: self.path.clone(), source })
    }

    fn write_atomic(&self, settings: &Settings) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(&Value::Object(settings.to_map()))?;
        let tmp = self.temp_path();
        let written = (|| {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&body)?;
            f.sync_all()
        })();
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        log::debug!("settings saved to {:?}", self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
