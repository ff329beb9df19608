use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_NAME: &str = "academic_contacts";

/// Runtime configuration, loaded once at startup and passed explicitly to
/// whatever needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    /// Contact file opened or saved most recently; empty when none.
    pub old_path: String,
    pub ui: UiConfig,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub fn parse(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Config {
    /// Path of the last contact file, if one is remembered.
    pub fn last_file(&self) -> Option<PathBuf> {
        let trimmed = self.old_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    /// Record `path` as the last contact file and persist the config.
    pub fn remember(&mut self, path: &Path) -> Result<()> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("unable to determine current directory")?
                .join(path)
        };
        self.old_path = absolute.to_string_lossy().into_owned();
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        save(&self.config_path, &ConfigFile::from(self))
    }
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub old_path: String,
    pub ui: UiFile,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UiFile {
    pub colors: UiColorsFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiColorsFile {
    pub border: String,
    pub selection_bg: String,
    pub selection_fg: String,
    pub separator: String,
    pub status_fg: String,
    pub status_bg: String,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: "#6272a4".into(),
            selection_bg: "#44475a".into(),
            selection_fg: "#f8f8f2".into(),
            separator: "#8be9fd".into(),
            status_fg: "#282a36".into(),
            status_bg: "#bd93f9".into(),
        }
    }
}

impl UiColorsFile {
    fn into_colors(self) -> Result<UiColors> {
        let defaults = UiColorsFile::default();
        let pick = |name: &str, raw: &str, fallback: &str| -> Result<RgbColor> {
            RgbColor::parse(raw)
                .or_else(|| {
                    log::warn!("invalid color '{}' for ui.colors.{}, using default", raw, name);
                    RgbColor::parse(fallback)
                })
                .ok_or_else(|| anyhow!("invalid default color for ui.colors.{}", name))
        };
        Ok(UiColors {
            border: pick("border", &self.border, &defaults.border)?,
            selection_bg: pick("selection_bg", &self.selection_bg, &defaults.selection_bg)?,
            selection_fg: pick("selection_fg", &self.selection_fg, &defaults.selection_fg)?,
            separator: pick("separator", &self.separator, &defaults.separator)?,
            status_fg: pick("status_fg", &self.status_fg, &defaults.status_fg)?,
            status_bg: pick("status_bg", &self.status_bg, &defaults.status_bg)?,
        })
    }
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        let colors = &config.ui.colors;
        Self {
            old_path: config.old_path.clone(),
            ui: UiFile {
                colors: UiColorsFile {
                    border: colors.border.to_hex(),
                    selection_bg: colors.selection_bg.to_hex(),
                    selection_fg: colors.selection_fg.to_hex(),
                    separator: colors.separator.to_hex(),
                    status_fg: colors.status_fg.to_hex(),
                    status_bg: colors.status_bg.to_hex(),
                },
            },
        }
    }
}

// =============================================================================
// Loading and saving
// =============================================================================

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    let dir = base.config_dir().join(APP_NAME);
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load the configuration at `path`, or the per-user default location.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    load_or_init(&path, &ConfigFile::default())
}

/// Load the config file at `path`, writing `defaults` there first if it does
/// not exist. Keys missing from the file take their value from `defaults`.
pub fn load_or_init(path: &Path, defaults: &ConfigFile) -> Result<Config> {
    if !path.exists() {
        log::info!("creating default configuration at {}", path.display());
        save(path, defaults)?;
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))?;

    let Value::Object(table) = value else {
        bail!("configuration at {} must be a JSON object", path.display());
    };

    warn_unknown_keys(&table);

    let default_value = serde_json::to_value(defaults)
        .context("failed to serialize default configuration")?;
    let merged = merge_defaults(default_value, Value::Object(table));

    let cfg_file: ConfigFile = serde_json::from_value(merged)
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    Ok(Config {
        config_path: path.to_path_buf(),
        old_path: cfg_file.old_path,
        ui: UiConfig {
            colors: cfg_file.ui.colors.into_colors()?,
        },
    })
}

pub fn save(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create config dir: {}", dir.display()))?;
        }
    }
    let text = serde_json::to_string_pretty(config).context("failed to serialize configuration")?;
    fs::write(path, text)
        .with_context(|| format!("failed to write configuration file at {}", path.display()))?;
    Ok(())
}

/// Overlay `value` on `defaults`, recursing into nested objects.
fn merge_defaults(defaults: Value, value: Value) -> Value {
    match (defaults, value) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, entry) in overlay {
                let merged = match base.remove(&key) {
                    Some(default_entry) => merge_defaults(default_entry, entry),
                    None => entry,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, value) => value,
    }
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(table: &Map<String, Value>) {
    let known = HashSet::from(["old_path", "ui"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            log::warn!("unknown configuration key '{}' ignored", key);
        }
    }

    let Some(Value::Object(ui)) = table.get("ui") else {
        return;
    };
    for key in ui.keys() {
        if key != "colors" {
            log::warn!("unknown configuration key 'ui.{}' ignored", key);
        }
    }
}

/// Expand ~ to home directory in paths
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
