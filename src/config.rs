//! Run configuration: built-in defaults, an optional TOML/YAML file, and
//! command-line overrides, merged field by field.

use crate::error::SyncError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FILE: &str = "README.md";
pub const DEFAULT_DELIMITER: &str = "[comment]: <> (usage)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything one run of the updater needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The document to update.
    pub file: PathBuf,
    /// The sentinel line bounding the usage block.
    pub delimiter: String,
    /// Optional step run before `command`, e.g. `cargo build`.
    pub build: Option<Vec<String>>,
    /// The command whose output is embedded, e.g. `./target/debug/tool --help`.
    pub command: Vec<String>,
    /// Where `build` and `command` run. Defaults to the document's directory.
    pub working_dir: Option<PathBuf>,
    /// Upper bound on each command's run time.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
            delimiter: DEFAULT_DELIMITER.to_string(),
            build: None,
            command: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Builds a config with default settings around `command`.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    /// Applies `layers` on top of the defaults; later layers win.
    pub fn from_layers<I>(layers: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let mut config = Self::default();
        for layer in layers {
            layer.apply_to(&mut config);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.command.is_empty() {
            return Err(SyncError::EmptyCommand);
        }
        if self.delimiter.trim().is_empty() {
            return Err(SyncError::EmptyDelimiter);
        }
        if self.timeout.is_zero() {
            return Err(SyncError::ZeroTimeout);
        }
        Ok(())
    }

    /// The directory commands run in.
    pub fn resolved_working_dir(&self) -> &Path {
        if let Some(dir) = &self.working_dir {
            return dir;
        }
        match self.file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension, defaulting to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

/// A partial configuration. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub build: Option<Vec<String>>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl ConfigLayer {
    /// Reads a config file. Relative paths inside it are taken relative to the
    /// file's own directory.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = fs::read_to_string(path).map_err(|source| SyncError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut layer = Self::parse(&text, ConfigFormat::from_path(path)).map_err(|message| {
            SyncError::ConfigParse {
                path: path.to_path_buf(),
                message,
            }
        })?;

        if let Some(base) = path.parent() {
            layer.file = layer.file.map(|file| base.join(file));
            layer.working_dir = layer.working_dir.map(|dir| base.join(dir));
        }

        log::debug!("Loaded config from {}", path.display());
        Ok(layer)
    }

    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => {
                // An empty YAML document deserializes to unit, not to a map.
                if text.trim().is_empty() {
                    return Ok(Self::default());
                }
                serde_yaml::from_str(text).map_err(|e| e.to_string())
            }
        }
    }

    fn apply_to(self, config: &mut Config) {
        if let Some(file) = self.file {
            config.file = file;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(build) = self.build {
            // An empty list switches a configured build step off.
            config.build = Some(build).filter(|build| !build.is_empty());
        }
        if let Some(command) = self.command {
            config.command = command;
        }
        if let Some(dir) = self.working_dir {
            config.working_dir = Some(dir);
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
    }
}
