use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;
use crate::paths;

/// File name of the persisted configuration inside the install directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Color scheme of the launcher window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Green,
}

impl Theme {
    /// All themes in menu order.
    pub const ALL: [Theme; 3] = [Theme::Default, Theme::Dark, Theme::Green];

    /// Display name, also used as the persisted value.
    pub fn label(self) -> &'static str {
        match self {
            Theme::Default => "默认主题",
            Theme::Dark => "黑色主题",
            Theme::Green => "绿色主题",
        }
    }

    /// Parse a display name. Unknown names yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Whether the weather panel should switch to its dark palette.
    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Dark)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything unrecognised, including non-strings, falls back to the default.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(Theme::from_label).unwrap_or_default())
    }
}

/// A user-registered launch target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    /// Display name, derived from the file name by default
    pub name: String,

    /// Absolute path to the executable
    pub path: String,
}

impl ProgramEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build an entry named after the executable's file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = path.to_string_lossy().into_owned();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| text.clone());
        Self { name, path: text }
    }

    /// Re-check the executable on disk.
    pub fn exists(&self) -> bool {
        Path::new(&self.path).exists()
    }
}

/// The single persisted application state document.
///
/// Every field has a default so a document missing any key still loads.
/// Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub theme: Theme,

    /// Registered programs in display order
    #[serde(deserialize_with = "null_as_default")]
    pub programs: Vec<ProgramEntry>,

    #[serde(deserialize_with = "null_as_default")]
    pub weather_visible: bool,

    pub weather_api_key: Option<String>,
}

impl AppConfig {
    /// Entries whose executable currently exists, with their index in `programs`.
    ///
    /// Missing entries stay in `programs` so a temporarily absent drive does
    /// not lose them on the next save.
    pub fn visible_programs(&self) -> impl Iterator<Item = (usize, &ProgramEntry)> {
        self.programs
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.exists())
    }

    /// The weather credential, if one is set and not blank.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads and writes [`AppConfig`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<install dir>/config.json`.
    ///
    /// # Errors
    /// Fails only when the install directory cannot be determined.
    pub fn at_default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(paths::install_dir()?.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, reporting why it could not be read.
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`], [`ConfigError::Read`] or
    /// [`ConfigError::Parse`].
    pub fn try_load(&self) -> Result<AppConfig, ConfigError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(self.path.clone())
            } else {
                ConfigError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        Ok(serde_json::from_str(&contents)?)
    }

    /// Load the document, falling back to defaults on any failure.
    pub fn load(&self) -> AppConfig {
        match self.try_load() {
            Ok(config) => {
                tracing::debug!(
                    "Loaded config from {} ({} programs)",
                    self.path.display(),
                    config.programs.len()
                );
                config
            }
            Err(ConfigError::NotFound(path)) => {
                tracing::info!("No config at {}, using defaults", path.display());
                AppConfig::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                AppConfig::default()
            }
        }
    }

    /// Write the whole document via a temp file and rename.
    ///
    /// # Errors
    /// Returns [`ConfigError::Write`] on any I/O failure, or
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn try_save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents = serde_json::to_string_pretty(config)?;
        let tmp_path = self.temp_path();

        let result = File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(contents.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        Ok(())
    }

    /// Write the whole document. Returns `false` on failure.
    pub fn save(&self, config: &AppConfig) -> bool {
        match self.try_save(config) {
            Ok(()) => {
                tracing::debug!("Saved config to {}", self.path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save config: {}", e);
                false
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CONFIG_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
