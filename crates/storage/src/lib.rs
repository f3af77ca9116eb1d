use directories::ProjectDirs;
use doc_model::{InvalidAttribute, Preferences};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("invalid config value: {0}")]
    InvalidValue(#[from] InvalidAttribute),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u32,
    #[serde(default)]
    preferences: Preferences,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfAnnotator", "pdf-annotator")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Preferences from `config.json` under the root, or defaults when the
    /// file does not exist.
    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        load_from_path(&self.config_path())
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        save_to_path(&self.config_path(), preferences)
    }
}

/// Write a config envelope to an explicit path, creating parent directories.
pub fn save_to_path(path: &Path, preferences: &Preferences) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let envelope =
        ConfigEnvelope { version: CONFIG_SCHEMA_VERSION, preferences: preferences.clone() };

    let bytes = serde_json::to_vec_pretty(&envelope)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a config envelope from an explicit path.
pub fn load_from_path(path: &Path) -> Result<Preferences, StorageError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(Preferences::default());
    }

    let bytes = fs::read(path)?;
    let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version > CONFIG_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: envelope.version,
            supported: CONFIG_SCHEMA_VERSION,
        });
    }
    envelope.preferences.validate()?;

    debug!(path = %path.display(), "loaded config");
    Ok(envelope.preferences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Color, DrawingMode, ToolSettings};

    #[test]
    fn preferences_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let prefs = Preferences {
            tools: ToolSettings {
                mode: DrawingMode::Line,
                font_size: 18.0,
                line_thickness: 4.0,
                line_color: Color::rgb(0, 0, 255),
            },
            max_raster_pixels: 1_000_000,
            text_baseline: Some(20.0),
        };

        store.save_preferences(&prefs).expect("save should succeed");
        let loaded = store.load_preferences().expect("load should succeed");

        assert_eq!(loaded, prefs);
        assert!(store.config_path().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_preferences().expect("load should succeed");
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn save_to_path_creates_parent_directories() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("nested/dir/annotator.json");

        save_to_path(&path, &Preferences::default()).expect("save should succeed");
        let loaded = load_from_path(&path).expect("load should succeed");

        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"version": 99, "preferences": {}}"#).expect("write should succeed");

        let err = load_from_path(&path).expect_err("version 99 is unsupported");
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 99, supported: 1 }));
    }

    #[test]
    fn zero_font_size_is_rejected_on_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"version": 1, "preferences": {"tools": {"font_size": 0}}}"#)
            .expect("write should succeed");

        let err = load_from_path(&path).expect_err("font size 0 is invalid");
        assert!(matches!(err, StorageError::InvalidValue(ref attr) if attr.field == "font_size"));
    }

    #[test]
    fn malformed_config_is_a_serde_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, "not json").expect("write should succeed");

        assert!(matches!(load_from_path(&path), Err(StorageError::Serde(_))));
    }
}
