//! JSON file persistence for [`RegistryStore`](pp_core::RegistryStore).

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pp_core::{Settings, SettingsBackend, StoreError};

use crate::normalize::normalize_settings;
use crate::parser::parse_settings;

/// Settings stored as one pretty-printed JSON document.
///
/// Loading goes through the tolerant parser and the normalizer, so older
/// documents are upgraded on read. Writes replace the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("settings.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SettingsBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let parsed = parse_settings(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut settings = parsed.settings;
        let stats = normalize_settings(&mut settings);
        log::debug!(
            "Loaded {} ({:?}): {} sites, {} added, {} repaired",
            self.path.display(),
            parsed.format,
            stats.sites,
            stats.sites_added,
            stats.repaired_sites
        );

        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let json = to_json(settings).map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Serialize settings the way they are stored on disk.
pub fn to_json(settings: &Settings) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(settings)
}
