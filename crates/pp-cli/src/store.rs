use std::path::Path;

use pp_core::{Applied, RegistryError, RegistryStore, Settings, SettingsBackend};
use pp_settings::JsonFileBackend;

/// Open the store on a settings file.
///
/// Unlike `RegistryStore::open`, an unreadable file is an error here: the
/// next mutation would otherwise overwrite it with the defaults.
pub fn open_store(path: &Path) -> Result<RegistryStore, String> {
    let backend = JsonFileBackend::new(path);
    let settings = match backend.load() {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            log::info!("'{}' does not exist, starting from defaults", path.display());
            Settings::defaults()
        }
        Err(e) => return Err(format!("Failed to load '{}': {}", path.display(), e)),
    };
    Ok(RegistryStore::with_settings(settings, Box::new(backend)))
}

/// Turn a mutation outcome into a CLI result; an unsaved change is a failure.
pub fn finish(path: &Path, result: Result<Applied, RegistryError>) -> Result<Applied, String> {
    let applied = result.map_err(|e| format!("{} [{}]", e, e.code()))?;
    match applied.save_error {
        Some(ref e) => Err(format!("Failed to write '{}': {}", path.display(), e)),
        None => Ok(applied),
    }
}
