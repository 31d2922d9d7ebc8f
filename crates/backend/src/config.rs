use std::path::Path;

use schema::{mirrors::MirrorOverrides, settings::LauncherSettings};

use crate::IoOrSerializationError;

pub const OPTIONS_SCAFFOLD: &str = "# Eminium user options\n";

/// Reads `launcher.json`. A missing file yields defaults; an unreadable one is logged and ignored.
pub fn load_settings(path: &Path) -> LauncherSettings {
    if !path.exists() {
        return LauncherSettings::default();
    }
    match crate::read_json(path) {
        Ok(settings) => settings,
        Err(error) => {
            log::warn!("Ignoring unreadable settings {path:?}: {error}");
            LauncherSettings::default()
        },
    }
}

pub fn save_settings(path: &Path, settings: &LauncherSettings) -> Result<(), IoOrSerializationError> {
    crate::write_json(path, settings)
}

/// Creates `options.txt` if it does not exist. Returns whether it was created.
pub fn scaffold_options(path: &Path) -> std::io::Result<bool> {
    if path.is_file() {
        return Ok(false);
    }
    crate::remove_path(path)?;
    crate::write_safe(path, OPTIONS_SCAFFOLD)?;
    Ok(true)
}

/// Writes an empty `mirrors.json` template if none exists. Returns whether it was created.
pub fn scaffold_mirrors(path: &Path) -> Result<bool, IoOrSerializationError> {
    if path.is_file() {
        return Ok(false);
    }
    crate::remove_path(path)?;
    crate::write_json(path, &MirrorOverrides::default())?;
    Ok(true)
}
