use std::path::PathBuf;

use schema::version::MinecraftVersion;
use ustr::Ustr;

use crate::directories::LauncherDirectories;

/// Top-level artifacts whose presence means a preparation run can be skipped.
#[derive(Debug, Clone)]
pub struct RequiredArtifacts {
    pub version_json: PathBuf,
    pub client_jar: PathBuf,
    pub asset_index: PathBuf,
    pub loader_installer: PathBuf,
}

impl RequiredArtifacts {
    /// Reads the asset id from the local descriptor when it parses, otherwise assumes the version id.
    pub fn resolve(directories: &LauncherDirectories, minecraft: Ustr, forge: Ustr) -> Self {
        let version_json = directories.version_json(&minecraft);
        let assets_id = crate::read_json::<MinecraftVersion>(&version_json)
            .map(|descriptor| descriptor.assets_id())
            .unwrap_or(minecraft);

        Self {
            client_jar: directories.client_jar(&minecraft),
            asset_index: directories.asset_index(&assets_id),
            loader_installer: directories.loader_installer(&minecraft, &forge),
            version_json,
        }
    }

    pub fn paths(&self) -> [&PathBuf; 4] {
        [&self.version_json, &self.client_jar, &self.asset_index, &self.loader_installer]
    }

    pub fn missing(&self) -> Vec<&PathBuf> {
        self.paths().into_iter().filter(|path| !path.is_file()).collect()
    }
}

/// Read-only check that every required top-level artifact exists.
pub fn is_ready(directories: &LauncherDirectories, minecraft: Ustr, forge: Ustr) -> bool {
    RequiredArtifacts::resolve(directories, minecraft, forge).missing().is_empty()
}
