use std::path::PathBuf;

use bridge::{message::PrepareStage, progress::ProgressTracker};

use crate::{archive, download::{DownloadError, Validation}, installer::Installer, mirrors::Resource};

/// Entries a usable Forge installer always carries.
pub const INSTALLER_REQUIRED_ENTRIES: &[&str] = &["data/client.lzma", "install_profile.json"];
/// Cached installers at or below this size are never trusted.
pub const INSTALLER_MIN_CACHED_SIZE: u64 = 100 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Installer {
    /// Returns the cached installer for `minecraft`/`forge`, fetching it when absent or invalid.
    pub async fn ensure_loader_installer(&self, minecraft: &str, forge: &str) -> Result<PathBuf, LoaderError> {
        crate::ensure_dir(&self.directories.cache_dir)?;
        let dest = self.directories.loader_installer(minecraft, forge);

        if is_cached_installer_valid(&dest).await {
            return Ok(dest);
        }
        if dest.exists() {
            log::warn!("Discarding invalid loader installer {dest:?}");
            crate::remove_path(&dest)?;
        }

        let tracker = ProgressTracker::new(PrepareStage::LoaderInstaller, self.sender.clone());
        tracker.set_total(1);

        let label = format!("forge installer {minecraft}-{forge}");
        let urls = self.mirrors.resolve(Resource::LoaderInstaller { minecraft, loader: forge });
        let result = self.downloader.fetch_any(&urls, &dest, &label, Validation::Archive(INSTALLER_REQUIRED_ENTRIES)).await;
        tracker.set_finished(result.is_err());
        result?;

        tracker.complete_item(label, true);
        log::info!("Downloaded forge installer {minecraft}-{forge}");
        Ok(dest)
    }
}

pub async fn is_cached_installer_valid(path: &std::path::Path) -> bool {
    let large_enough = tokio::fs::metadata(path).await
        .is_ok_and(|metadata| metadata.is_file() && metadata.len() > INSTALLER_MIN_CACHED_SIZE);
    large_enough && archive::check_resident(path, INSTALLER_REQUIRED_ENTRIES).await
}
