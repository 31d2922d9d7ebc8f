use std::{future::Future, path::{Path, PathBuf}, sync::{atomic::{AtomicUsize, Ordering}, Arc}};

use bridge::{message::PrepareStage, progress::ProgressTracker};
use schema::{assets_index::{is_valid_object_hash, AssetsIndex}, version::MinecraftVersion, version_manifest::MinecraftVersionManifest};
use serde::de::DeserializeOwned;
use ustr::Ustr;

use crate::{archive, download::{DownloadError, Validation}, installer::Installer, mirrors::{CandidateList, Resource}, IoOrSerializationError};

/// Concurrent asset-object transfers.
pub const ASSET_WORKERS: usize = 12;
/// How many times a corrupt descriptor or index is deleted and fetched again before giving up.
pub const PARSE_RETRY_LIMIT: usize = 1;

#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: IoOrSerializationError,
    },
    #[error("Version {0} is not listed in the version manifest")]
    NotInManifest(Ustr),
    #[error("Invalid asset hash {0:?}")]
    InvalidAssetHash(Ustr),
    #[error("Invalid version id {0:?}")]
    InvalidVersionId(Ustr),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Files backing one resolved version.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub descriptor: Arc<MinecraftVersion>,
    pub descriptor_path: PathBuf,
    pub client_jar: PathBuf,
    pub assets_id: Ustr,
    pub asset_index_path: PathBuf,
    pub asset_objects: usize,
}

impl Installer {
    /// Ensures the descriptor, client jar, asset index and every asset object of `version` exist.
    pub async fn ensure_version(&self, version: Ustr) -> Result<ResolvedVersion, VersionError> {
        if !crate::path_is_normal(version.as_str()) || version.contains(['/', '\\']) {
            return Err(VersionError::InvalidVersionId(version));
        }

        let version_dir = self.directories.version_dir(&version);
        crate::ensure_dir(&version_dir)?;

        let descriptor_path = self.directories.version_json(&version);
        let client_jar = self.directories.client_jar(&version);
        for path in [&descriptor_path, &client_jar] {
            if path.is_dir() {
                tokio::fs::remove_dir_all(path).await?;
            }
        }

        self.enter_stage(PrepareStage::VersionDescriptor);
        let descriptor: MinecraftVersion = load_or_refetch(&descriptor_path, || self.fetch_descriptor(version, &descriptor_path)).await?;
        let descriptor = Arc::new(descriptor);

        self.ensure_client_jar(&descriptor, &client_jar).await?;

        let assets_id = descriptor.assets_id();
        if !is_valid_file_stem(&assets_id) {
            return Err(VersionError::InvalidVersionId(assets_id));
        }
        let asset_index_path = self.directories.asset_index(&assets_id);
        self.enter_stage(PrepareStage::AssetIndex);
        let index: AssetsIndex = load_or_refetch(&asset_index_path, || self.fetch_asset_index(&descriptor, assets_id, &asset_index_path)).await?;

        let asset_objects = self.ensure_asset_objects(&index).await?;

        Ok(ResolvedVersion {
            descriptor,
            descriptor_path,
            client_jar,
            assets_id,
            asset_index_path,
            asset_objects,
        })
    }

    async fn fetch_descriptor(&self, version: Ustr, dest: &Path) -> Result<(), VersionError> {
        let label = format!("version descriptor {version}");
        let direct = self.mirrors.resolve(Resource::VersionJson { version: &version });
        let direct_error = match self.downloader.fetch_any(&direct, dest, &label, Validation::None).await {
            Ok(()) => {
                log::info!("Downloaded version descriptor {version}");
                return Ok(());
            },
            Err(error) => error,
        };

        log::warn!("{direct_error}, falling back to the version manifest");
        let url = match self.find_in_manifest(version).await {
            Ok(url) => url,
            Err(manifest_error) => {
                log::warn!("Version manifest lookup failed: {manifest_error}");
                return Err(direct_error.into());
            },
        };

        let mut candidates = CandidateList::default();
        candidates.push(url);
        candidates.extend(direct);
        self.downloader.fetch_any(&candidates.into_vec(), dest, &label, Validation::None).await?;
        log::info!("Downloaded version descriptor {version} through the version manifest");
        Ok(())
    }

    /// Looks `version` up in the cached manifest, refreshing the cache if it is absent,
    /// unreadable or does not list the version.
    async fn find_in_manifest(&self, version: Ustr) -> Result<Ustr, VersionError> {
        let path = &self.directories.manifest_cache;
        if let Ok(manifest) = crate::read_json::<MinecraftVersionManifest>(path) {
            if let Some(link) = manifest.find(&version) {
                return Ok(link.url);
            }
        }

        let urls = self.mirrors.resolve(Resource::Manifest);
        self.downloader.fetch_any(&urls, path, "version manifest", Validation::None).await?;
        let manifest: MinecraftVersionManifest = crate::read_json(path)
            .map_err(|source| VersionError::Corrupt { path: path.clone(), source })?;

        manifest.find(&version)
            .map(|link| link.url)
            .ok_or(VersionError::NotInManifest(version))
    }

    async fn ensure_client_jar(&self, descriptor: &MinecraftVersion, dest: &Path) -> Result<(), VersionError> {
        if archive::check_resident(dest, &[]).await {
            return Ok(());
        }
        let tracker = ProgressTracker::new(PrepareStage::ClientJar, self.sender.clone());
        tracker.set_total(1);

        let mut candidates = CandidateList::default();
        let client = descriptor.client_download();
        if let Some(client) = client {
            candidates.push(client.url);
        }
        candidates.extend(self.mirrors.resolve(Resource::ClientJar { version: &descriptor.id }));

        let label = format!("client jar {}", descriptor.id);
        let result = self.downloader.fetch_any(&candidates.into_vec(), dest, &label, Validation::Archive(&[])).await;
        tracker.set_finished(result.is_err());
        result?;

        log::info!("Downloaded client jar {}", descriptor.id);
        tracker.complete_item(label, true);
        Ok(())
    }

    async fn fetch_asset_index(&self, descriptor: &MinecraftVersion, assets_id: Ustr, dest: &Path) -> Result<(), VersionError> {
        let mut candidates = CandidateList::default();
        if let Some(link) = &descriptor.asset_index {
            candidates.push(link.url);
        }
        candidates.extend(self.mirrors.resolve(Resource::AssetIndex { id: &assets_id }));

        let label = format!("asset index {assets_id}");
        self.downloader.fetch_any(&candidates.into_vec(), dest, &label, Validation::None).await?;
        log::info!("Downloaded asset index {assets_id}");
        Ok(())
    }

    /// Fetches every missing object of `index` through a fixed pool of workers sharing one cursor.
    ///
    /// Returns the number of distinct objects. Present objects advance progress without a log line.
    pub async fn ensure_asset_objects(&self, index: &AssetsIndex) -> Result<usize, VersionError> {
        let hashes = index.unique_hashes();
        if let Some(invalid) = hashes.iter().find(|hash| !is_valid_object_hash(hash)) {
            return Err(VersionError::InvalidAssetHash(*invalid));
        }

        let tracker = ProgressTracker::new(PrepareStage::AssetObjects, self.sender.clone());
        tracker.set_total(hashes.len());

        let cursor = AtomicUsize::new(0);
        let workers = (0..ASSET_WORKERS.min(hashes.len())).map(|_| async {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(hash) = hashes.get(index) else {
                    return Ok::<(), VersionError>(());
                };
                let downloaded = self.ensure_asset_object(*hash).await?;
                let current = tracker.complete_item(hash.as_str(), downloaded);
                if downloaded {
                    log::info!("Downloaded asset {current}/{} {hash}", hashes.len());
                }
            }
        });

        let result = futures::future::try_join_all(workers).await;
        tracker.set_finished(result.is_err());
        result?;

        if tracker.downloaded() > 0 {
            log::info!("Downloaded {} of {} asset objects", tracker.downloaded(), hashes.len());
        }
        Ok(hashes.len())
    }

    /// Returns whether a transfer happened. Identical hashes share one file, so presence is enough.
    async fn ensure_asset_object(&self, hash: Ustr) -> Result<bool, VersionError> {
        let dest = self.directories.asset_object(&hash);
        if tokio::fs::metadata(&dest).await.is_ok_and(|metadata| metadata.is_file() && metadata.len() > 0) {
            return Ok(false);
        }

        let urls = self.mirrors.resolve(Resource::AssetObject { hash: &hash });
        let label = format!("asset {hash}");
        self.downloader.fetch_any(&urls, &dest, &label, Validation::sha1_hex(Some(&hash))).await?;
        Ok(true)
    }
}

/// Reads JSON at `path`, fetching it when absent. A file that does not parse is deleted
/// and fetched again up to [`PARSE_RETRY_LIMIT`] times.
pub(crate) async fn load_or_refetch<T, F, Fut>(path: &Path, mut fetch: F) -> Result<T, VersionError>
where
    T: DeserializeOwned + Send + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), VersionError>>,
{
    let mut retries = 0;
    loop {
        if !path.is_file() {
            fetch().await?;
        }

        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || crate::read_json::<T>(&owned)).await? {
            Ok(value) => return Ok(value),
            Err(source) if retries < PARSE_RETRY_LIMIT => {
                retries += 1;
                log::warn!("Discarding corrupt {path:?}: {source}");
                crate::remove_path(path)?;
            },
            Err(source) => {
                return Err(VersionError::Corrupt { path: path.to_path_buf(), source });
            },
        }
    }
}

fn is_valid_file_stem(id: &str) -> bool {
    !id.is_empty() && crate::path_is_normal(id) && !id.contains(['/', '\\'])
}
