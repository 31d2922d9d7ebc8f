use std::{path::PathBuf, sync::{atomic::{AtomicUsize, Ordering}, Arc}};

use bridge::message::PrepareStage;
use futures::{future::{BoxFuture, Shared}, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use ustr::Ustr;

use crate::{
    bundle::BundleReport, config, installer::Installer, libraries::{LibraryError, LibraryReport}, loader::LoaderError,
    migration, readiness::{self, RequiredArtifacts}, sweep, version::VersionError,
};

#[derive(thiserror::Error, Debug)]
pub enum PrepareError {
    #[error("Failed to create folders: {0}")]
    Folders(std::io::Error),
    #[error("Failed to resolve game files: {0}")]
    Version(#[from] VersionError),
    #[error("Failed to resolve libraries: {0}")]
    Libraries(#[from] LibraryError),
    #[error("Failed to resolve loader installer: {0}")]
    Loader(#[from] LoaderError),
    #[error("Preparation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a preparation run targets.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub minecraft_version: Ustr,
    pub forge_version: Ustr,
    pub bundle_url: Option<Arc<str>>,
    pub bundled_archive: Option<PathBuf>,
    pub legacy_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreparedPaths {
    pub root: PathBuf,
    pub version_json: PathBuf,
    pub client_jar: PathBuf,
    pub asset_index: PathBuf,
    pub assets_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub loader_installer: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PrepareSummary {
    pub migrated: usize,
    pub bundled: Option<usize>,
    pub bundle: Option<BundleReport>,
    pub asset_objects: usize,
    pub libraries: LibraryReport,
    pub swept: usize,
}

/// Result of one preparation run, shared by every caller that joined it.
///
/// `summary` is `None` when the readiness check made a full run unnecessary.
#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    pub paths: PreparedPaths,
    pub result: Result<Option<PrepareSummary>, Arc<PrepareError>>,
}

impl PrepareOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn to_json(&self) -> serde_json::Value {
        match &self.result {
            Ok(summary) => serde_json::json!({
                "ok": true,
                "paths": self.paths,
                "summary": summary,
            }),
            Err(error) => serde_json::json!({
                "ok": false,
                "paths": self.paths,
                "error": error.to_string(),
            }),
        }
    }
}

type SharedRun = Shared<BoxFuture<'static, PrepareOutcome>>;

/// Runs the whole acquisition sequence. Concurrent callers join the run in flight.
#[derive(Clone)]
pub struct Preparer {
    inner: Arc<PreparerInner>,
}

struct PreparerInner {
    installer: Installer,
    options: PrepareOptions,
    current: Mutex<Option<SharedRun>>,
    runs: AtomicUsize,
}

impl Preparer {
    pub fn new(installer: Installer, options: PrepareOptions) -> Self {
        Self {
            inner: Arc::new(PreparerInner {
                installer,
                options,
                current: Mutex::new(None),
                runs: AtomicUsize::new(0),
            }),
        }
    }

    pub fn options(&self) -> &PrepareOptions {
        &self.inner.options
    }

    /// Number of runs actually started, joined calls excluded.
    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        let options = &self.inner.options;
        readiness::is_ready(&self.inner.installer.directories, options.minecraft_version, options.forge_version)
    }

    /// Skips the full run when every required artifact is already present.
    pub async fn prepare_game(&self) -> PrepareOutcome {
        if self.is_ready() {
            log::debug!("Game files already present, skipping preparation");
            return PrepareOutcome {
                paths: self.inner.paths(),
                result: Ok(None),
            };
        }
        self.ensure_all().await
    }

    /// Starts a run, or joins the one already in flight.
    pub async fn ensure_all(&self) -> PrepareOutcome {
        let run = {
            let mut current = self.inner.current.lock();
            match &*current {
                Some(run) => {
                    log::debug!("Joining preparation already in flight");
                    run.clone()
                },
                None => {
                    let run = self.inner.start();
                    *current = Some(run.clone());
                    run
                },
            }
        };
        run.await
    }
}

impl PreparerInner {
    /// Must be called with `current` locked: the run clears it on completion, which cannot
    /// happen before the caller has stored the handle.
    fn start(self: &Arc<Self>) -> SharedRun {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = inner.run().await;
            *inner.current.lock() = None;
            outcome
        });

        let inner = Arc::clone(self);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    *inner.current.lock() = None;
                    PrepareOutcome {
                        paths: inner.paths(),
                        result: Err(Arc::new(PrepareError::Join(error))),
                    }
                },
            }
        }.boxed().shared()
    }

    fn paths(&self) -> PreparedPaths {
        let directories = &self.installer.directories;
        let required = RequiredArtifacts::resolve(directories, self.options.minecraft_version, self.options.forge_version);
        PreparedPaths {
            root: directories.root.clone(),
            version_json: required.version_json,
            client_jar: required.client_jar,
            asset_index: required.asset_index,
            assets_dir: directories.assets_root_dir.clone(),
            libraries_dir: directories.libraries_dir.clone(),
            mods_dir: directories.mods_dir.clone(),
            loader_installer: required.loader_installer,
        }
    }

    async fn run(&self) -> PrepareOutcome {
        let result = self.run_steps().await;
        match &result {
            Ok(_) => {
                log::info!("Game files are ready");
                self.installer.enter_stage(PrepareStage::Finished);
            },
            Err(error) => {
                log::error!("Preparation failed: {error}");
                self.installer.sender.send_error(format!("Preparation failed: {error}"));
            },
        }
        PrepareOutcome {
            paths: self.paths(),
            result: result.map(Some).map_err(Arc::new),
        }
    }

    async fn run_steps(&self) -> Result<PrepareSummary, PrepareError> {
        let installer = &self.installer;
        let directories = &installer.directories;
        let options = &self.options;

        installer.enter_stage(PrepareStage::Folders);
        directories.create_all().map_err(PrepareError::Folders)?;

        installer.enter_stage(PrepareStage::Migration);
        let migrated = self.migrate().await;

        if let Err(error) = config::scaffold_options(&directories.options_txt) {
            log::warn!("Unable to create {:?}: {error}", directories.options_txt);
        }
        if let Err(error) = config::scaffold_mirrors(&directories.mirrors_json) {
            log::warn!("Unable to create {:?}: {error}", directories.mirrors_json);
        }

        let bundled = match &options.bundled_archive {
            Some(archive) => installer.import_bundled_archive(archive).await,
            None => None,
        };
        let bundle = match &options.bundle_url {
            Some(url) => installer.sync_bundle(url, false).await,
            None => None,
        };

        let version = installer.ensure_version(options.minecraft_version).await?;
        let libraries = installer.ensure_libraries(&version.descriptor).await?;
        installer.ensure_loader_installer(&options.minecraft_version, &options.forge_version).await?;

        installer.enter_stage(PrepareStage::Sweep);
        let swept = sweep::sweep_in_background(directories.libraries_dir.clone()).await;

        Ok(PrepareSummary {
            migrated,
            bundled,
            bundle,
            asset_objects: version.asset_objects,
            libraries,
            swept,
        })
    }

    async fn migrate(&self) -> usize {
        let legacy_roots = self.options.legacy_roots.clone();
        if legacy_roots.is_empty() {
            return 0;
        }
        let root = self.installer.directories.root.clone();
        match tokio::task::spawn_blocking(move || migration::migrate_legacy_layouts(&legacy_roots, &root)).await {
            Ok(Ok(moved)) => moved,
            Ok(Err(error)) => {
                log::warn!("Legacy migration failed: {error}");
                0
            },
            Err(error) => {
                log::warn!("Legacy migration task failed: {error}");
                0
            },
        }
    }
}
