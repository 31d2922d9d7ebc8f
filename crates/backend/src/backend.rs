use std::{path::PathBuf, sync::Arc, time::Duration};

use auth::{authenticator::{AuthError, PlatformClient}, constants::USER_AGENT, status::{PlatformError, ServerStatus}};
use bridge::{handle::FrontendHandle, message::MessageToFrontend};
use reqwest::redirect::Policy;
use schema::{launch::LaunchConfiguration, profile::UserProfile, settings::LauncherSettings};

use crate::{
    account::ProfileStore, bundle::{BundleError, BundleReport}, config, directories::LauncherDirectories,
    download::{Downloader, CONNECT_TIMEOUT, REQUEST_TIMEOUT}, installer::Installer, java,
    launch::{self, LaunchError}, mirrors::MirrorResolver, prepare::{PrepareOptions, Preparer}, sweep,
};

const MAX_REDIRECTS: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Unable to determine a data directory, set {} explicitly", LauncherDirectories::ROOT_ENV)]
    NoDataDirectory,
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Overrides `$EMINIUM_HOME` and the platform default.
    pub root: Option<PathBuf>,
    /// Bundled archive imported on every run. Defaults to `<exe dir>/assets/core/modpack.zip`.
    pub bundled_archive: Option<PathBuf>,
    /// Skips the migration of older layouts.
    pub skip_migration: bool,
}

pub fn create_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        // Mirrors and archive hosts answer with redirects
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
}

fn default_bundled_archive() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("assets").join("core").join("modpack.zip"))
}

/// Owns the long-lived launcher services and the settings they were built from.
pub struct Backend {
    directories: Arc<LauncherDirectories>,
    settings: LauncherSettings,
    installer: Installer,
    preparer: Preparer,
    platform: PlatformClient,
    profiles: ProfileStore,
    sender: FrontendHandle,
}

impl Backend {
    pub fn new(options: BackendOptions, sender: FrontendHandle) -> Result<Self, BackendError> {
        let root = options.root
            .or_else(LauncherDirectories::default_root)
            .ok_or(BackendError::NoDataDirectory)?;
        let directories = Arc::new(LauncherDirectories::new(root));
        log::debug!("Using launcher root {:?}", directories.root);

        let settings = config::load_settings(&directories.settings_json);
        let http_client = create_http_client()?;
        let installer = Installer::new(
            Arc::clone(&directories),
            Downloader::new(http_client.clone()),
            MirrorResolver::load(&directories.mirrors_json),
            sender.clone(),
        );

        let legacy_roots = if options.skip_migration {
            Vec::new()
        } else {
            directories.legacy_roots()
        };
        let bundled_archive = options.bundled_archive
            .or_else(|| settings.bundled_archive.clone())
            .or_else(default_bundled_archive);

        let preparer = Preparer::new(installer.clone(), PrepareOptions {
            minecraft_version: settings.minecraft_version,
            forge_version: settings.forge_version,
            bundle_url: settings.bundle_url.clone(),
            bundled_archive,
            legacy_roots,
        });

        Ok(Self {
            platform: PlatformClient::new(http_client, &settings.platform_url),
            profiles: ProfileStore::new(directories.user_json.clone()),
            directories,
            settings,
            installer,
            preparer,
            sender,
        })
    }

    pub fn directories(&self) -> &Arc<LauncherDirectories> {
        &self.directories
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    pub fn preparer(&self) -> &Preparer {
        &self.preparer
    }

    pub fn profile(&self) -> Option<Arc<UserProfile>> {
        self.profiles.load()
    }

    pub async fn login(&self, email: &str, password: &str, code: Option<&str>) -> Result<Arc<UserProfile>, AuthError> {
        let profile = Arc::new(self.platform.authenticate(email, password, code).await?);
        log::info!("Signed in as {}", profile.name);

        if let Err(error) = self.profiles.save(&profile) {
            log::error!("Failed to save profile: {error}");
            self.sender.send_error("Failed to save user.json");
        }
        self.sender.send(MessageToFrontend::ProfileUpdated { profile: Some(Arc::clone(&profile)) });
        Ok(profile)
    }

    pub fn logout(&self) -> std::io::Result<()> {
        self.profiles.clear()?;
        log::info!("Signed out");
        self.sender.send(MessageToFrontend::ProfileUpdated { profile: None });
        Ok(())
    }

    pub async fn server_status(&self) -> Result<Vec<ServerStatus>, PlatformError> {
        self.platform.server_status().await
    }

    pub async fn ping(&self) -> Result<Duration, PlatformError> {
        self.platform.ping().await
    }

    /// Re-synchronizes the configured bundle. `force` ignores the cached archive.
    pub async fn sync_bundle(&self, force: bool) -> Result<Option<BundleReport>, BundleError> {
        let Some(url) = &self.settings.bundle_url else {
            return Ok(None);
        };
        crate::ensure_dir(&self.directories.cache_dir)?;
        self.installer.try_sync_bundle(url, force).await.map(Some)
    }

    pub async fn sweep(&self) -> usize {
        sweep::sweep_in_background(self.directories.libraries_dir.clone()).await
    }

    /// Resolves Java and builds the handoff for the signed-in profile.
    pub async fn launch_configuration(&self) -> Result<LaunchConfiguration, LaunchError> {
        let profile = self.profile().ok_or(LaunchError::NotSignedIn)?;
        let bundled_base = java::default_bundled_base();
        let java = java::resolve_java(self.settings.java_path.as_deref(), bundled_base.as_deref()).await?;
        Ok(launch::build_configuration(&profile, &self.settings, &self.directories, java.path))
    }

    pub fn launcher<R: launch::LaunchRoutine>(&self, routine: R) -> launch::Launcher<R> {
        launch::Launcher::new(routine, self.sender.clone())
    }
}
