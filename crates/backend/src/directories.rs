use std::path::{Path, PathBuf};

/// The unified working tree. Every component writes below `root`.
#[derive(Debug, Clone)]
pub struct LauncherDirectories {
    pub root: PathBuf,

    pub versions_dir: PathBuf,
    pub libraries_dir: PathBuf,

    pub assets_root_dir: PathBuf,
    pub assets_index_dir: PathBuf,
    pub assets_objects_dir: PathBuf,

    pub mods_dir: PathBuf,
    pub config_dir: PathBuf,
    pub resourcepacks_dir: PathBuf,

    pub cache_dir: PathBuf,
    pub bundle_scratch_dir: PathBuf,
    pub manifest_cache: PathBuf,
    pub bundle_cache: PathBuf,
    pub bundle_source: PathBuf,

    pub options_txt: PathBuf,
    pub mirrors_json: PathBuf,
    pub settings_json: PathBuf,
    pub user_json: PathBuf,
}

impl LauncherDirectories {
    pub const ROOT_ENV: &'static str = "EMINIUM_HOME";
    pub const ROOT_NAME: &'static str = ".eminium";

    pub fn new(root: PathBuf) -> Self {
        let versions_dir = root.join("versions");
        let libraries_dir = root.join("libraries");

        let assets_root_dir = root.join("assets");
        let assets_index_dir = assets_root_dir.join("indexes");
        let assets_objects_dir = assets_root_dir.join("objects");

        let mods_dir = root.join("mods");
        let config_dir = root.join("config");
        let resourcepacks_dir = root.join("resourcepacks");

        let cache_dir = root.join("cache");
        let bundle_scratch_dir = root.join("tmp_modpack");
        let manifest_cache = cache_dir.join("version_manifest.json");
        let bundle_cache = cache_dir.join("modpack.zip");
        let bundle_source = cache_dir.join("modpack.source");

        let options_txt = root.join("options.txt");
        let mirrors_json = root.join("mirrors.json");
        let settings_json = root.join("launcher.json");
        let user_json = root.join("user.json");

        Self {
            root,

            versions_dir,
            libraries_dir,

            assets_root_dir,
            assets_index_dir,
            assets_objects_dir,

            mods_dir,
            config_dir,
            resourcepacks_dir,

            cache_dir,
            bundle_scratch_dir,
            manifest_cache,
            bundle_cache,
            bundle_source,

            options_txt,
            mirrors_json,
            settings_json,
            user_json,
        }
    }

    /// `$EMINIUM_HOME`, or `.eminium` inside the platform data directory.
    pub fn default_root() -> Option<PathBuf> {
        if let Some(root) = std::env::var_os(Self::ROOT_ENV).filter(|root| !root.is_empty()) {
            return Some(PathBuf::from(root));
        }
        let base_dirs = directories::BaseDirs::new()?;
        Some(base_dirs.data_dir().join(Self::ROOT_NAME))
    }

    /// Locations older releases used, excluding the unified root itself.
    pub fn legacy_roots(&self) -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        let home = base_dirs.home_dir();
        [home.join(".eminium-core"), home.join(".eminium")]
            .into_iter()
            .filter(|legacy| legacy != &self.root && !self.root.starts_with(legacy))
            .collect()
    }

    pub fn required_dirs(&self) -> [&Path; 10] {
        [
            &self.root,
            &self.versions_dir,
            &self.libraries_dir,
            &self.assets_root_dir,
            &self.assets_index_dir,
            &self.assets_objects_dir,
            &self.mods_dir,
            &self.config_dir,
            &self.resourcepacks_dir,
            &self.cache_dir,
        ]
    }

    /// Creates every subtree, replacing stray files that occupy a directory path.
    pub fn create_all(&self) -> std::io::Result<()> {
        for dir in self.required_dirs() {
            crate::ensure_dir(dir)?;
        }
        Ok(())
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir.join(version)
    }

    pub fn version_json(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(format!("{version}.json"))
    }

    pub fn client_jar(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(format!("{version}.jar"))
    }

    pub fn asset_index(&self, assets_id: &str) -> PathBuf {
        self.assets_index_dir.join(format!("{assets_id}.json"))
    }

    /// `objects/<first two hex chars>/<hash>`. The hash must already be validated.
    pub fn asset_object(&self, hash: &str) -> PathBuf {
        self.assets_objects_dir.join(&hash[..2]).join(hash)
    }

    pub fn loader_installer(&self, minecraft_version: &str, forge_version: &str) -> PathBuf {
        self.cache_dir.join(format!("forge-{minecraft_version}-{forge_version}-installer.jar"))
    }
}
