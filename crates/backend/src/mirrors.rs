use std::{path::Path, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use schema::mirrors::{MirrorOverrides, UrlTemplates};

const BMCL: &str = "https://bmclapi2.bangbang93.com";
const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";

static FORGE_NAMESPACES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(net/minecraftforge/|cpw/mods/|org/spongepowered/|io/github/zekerzhayard/|it/.+/fastutil)")
        .expect("valid regex")
});

/// A logical resource whose candidate sources are resolved by [`MirrorResolver`].
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    VersionJson { version: &'a str },
    ClientJar { version: &'a str },
    AssetIndex { id: &'a str },
    AssetObject { hash: &'a str },
    Manifest,
    Library { path: &'a str },
    LoaderInstaller { minecraft: &'a str, loader: &'a str },
}

impl Resource<'_> {
    fn placeholders(&self) -> Vec<(&'static str, &str)> {
        match *self {
            Resource::VersionJson { version } | Resource::ClientJar { version } => vec![("{mc}", version)],
            Resource::AssetIndex { id } => vec![("{id}", id)],
            Resource::AssetObject { hash } => vec![("{sub}", hash.get(..2).unwrap_or(hash)), ("{hash}", hash)],
            Resource::Manifest => vec![],
            Resource::Library { path } => vec![("{path}", path)],
            Resource::LoaderInstaller { minecraft, loader } => vec![("{mc}", minecraft), ("{loader}", loader)],
        }
    }

    fn defaults(&self) -> Vec<String> {
        match *self {
            Resource::VersionJson { version } => vec![format!("{BMCL}/version/{version}/json")],
            Resource::ClientJar { version } => vec![format!("{BMCL}/version/{version}/client")],
            Resource::AssetIndex { id } => vec![format!("{BMCL}/assets/indexes/{id}.json")],
            Resource::AssetObject { hash } => {
                let sub = hash.get(..2).unwrap_or(hash);
                vec![
                    format!("https://resources.download.minecraft.net/{sub}/{hash}"),
                    format!("{BMCL}/assets/{sub}/{hash}"),
                ]
            },
            Resource::Manifest => vec![
                "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json".to_string(),
                format!("{BMCL}/mc/game/version_manifest.json"),
            ],
            Resource::Library { path } => {
                let mut urls = vec![
                    format!("https://libraries.minecraft.net/{path}"),
                    format!("{BMCL}/maven/{path}"),
                ];
                if FORGE_NAMESPACES.is_match(path) {
                    urls.push(format!("{FORGE_MAVEN}/{path}"));
                }
                urls
            },
            Resource::LoaderInstaller { minecraft, loader } => {
                let coordinate = format!("{minecraft}-{loader}");
                vec![
                    format!("{FORGE_MAVEN}/net/minecraftforge/forge/{coordinate}/forge-{coordinate}-installer.jar"),
                    format!("{BMCL}/forge/download/{coordinate}"),
                ]
            },
        }
    }
}

/// Turns a [`Resource`] into an ordered list of candidate URLs.
///
/// User templates come first. Built-in endpoints follow unless `disableDefaults`
/// is set and at least one template exists for the class.
#[derive(Debug, Clone, Default)]
pub struct MirrorResolver {
    overrides: MirrorOverrides,
}

impl MirrorResolver {
    pub fn new(overrides: MirrorOverrides) -> Self {
        Self { overrides }
    }

    /// Reads `mirrors.json`. A missing or unreadable file yields no overrides.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match crate::read_json::<MirrorOverrides>(path) {
            Ok(overrides) => Self::new(overrides),
            Err(error) => {
                log::warn!("Ignoring unreadable mirror overrides {path:?}: {error}");
                Self::default()
            },
        }
    }

    pub fn overrides(&self) -> &MirrorOverrides {
        &self.overrides
    }

    fn templates(&self, resource: &Resource) -> &UrlTemplates {
        match resource {
            Resource::VersionJson { .. } => &self.overrides.version_json,
            Resource::ClientJar { .. } => &self.overrides.client_jar,
            Resource::AssetIndex { .. } => &self.overrides.assets_index,
            Resource::AssetObject { .. } => &self.overrides.asset_obj,
            Resource::Manifest => &self.overrides.manifest,
            Resource::Library { .. } => &self.overrides.libraries,
            Resource::LoaderInstaller { .. } => &self.overrides.loader_installer,
        }
    }

    /// Whether user templates replace every other source for this class.
    pub fn overrides_only(&self, resource: &Resource) -> bool {
        self.overrides.disable_defaults && !self.templates(resource).is_empty()
    }

    pub fn resolve(&self, resource: Resource) -> Vec<Arc<str>> {
        let placeholders = resource.placeholders();
        let overrides: Vec<String> = self.templates(&resource).iter()
            .map(|template| expand(template, &placeholders))
            .collect();

        let mut urls = CandidateList::default();
        let use_defaults = !self.overrides_only(&resource);
        urls.extend(overrides);
        if use_defaults {
            urls.extend(resource.defaults());
        }
        urls.into_vec()
    }
}

fn expand(template: &str, placeholders: &[(&str, &str)]) -> String {
    placeholders.iter().fold(template.to_string(), |url, (key, value)| url.replace(key, value))
}

/// Ordered, duplicate-free URL list.
#[derive(Debug, Default)]
pub struct CandidateList(Vec<Arc<str>>);

impl CandidateList {
    pub fn push(&mut self, url: impl AsRef<str>) {
        let url = url.as_ref().trim();
        if !url.is_empty() && !self.0.iter().any(|existing| &**existing == url) {
            self.0.push(url.into());
        }
    }

    pub fn extend<S: AsRef<str>>(&mut self, urls: impl IntoIterator<Item = S>) {
        for url in urls {
            self.push(url);
        }
    }

    pub fn into_vec(self) -> Vec<Arc<str>> {
        self.0
    }
}
