use std::{collections::VecDeque, path::{Path, PathBuf}};

use bridge::{message::PrepareStage, progress::ProgressTracker};
use serde::Serialize;

use crate::{directories::LauncherDirectories, download::{DownloadError, Validation}, installer::Installer};

pub const SEARCH_MAX_DEPTH: usize = 8;
pub const KNOWN_NESTED_FOLDER: &str = "get-zip-for-eminium-launcher-ZIP4";
pub const RESOURCE_PACK_PREVIEW: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum BundleError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid bundle archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Bundle archive {0:?} is empty or unreadable")]
    InvalidArchive(PathBuf),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Mods,
    Config,
    ResourcePacks,
}

impl ContentKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ContentKind::Mods => "mods",
            ContentKind::Config => "config",
            ContentKind::ResourcePacks => "resourcepacks",
        }
    }

    /// Mutable sets are replaced wholesale, configuration is layered over what exists.
    fn replaces(self) -> bool {
        !matches!(self, ContentKind::Config)
    }

    fn target(self, directories: &LauncherDirectories) -> &Path {
        match self {
            ContentKind::Mods => &directories.mods_dir,
            ContentKind::Config => &directories.config_dir,
            ContentKind::ResourcePacks => &directories.resourcepacks_dir,
        }
    }
}

/// Where a content directory was found inside an extracted bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateStrategy {
    TopLevel,
    NestedFolder,
    Search,
    LooseArchives,
}

#[derive(Debug, Clone, Copy)]
enum Strategy<'a> {
    Conventional { base: &'a Path, tag: LocateStrategy },
    BreadthFirst { base: &'a Path },
}

impl Strategy<'_> {
    fn find(self, name: &str) -> Option<(PathBuf, LocateStrategy)> {
        match self {
            Strategy::Conventional { base, tag } => conventional_subpaths(name).into_iter()
                .map(|subpath| base.join(subpath))
                .find(|candidate| candidate.is_dir())
                .map(|found| (found, tag)),
            Strategy::BreadthFirst { base } => {
                breadth_first_search(base, name, SEARCH_MAX_DEPTH).map(|found| (found, LocateStrategy::Search))
            },
        }
    }
}

fn conventional_subpaths(name: &str) -> [PathBuf; 4] {
    [
        PathBuf::from(name),
        Path::new("overrides").join(name),
        Path::new(".minecraft").join(name),
        Path::new(KNOWN_NESTED_FOLDER).join(name),
    ]
}

/// What a sync changed in the working tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleReport {
    pub mods: Vec<String>,
    pub mods_strategy: Option<LocateStrategy>,
    pub config_strategy: Option<LocateStrategy>,
    pub resourcepacks: Vec<String>,
    pub resourcepacks_strategy: Option<LocateStrategy>,
}

impl Installer {
    /// Best-effort sync: failures are logged and reported as `None`.
    pub async fn sync_bundle(&self, url: &str, force: bool) -> Option<BundleReport> {
        match self.try_sync_bundle(url, force).await {
            Ok(report) => Some(report),
            Err(error) => {
                log::warn!("Modpack sync failed: {error}");
                self.sender.send_warning(format!("Modpack sync failed: {error}"));
                None
            },
        }
    }

    /// Downloads the bundle (reusing the cached archive for an unchanged URL unless `force`)
    /// and merges it into the working tree.
    pub async fn try_sync_bundle(&self, url: &str, force: bool) -> Result<BundleReport, BundleError> {
        self.enter_stage(PrepareStage::Bundle);
        let archive = self.directories.bundle_cache.clone();
        let source = self.directories.bundle_source.clone();

        let cached_source = tokio::fs::read_to_string(&source).await.ok();
        let reusable = !force
            && cached_source.as_deref().map(str::trim) == Some(url)
            && crate::archive::check_resident(&archive, &[]).await;

        if reusable {
            log::debug!("Reusing cached modpack archive for {url}");
        } else {
            let tracker = ProgressTracker::new(PrepareStage::Bundle, self.sender.clone());
            tracker.set_total(1);
            let result = self.downloader.fetch_any(&[url], &archive, "modpack", Validation::Archive(&[])).await;
            tracker.set_finished(result.is_err());
            result?;
            tracker.complete_item("modpack", true);
            crate::write_safe(&source, url)?;
            log::info!("Downloaded modpack from {url}");
        }

        self.apply_bundle_archive(&archive).await
    }

    /// Extracts a bundle archive shipped with the launcher over the working tree. Best-effort.
    ///
    /// Returns the number of archive entries written.
    pub async fn import_bundled_archive(&self, archive: &Path) -> Option<usize> {
        if !archive.is_file() {
            return None;
        }
        self.enter_stage(PrepareStage::BundledContent);
        let root = self.directories.root.clone();
        let path = archive.to_path_buf();
        let result = tokio::task::spawn_blocking(move || import_archive(&root, &path)).await
            .map_err(BundleError::from)
            .and_then(std::convert::identity);
        match result {
            Ok(entries) => {
                log::info!("Imported {entries} bundled entries from {archive:?}");
                Some(entries)
            },
            Err(error) => {
                log::warn!("Bundled content import from {archive:?} failed: {error}");
                None
            },
        }
    }

    pub async fn apply_bundle_archive(&self, archive: &Path) -> Result<BundleReport, BundleError> {
        let directories = self.directories.clone();
        let archive = archive.to_path_buf();
        let report = tokio::task::spawn_blocking(move || apply_archive(&directories, &archive)).await??;

        if !report.mods.is_empty() {
            log::info!("Synced {} mods: {}", report.mods.len(), report.mods.join(", "));
        }
        if !report.resourcepacks.is_empty() {
            log::info!("Synced resource packs: {}", report.resourcepacks.join(", "));
        }
        Ok(report)
    }
}

/// Extracts `archive` over `root`, overwriting existing files and leaving everything else in place.
///
/// An archive that cannot be read as a zip is deleted.
pub fn import_archive(root: &Path, archive: &Path) -> Result<usize, BundleError> {
    let result = extract(archive, root);
    if let Err(BundleError::Zip(_) | BundleError::InvalidArchive(_)) = &result {
        match std::fs::remove_file(archive) {
            Ok(()) => log::info!("Removed corrupt bundled archive {archive:?}"),
            Err(error) => log::warn!("Unable to remove corrupt bundled archive {archive:?}: {error}"),
        }
    }
    result
}

/// Extracts `archive` into the scratch directory and merges it. The scratch directory is always removed.
pub fn apply_archive(directories: &LauncherDirectories, archive: &Path) -> Result<BundleReport, BundleError> {
    let scratch = &directories.bundle_scratch_dir;
    crate::remove_path(scratch)?;
    crate::ensure_dir(scratch)?;

    let result = extract(archive, scratch).and_then(|_| merge_extracted(directories, scratch));

    if let Err(error) = crate::remove_path(scratch) {
        log::warn!("Unable to clean {scratch:?}: {error}");
    }
    result
}

fn extract(archive: &Path, into: &Path) -> Result<usize, BundleError> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    if zip.is_empty() {
        return Err(BundleError::InvalidArchive(archive.to_path_buf()));
    }
    let entries = zip.len();
    zip.extract(into)?;
    Ok(entries)
}

pub fn merge_extracted(directories: &LauncherDirectories, extracted: &Path) -> Result<BundleReport, BundleError> {
    let mut report = BundleReport::default();

    for kind in [ContentKind::Mods, ContentKind::Config, ContentKind::ResourcePacks] {
        let target = kind.target(directories);
        let strategy = match locate(extracted, kind.dir_name()) {
            Some((found, strategy)) => {
                if kind.replaces() {
                    crate::remove_path(target)?;
                }
                crate::copy_dir_all(&found, target)?;
                Some(strategy)
            },
            None if kind == ContentKind::Mods => {
                let loose = collect_archives(extracted);
                if loose.is_empty() {
                    None
                } else {
                    crate::remove_path(target)?;
                    crate::ensure_dir(target)?;
                    for jar in &loose {
                        if let Some(name) = jar.file_name() {
                            std::fs::copy(jar, target.join(name))?;
                        }
                    }
                    Some(LocateStrategy::LooseArchives)
                }
            },
            None => None,
        };

        if strategy.is_none() {
            log::debug!("Bundle has no {} content", kind.dir_name());
        }

        match kind {
            ContentKind::Mods => {
                report.mods_strategy = strategy;
                report.mods = list_names(target, Some("jar"));
            },
            ContentKind::Config => report.config_strategy = strategy,
            ContentKind::ResourcePacks => {
                report.resourcepacks_strategy = strategy;
                report.resourcepacks = list_names(target, None).into_iter().take(RESOURCE_PACK_PREVIEW).collect();
            },
        }
    }

    Ok(report)
}

/// Finds the directory called `name`, trying each layout convention in priority order.
pub fn locate(root: &Path, name: &str) -> Option<(PathBuf, LocateStrategy)> {
    let single_top = single_top_level_dir(root);

    let mut strategies = vec![Strategy::Conventional { base: root, tag: LocateStrategy::TopLevel }];
    if let Some(top) = &single_top {
        strategies.push(Strategy::Conventional { base: top, tag: LocateStrategy::NestedFolder });
        strategies.push(Strategy::BreadthFirst { base: top });
    }
    strategies.push(Strategy::BreadthFirst { base: root });

    strategies.into_iter().find_map(|strategy| strategy.find(name))
}

fn single_top_level_dir(root: &Path) -> Option<PathBuf> {
    let mut dirs = std::fs::read_dir(root).ok()?
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_dir()))
        .map(|entry| entry.path());
    let first = dirs.next()?;
    dirs.next().is_none().then_some(first)
}

/// Case-insensitive search for a directory named `name`, at most `max_depth` levels below `root`.
fn breadth_first_search(root: &Path, name: &str, max_depth: usize) -> Option<PathBuf> {
    let mut queue = VecDeque::from([(root.to_path_buf(), 0usize)]);
    while let Some((dir, depth)) = queue.pop_front() {
        if depth > max_depth {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut children: Vec<PathBuf> = entries.flatten()
            .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_dir()))
            .map(|entry| entry.path())
            .collect();
        children.sort();
        for child in children {
            if child.file_name().and_then(|file_name| file_name.to_str()).is_some_and(|file_name| file_name.eq_ignore_ascii_case(name)) {
                return Some(child);
            }
            queue.push_back((child, depth + 1));
        }
    }
    None
}

fn collect_archives(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("jar")) {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

fn list_names(dir: &Path, extension: Option<&str>) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries.flatten()
        .map(|entry| entry.path())
        .filter(|path| extension.is_none_or(|wanted| path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case(wanted))))
        .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{zip_bytes, TempDir};

    /// Writes each file with its own name as content, so the same file under another prefix compares equal.
    fn tree(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, path.file_name().unwrap().as_encoded_bytes()).unwrap();
        }
    }

    #[test]
    fn overrides_layout_merges_like_top_level() {
        let temp = TempDir::new("bundle-layouts");

        let flat = temp.join("flat");
        tree(&flat, &["mods/a.jar", "mods/b.jar", "config/x.toml"]);
        let overrides = temp.join("overrides");
        tree(&overrides, &["overrides/mods/a.jar", "overrides/mods/b.jar", "overrides/config/x.toml"]);

        let first = LauncherDirectories::new(temp.join("first"));
        first.create_all().unwrap();
        let second = LauncherDirectories::new(temp.join("second"));
        second.create_all().unwrap();

        let first_report = merge_extracted(&first, &flat).unwrap();
        let second_report = merge_extracted(&second, &overrides).unwrap();

        assert_eq!(first_report.mods, ["a.jar", "b.jar"]);
        assert_eq!(first_report.mods, second_report.mods);
        assert_eq!(std::fs::read(first.mods_dir.join("a.jar")).unwrap(), std::fs::read(second.mods_dir.join("a.jar")).unwrap());
        assert_eq!(first_report.mods_strategy, Some(LocateStrategy::TopLevel));
        assert_eq!(second_report.mods_strategy, Some(LocateStrategy::TopLevel));
        assert!(second.config_dir.join("x.toml").is_file());
    }

    #[test]
    fn single_top_folder_and_search() {
        let temp = TempDir::new("bundle-nested");
        let extracted = temp.join("x");
        tree(&extracted, &["repo-main/.minecraft/mods/a.jar", "repo-main/deep/er/ResourcePacks/pack.zip"]);

        let (mods, strategy) = locate(&extracted, "mods").unwrap();
        assert_eq!(mods, extracted.join("repo-main/.minecraft/mods"));
        assert_eq!(strategy, LocateStrategy::NestedFolder);

        let (packs, strategy) = locate(&extracted, "resourcepacks").unwrap();
        assert_eq!(packs, extracted.join("repo-main/deep/er/ResourcePacks"));
        assert_eq!(strategy, LocateStrategy::Search);

        assert!(locate(&extracted, "config").is_none());
    }

    #[test]
    fn search_depth_is_bounded() {
        let temp = TempDir::new("bundle-depth");
        let extracted = temp.join("x");
        tree(&extracted, &["a/b/c/d/e/f/g/h/i/mods/deep.jar", "other/file.txt"]);
        tree(&extracted, &["j/k/l/m/n/o/p/q/resourcepacks/r.zip"]);
        assert!(breadth_first_search(&extracted, "mods", SEARCH_MAX_DEPTH).is_none());
        assert!(breadth_first_search(&extracted, "mods", 12).is_some());
        assert_eq!(
            breadth_first_search(&extracted, "resourcepacks", SEARCH_MAX_DEPTH),
            Some(extracted.join("j/k/l/m/n/o/p/q/resourcepacks")),
        );
    }

    #[test]
    fn loose_jars_replace_mods_flat_and_config_overlays() {
        let temp = TempDir::new("bundle-loose");
        let directories = LauncherDirectories::new(temp.join("root"));
        directories.create_all().unwrap();
        tree(&directories.root, &["mods/stale.jar", "config/keep.toml", "config/shared.toml"]);

        let extracted = temp.join("x");
        tree(&extracted, &["pack/one/z.jar", "pack/two/y.JAR", "pack/readme.md", "config/shared.toml"]);

        let report = merge_extracted(&directories, &extracted).unwrap();
        assert_eq!(report.mods_strategy, Some(LocateStrategy::LooseArchives));
        assert_eq!(report.mods, ["y.JAR", "z.jar"]);
        assert!(!directories.mods_dir.join("stale.jar").exists());
        assert!(directories.config_dir.join("keep.toml").is_file());
        assert_eq!(std::fs::read_to_string(directories.config_dir.join("shared.toml")).unwrap(), "shared.toml");
    }

    #[test]
    fn apply_archive_cleans_scratch_even_on_failure() {
        let temp = TempDir::new("bundle-archive");
        let directories = LauncherDirectories::new(temp.join("root"));
        directories.create_all().unwrap();

        let archive = temp.join("modpack.zip");
        std::fs::write(&archive, zip_bytes(&[
            ("ZIP-main/", b""),
            ("ZIP-main/mods/", b""),
            ("ZIP-main/mods/m.jar", b"jar"),
            ("ZIP-main/resourcepacks/", b""),
            ("ZIP-main/resourcepacks/p.zip", b"zip"),
        ])).unwrap();
        let report = apply_archive(&directories, &archive).unwrap();
        assert_eq!(report.mods, ["m.jar"]);
        assert_eq!(report.resourcepacks, ["p.zip"]);
        assert!(!directories.bundle_scratch_dir.exists());

        std::fs::write(&archive, b"not a zip").unwrap();
        assert!(apply_archive(&directories, &archive).is_err());
        assert!(!directories.bundle_scratch_dir.exists());
        assert_eq!(list_names(&directories.mods_dir, Some("jar")), ["m.jar"]);
    }

    #[test]
    fn bundled_import_extracts_everything_over_the_tree() {
        let temp = TempDir::new("bundle-import");
        let directories = LauncherDirectories::new(temp.join("root"));
        directories.create_all().unwrap();
        tree(&directories.root, &["mods/user.jar", "config/keep.toml"]);

        let archive = temp.join("modpack.zip");
        std::fs::write(&archive, zip_bytes(&[
            ("mods/a.jar", b"jar"),
            ("shaderpacks/s.zip", b"shader"),
            ("servers.dat", b"servers"),
            ("config/keep.toml", b"replaced"),
        ])).unwrap();

        assert_eq!(import_archive(&directories.root, &archive).unwrap(), 4);
        assert!(directories.mods_dir.join("user.jar").is_file());
        assert!(directories.mods_dir.join("a.jar").is_file());
        assert!(directories.root.join("shaderpacks/s.zip").is_file());
        assert_eq!(std::fs::read(directories.root.join("servers.dat")).unwrap(), b"servers");
        assert_eq!(std::fs::read_to_string(directories.config_dir.join("keep.toml")).unwrap(), "replaced");
        assert!(archive.is_file());
    }

    #[test]
    fn corrupt_bundled_archive_is_removed() {
        let temp = TempDir::new("bundle-import-corrupt");
        let directories = LauncherDirectories::new(temp.join("root"));
        directories.create_all().unwrap();
        tree(&directories.root, &["mods/user.jar"]);

        let archive = temp.join("modpack.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        assert!(import_archive(&directories.root, &archive).is_err());
        assert!(!archive.exists());
        assert!(directories.mods_dir.join("user.jar").is_file());
    }
}
