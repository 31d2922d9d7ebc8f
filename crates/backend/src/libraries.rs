use std::{path::PathBuf, sync::Arc};

use bridge::{message::PrepareStage, progress::ProgressTracker};
use schema::version::{GameLibraryArtifact, MinecraftVersion};
use serde::Serialize;

use crate::{archive, download::{DownloadError, Validation}, installer::Installer, mirrors::{CandidateList, MirrorResolver, Resource}};

#[derive(thiserror::Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Illegal library path {0:?}")]
    IllegalLibraryPath(Arc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Library,
    Classifier,
}

impl LibraryKind {
    fn name(self) -> &'static str {
        match self {
            LibraryKind::Library => "library",
            LibraryKind::Classifier => "classifier",
        }
    }
}

/// One file required by the descriptor's library list.
#[derive(Debug, Clone)]
pub struct LibraryArtifact {
    pub kind: LibraryKind,
    pub relative_path: Arc<str>,
    pub url: Arc<str>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryReport {
    pub required: usize,
    pub downloaded: usize,
}

impl Installer {
    /// Primary artifacts and every classifier, in descriptor order.
    pub fn collect_library_artifacts(&self, descriptor: &MinecraftVersion) -> Result<Vec<LibraryArtifact>, LibraryError> {
        let mut artifacts = Vec::new();
        for library in &descriptor.libraries {
            let Some(downloads) = &library.downloads else {
                continue;
            };
            if let Some(artifact) = &downloads.artifact {
                self.push_artifact(&mut artifacts, LibraryKind::Library, artifact)?;
            }
            for artifact in downloads.classifiers.iter().flat_map(|classifiers| classifiers.values()) {
                self.push_artifact(&mut artifacts, LibraryKind::Classifier, artifact)?;
            }
        }
        Ok(artifacts)
    }

    fn push_artifact(&self, artifacts: &mut Vec<LibraryArtifact>, kind: LibraryKind, artifact: &GameLibraryArtifact) -> Result<(), LibraryError> {
        let Some((relative_path, url)) = artifact.path_and_url() else {
            return Ok(());
        };
        if !crate::path_is_normal(relative_path) {
            return Err(LibraryError::IllegalLibraryPath(relative_path.into()));
        }
        artifacts.push(LibraryArtifact {
            kind,
            relative_path: relative_path.into(),
            url: url.into(),
            path: self.directories.libraries_dir.join(relative_path),
        });
        Ok(())
    }

    /// Downloads every library artifact that is missing or fails validation, one at a time.
    pub async fn ensure_libraries(&self, descriptor: &MinecraftVersion) -> Result<LibraryReport, LibraryError> {
        crate::ensure_dir(&self.directories.libraries_dir)?;
        let artifacts = self.collect_library_artifacts(descriptor)?;
        let required = artifacts.len();

        let mut pending = Vec::new();
        for artifact in artifacts {
            if !is_resident(&artifact).await {
                pending.push(artifact);
            }
        }

        let tracker = ProgressTracker::new(PrepareStage::Libraries, self.sender.clone());
        tracker.set_total(pending.len());

        for artifact in &pending {
            // Another caller may have repaired it in the meantime
            let downloaded = if is_resident(artifact).await {
                false
            } else {
                let candidates = library_candidates(&self.mirrors, artifact);
                let label = format!("{} {}", artifact.kind.name(), artifact.relative_path);
                if let Err(error) = self.downloader.fetch_any(&candidates, &artifact.path, &label, Validation::Archive(&[])).await {
                    tracker.set_finished(true);
                    return Err(error.into());
                }
                true
            };

            let current = tracker.complete_item(artifact.relative_path.clone(), downloaded);
            if downloaded {
                log::info!("Downloaded {} {current}/{} {}", artifact.kind.name(), pending.len(), artifact.relative_path);
            }
        }
        tracker.set_finished(false);

        Ok(LibraryReport {
            required,
            downloaded: tracker.downloaded(),
        })
    }
}

/// Mirror candidates, then the descriptor's own URL unless user templates replace every source.
fn library_candidates(mirrors: &MirrorResolver, artifact: &LibraryArtifact) -> Vec<Arc<str>> {
    let resource = Resource::Library { path: &artifact.relative_path };
    let overrides_only = mirrors.overrides_only(&resource);
    let mut candidates = CandidateList::default();
    candidates.extend(mirrors.resolve(resource));
    if !overrides_only {
        candidates.push(&artifact.url);
    }
    candidates.into_vec()
}

async fn is_resident(artifact: &LibraryArtifact) -> bool {
    let path = artifact.path.clone();
    tokio::task::spawn_blocking(move || archive::is_resident_library_valid(&path))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> LibraryArtifact {
        LibraryArtifact {
            kind: LibraryKind::Library,
            relative_path: "org/example/lib/1.0/lib-1.0.jar".into(),
            url: "https://libraries.example.invalid/org/example/lib/1.0/lib-1.0.jar".into(),
            path: PathBuf::from("lib-1.0.jar"),
        }
    }

    fn candidates(json: &str) -> Vec<String> {
        let mirrors = MirrorResolver::new(serde_json::from_str(json).unwrap());
        library_candidates(&mirrors, &artifact()).iter().map(|url| url.to_string()).collect()
    }

    #[test]
    fn descriptor_url_follows_mirrors() {
        let urls = candidates(r#"{"libraries": "https://m.invalid/{path}"}"#);
        assert_eq!(urls.first().map(String::as_str), Some("https://m.invalid/org/example/lib/1.0/lib-1.0.jar"));
        assert_eq!(urls.last().map(String::as_str), Some("https://libraries.example.invalid/org/example/lib/1.0/lib-1.0.jar"));
    }

    #[test]
    fn disabled_defaults_drop_descriptor_url() {
        let urls = candidates(r#"{"disableDefaults": true, "libraries": "https://m.invalid/{path}"}"#);
        assert_eq!(urls, ["https://m.invalid/org/example/lib/1.0/lib-1.0.jar"]);

        // Without a library template the defaults and the descriptor URL still apply.
        let urls = candidates(r#"{"disableDefaults": true}"#);
        assert!(urls.contains(&"https://libraries.example.invalid/org/example/lib/1.0/lib-1.0.jar".to_string()));
    }
}
