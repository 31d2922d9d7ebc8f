use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

/// The per-version descriptor (`versions/{id}/{id}.json`).
///
/// Only the fields needed to acquire files are modelled; launch arguments and the
/// rest of the document are left to the launch routine, which reads the file itself.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftVersion {
    pub id: Ustr,
    #[serde(default)]
    pub asset_index: Option<AssetIndexLink>,
    #[serde(default)]
    pub assets: Option<Ustr>,
    #[serde(default)]
    pub downloads: Option<GameDownloads>,
    #[serde(default)]
    pub libraries: Vec<GameLibrary>,
    #[serde(default)]
    pub main_class: Option<Arc<str>>,
}

impl MinecraftVersion {
    /// Asset id used to name the index file, falling back to the version id.
    pub fn assets_id(&self) -> Ustr {
        self.asset_index.as_ref().map(|link| link.id)
            .or(self.assets)
            .unwrap_or(self.id)
    }

    pub fn client_download(&self) -> Option<&GameDownload> {
        self.downloads.as_ref().and_then(|downloads| downloads.client.as_ref())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexLink {
    pub id: Ustr,
    pub url: Ustr,
    #[serde(default)]
    pub sha1: Option<Ustr>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GameDownloads {
    #[serde(default)]
    pub client: Option<GameDownload>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GameDownload {
    pub url: Ustr,
    #[serde(default)]
    pub sha1: Option<Ustr>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GameLibrary {
    #[serde(default)]
    pub name: Option<Ustr>,
    #[serde(default)]
    pub downloads: Option<GameLibraryDownloads>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct GameLibraryDownloads {
    #[serde(default)]
    pub artifact: Option<GameLibraryArtifact>,
    #[serde(default)]
    pub classifiers: Option<IndexMap<Ustr, GameLibraryArtifact>>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GameLibraryArtifact {
    #[serde(default)]
    pub path: Option<Arc<str>>,
    #[serde(default)]
    pub url: Option<Arc<str>>,
    #[serde(default)]
    pub sha1: Option<Ustr>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl GameLibraryArtifact {
    /// Both a relative path and a source are required to place the artifact.
    pub fn path_and_url(&self) -> Option<(&str, &str)> {
        match (&self.path, &self.url) {
            (Some(path), Some(url)) if !path.is_empty() && !url.is_empty() => Some((path, url)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_descriptor_with_classifiers() {
        let version: MinecraftVersion = serde_json::from_str(r#"{
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {"game": []},
            "assetIndex": {"id": "5", "url": "https://example.invalid/5.json", "sha1": "ab", "size": 1, "totalSize": 2},
            "downloads": {"client": {"url": "https://example.invalid/client.jar", "sha1": "cd", "size": 3}},
            "libraries": [
                {"name": "a:b:1", "downloads": {"artifact": {"path": "a/b/1/b-1.jar", "url": "https://example.invalid/a/b/1/b-1.jar"}}},
                {"name": "c:d:1", "downloads": {"classifiers": {"natives-linux": {"path": "c/d/1/d-1-natives-linux.jar", "url": "https://example.invalid/d.jar"}}}},
                {"name": "e:f:1"}
            ]
        }"#).unwrap();

        assert_eq!(version.assets_id().as_str(), "5");
        assert_eq!(version.client_download().unwrap().url.as_str(), "https://example.invalid/client.jar");
        assert_eq!(version.libraries.len(), 3);
        let classifiers = version.libraries[1].downloads.as_ref().unwrap().classifiers.as_ref().unwrap();
        assert!(classifiers.contains_key(&Ustr::from("natives-linux")));
        assert!(version.libraries[2].downloads.is_none());
    }

    #[test]
    fn assets_id_falls_back_to_version() {
        let version: MinecraftVersion = serde_json::from_str(r#"{"id": "1.20.1"}"#).unwrap();
        assert_eq!(version.assets_id().as_str(), "1.20.1");
    }
}
