use chrono::{DateTime, Utc};
use serde::Deserialize;
use ustr::Ustr;

#[derive(Deserialize, Clone, Debug)]
#[cfg_attr(debug_assertions, serde(deny_unknown_fields))]
pub struct MinecraftVersionManifest {
    pub latest: LatestMinecraftVersions,
    pub versions: Vec<MinecraftVersionLink>
}

impl MinecraftVersionManifest {
    pub fn find(&self, id: &str) -> Option<&MinecraftVersionLink> {
        self.versions.iter().find(|link| link.id == id)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[cfg_attr(debug_assertions, serde(deny_unknown_fields))]
pub struct LatestMinecraftVersions {
    pub release: Ustr,
    pub snapshot: Ustr,
}

// Mirrors serve the v1 manifest, which lacks sha1 and complianceLevel
#[derive(Deserialize, Clone, Debug)]
#[cfg_attr(debug_assertions, serde(deny_unknown_fields))]
#[serde(rename_all = "camelCase")]
pub struct MinecraftVersionLink {
    pub id: Ustr,
    pub r#type: MinecraftVersionType,
    pub url: Ustr,
    pub time: DateTime<Utc>,
    pub release_time: DateTime<Utc>,
    #[serde(default)]
    pub sha1: Option<Ustr>,
    #[serde(default)]
    pub compliance_level: Option<u32>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinecraftVersionType {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_version_in_v1_manifest() {
        let manifest: MinecraftVersionManifest = serde_json::from_str(r#"{
            "latest": {"release": "1.20.1", "snapshot": "23w31a"},
            "versions": [
                {"id": "23w31a", "type": "snapshot", "url": "https://example.invalid/a.json", "time": "2023-08-01T10:00:00+00:00", "releaseTime": "2023-08-01T10:00:00+00:00"},
                {"id": "1.20.1", "type": "release", "url": "https://example.invalid/b.json", "time": "2023-06-12T10:00:00+00:00", "releaseTime": "2023-06-12T10:00:00+00:00"}
            ]
        }"#).unwrap();

        let link = manifest.find("1.20.1").unwrap();
        assert_eq!(link.url.as_str(), "https://example.invalid/b.json");
        assert_eq!(link.r#type, MinecraftVersionType::Release);
        assert!(link.sha1.is_none());
        assert!(manifest.find("1.19").is_none());
    }
}
