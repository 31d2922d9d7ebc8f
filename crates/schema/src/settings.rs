use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize};
use ustr::Ustr;

pub const DEFAULT_MINECRAFT_VERSION: &str = "1.20.1";
pub const DEFAULT_FORGE_VERSION: &str = "47.3.0";
pub const DEFAULT_BUNDLE_URL: &str = "https://github.com/Eminium-Games/get-zip-for-eminium-launcher/archive/refs/heads/ZIP.zip";
pub const DEFAULT_PLATFORM_URL: &str = "https://eminium.ovh";

/// Launcher settings (`launcher.json`).
///
/// Each field falls back to its default on its own when the stored value is malformed.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LauncherSettings {
    #[serde(default = "default_minecraft_version", deserialize_with = "minecraft_version_or_default")]
    pub minecraft_version: Ustr,
    #[serde(default = "default_forge_version", deserialize_with = "forge_version_or_default")]
    pub forge_version: Ustr,
    #[serde(default = "default_bundle_url", deserialize_with = "crate::try_deserialize")]
    pub bundle_url: Option<Arc<str>>,
    #[serde(default = "default_platform_url", deserialize_with = "platform_url_or_default")]
    pub platform_url: Arc<str>,
    #[serde(default, deserialize_with = "crate::try_deserialize")]
    pub memory: MemoryConfiguration,
    #[serde(default, deserialize_with = "crate::try_deserialize", skip_serializing_if = "Option::is_none")]
    pub java_path: Option<PathBuf>,
    #[serde(default, deserialize_with = "crate::try_deserialize", skip_serializing_if = "Vec::is_empty")]
    pub jvm_args: Vec<Arc<str>>,
    #[serde(default, deserialize_with = "crate::try_deserialize", skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerAddress>,
    #[serde(default, deserialize_with = "crate::try_deserialize", skip_serializing_if = "Option::is_none")]
    pub bundled_archive: Option<PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            minecraft_version: default_minecraft_version(),
            forge_version: default_forge_version(),
            bundle_url: default_bundle_url(),
            platform_url: default_platform_url(),
            memory: MemoryConfiguration::default(),
            java_path: None,
            jvm_args: Vec::new(),
            server: None,
            bundled_archive: None,
        }
    }
}

fn default_minecraft_version() -> Ustr {
    DEFAULT_MINECRAFT_VERSION.into()
}

fn default_forge_version() -> Ustr {
    DEFAULT_FORGE_VERSION.into()
}

fn default_bundle_url() -> Option<Arc<str>> {
    Some(DEFAULT_BUNDLE_URL.into())
}

fn default_platform_url() -> Arc<str> {
    DEFAULT_PLATFORM_URL.into()
}

fn minecraft_version_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ustr, D::Error> {
    crate::try_deserialize_with(deserializer, default_minecraft_version)
}

fn forge_version_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ustr, D::Error> {
    crate::try_deserialize_with(deserializer, default_forge_version)
}

fn platform_url_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<str>, D::Error> {
    crate::try_deserialize_with(deserializer, default_platform_url)
}

/// Heap bounds in megabytes. Without an explicit minimum, 80% of the maximum is used.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    pub max: u32,
}

impl MemoryConfiguration {
    pub const DEFAULT_MAX: u32 = 4096;
    pub const FLOOR: u32 = 512;

    pub fn bounds(&self) -> MemoryBounds {
        let max = self.max.max(Self::FLOOR);
        let min = match self.min {
            Some(min) => min.clamp(Self::FLOOR.min(max), max),
            None => (max as u64 * 8 / 10) as u32,
        };
        MemoryBounds { min_mb: min, max_mb: max }
    }
}

impl Default for MemoryConfiguration {
    fn default() -> Self {
        Self {
            min: None,
            max: Self::DEFAULT_MAX,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryBounds {
    pub min_mb: u32,
    pub max_mb: u32,
}

impl MemoryBounds {
    pub fn jvm_args(&self) -> [String; 2] {
        [format!("-Xms{}M", self.min_mb), format!("-Xmx{}M", self.max_mb)]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: Arc<str>,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_port() -> u16 {
    25565
}
