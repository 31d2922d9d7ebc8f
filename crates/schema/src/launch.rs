use std::{path::PathBuf, sync::Arc};

use serde::Serialize;
use ustr::Ustr;
use uuid::Uuid;

use crate::settings::{MemoryBounds, ServerAddress};

/// Token handed to the game when the platform token must not leave the launcher.
pub const OFFLINE_ACCESS_TOKEN: &str = "0";

/// Everything the external launch routine needs. Built per attempt, never persisted.
#[derive(Serialize, Debug, Clone)]
pub struct LaunchConfiguration {
    pub root: PathBuf,
    pub game_directory: PathBuf,
    pub version: LaunchVersion,
    pub memory: MemoryBounds,
    pub java_path: PathBuf,
    pub authorization: LaunchAuthorization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jvm_args: Vec<Arc<str>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LaunchVersion {
    pub number: Ustr,
    pub r#type: &'static str,
    pub custom: Arc<str>,
}

impl LaunchVersion {
    pub fn release(number: Ustr) -> Self {
        Self {
            number,
            r#type: "release",
            custom: format!("eminium-{number}").into(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct LaunchAuthorization {
    pub name: Arc<str>,
    pub uuid: Uuid,
    pub access_token: Arc<str>,
    pub offline: bool,
}
