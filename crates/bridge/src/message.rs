use std::sync::Arc;

use schema::profile::UserProfile;
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum MessageToFrontend {
    Progress(ProgressEvent),
    StageChanged {
        stage: PrepareStage,
    },
    AddNotification {
        notification_type: BridgeNotificationType,
        message: Arc<str>,
    },
    ProfileUpdated {
        profile: Option<Arc<UserProfile>>,
    },
    GameStatus(GameEvent),
}

/// One completed unit of work within a stage.
///
/// `downloaded` is false when the item was already present on disk and only
/// the counter advanced.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: PrepareStage,
    pub current: usize,
    pub total: usize,
    pub label: Arc<str>,
    pub downloaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareStage {
    Folders,
    Migration,
    BundledContent,
    Bundle,
    VersionDescriptor,
    ClientJar,
    AssetIndex,
    AssetObjects,
    Libraries,
    LoaderInstaller,
    Sweep,
    Finished,
}

impl PrepareStage {
    pub fn title(self) -> &'static str {
        match self {
            PrepareStage::Folders => "Creating folders",
            PrepareStage::Migration => "Migrating legacy folders",
            PrepareStage::BundledContent => "Importing bundled content",
            PrepareStage::Bundle => "Synchronizing modpack",
            PrepareStage::VersionDescriptor => "Resolving version",
            PrepareStage::ClientJar => "Downloading client",
            PrepareStage::AssetIndex => "Downloading asset index",
            PrepareStage::AssetObjects => "Downloading assets",
            PrepareStage::Libraries => "Downloading libraries",
            PrepareStage::LoaderInstaller => "Downloading loader installer",
            PrepareStage::Sweep => "Checking libraries",
            PrepareStage::Finished => "Ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeNotificationType {
    Success,
    Info,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Spawned {
        pid: Option<u32>,
    },
    Output {
        line: Arc<str>,
    },
    Exited {
        code: Option<i32>,
    },
    Error {
        message: Arc<str>,
    },
}

impl GameEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::Exited { .. } | GameEvent::Error { .. })
    }
}
