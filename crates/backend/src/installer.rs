use std::sync::Arc;

use bridge::{handle::FrontendHandle, message::{MessageToFrontend, PrepareStage}};

use crate::{directories::LauncherDirectories, download::Downloader, mirrors::MirrorResolver};

/// Shared state of the acquisition pipeline.
///
/// Version, library and loader resolution are implemented as `impl Installer` blocks
/// in their own modules.
#[derive(Clone, Debug)]
pub struct Installer {
    pub directories: Arc<LauncherDirectories>,
    pub downloader: Downloader,
    pub mirrors: Arc<MirrorResolver>,
    pub sender: FrontendHandle,
}

impl Installer {
    pub fn new(directories: Arc<LauncherDirectories>, downloader: Downloader, mirrors: MirrorResolver, sender: FrontendHandle) -> Self {
        Self {
            directories,
            downloader,
            mirrors: Arc::new(mirrors),
            sender,
        }
    }

    pub(crate) fn enter_stage(&self, stage: PrepareStage) {
        self.sender.send(MessageToFrontend::StageChanged { stage });
    }
}
