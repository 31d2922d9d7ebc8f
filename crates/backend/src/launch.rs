use std::{future::Future, path::PathBuf, sync::{atomic::{AtomicBool, Ordering}, Arc}};

use bridge::{handle::FrontendHandle, message::{GameEvent, MessageToFrontend}};
use schema::{launch::{LaunchAuthorization, LaunchConfiguration, LaunchVersion, OFFLINE_ACCESS_TOKEN}, profile::UserProfile, settings::LauncherSettings};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{directories::LauncherDirectories, java::JavaError};

#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    #[error("The game is already running")]
    AlreadyRunning,
    #[error("No signed-in profile")]
    NotSignedIn,
    #[error("Failed to resolve Java:\n{0}")]
    Java(#[from] JavaError),
    #[error("Failed to perform I/O operation:\n{0}")]
    Io(#[from] std::io::Error),
    #[error("Launch routine failed: {0}")]
    Routine(Arc<str>),
}

/// A running game as reported by a [`LaunchRoutine`].
///
/// The routine must end the event stream with [`GameEvent::Exited`] or [`GameEvent::Error`],
/// or close the channel once the process is gone.
pub struct GameSession {
    pub pid: Option<u32>,
    pub events: UnboundedReceiver<GameEvent>,
}

/// Turns a [`LaunchConfiguration`] into a running game.
pub trait LaunchRoutine: Send + Sync + 'static {
    fn launch(&self, configuration: LaunchConfiguration) -> impl Future<Output = Result<GameSession, LaunchError>> + Send;
}

/// Refuses a second launch while a game started through it is still running.
pub struct Launcher<R> {
    routine: Arc<R>,
    running: Arc<AtomicBool>,
    sender: FrontendHandle,
}

impl<R> Clone for Launcher<R> {
    fn clone(&self) -> Self {
        Self {
            routine: Arc::clone(&self.routine),
            running: Arc::clone(&self.running),
            sender: self.sender.clone(),
        }
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<R: LaunchRoutine> Launcher<R> {
    pub fn new(routine: R, sender: FrontendHandle) -> Self {
        Self {
            routine: Arc::new(routine),
            running: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the game and forwards its lifecycle to the frontend until it exits.
    pub async fn launch(&self, configuration: LaunchConfiguration) -> Result<Option<u32>, LaunchError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(LaunchError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        log::info!("Launching {} as {}", configuration.version.custom, configuration.authorization.name);
        let session = match self.routine.launch(configuration).await {
            Ok(session) => session,
            Err(error) => {
                log::error!("Launch failed: {error}");
                self.sender.send(MessageToFrontend::GameStatus(GameEvent::Error { message: error.to_string().into() }));
                return Err(error);
            },
        };

        let pid = session.pid;
        self.sender.send(MessageToFrontend::GameStatus(GameEvent::Spawned { pid }));
        tokio::spawn(forward_events(session.events, self.sender.clone(), guard));
        Ok(pid)
    }
}

async fn forward_events(mut events: UnboundedReceiver<GameEvent>, sender: FrontendHandle, guard: RunningGuard) {
    while let Some(event) = events.recv().await {
        let terminal = event.is_terminal();
        match &event {
            GameEvent::Exited { code } => log::info!("Game exited with code {code:?}"),
            GameEvent::Error { message } => log::error!("Game error: {message}"),
            _ => {},
        }

        // Clear the flag before the frontend hears about the exit so it can relaunch right away
        if terminal {
            drop(guard);
            sender.send(MessageToFrontend::GameStatus(event));
            return;
        }
        sender.send(MessageToFrontend::GameStatus(event));
    }

    drop(guard);
    log::info!("Game event stream closed");
    sender.send(MessageToFrontend::GameStatus(GameEvent::Exited { code: None }));
}

/// Builds the handoff for one launch attempt. Authorization is always offline.
pub fn build_configuration(
    profile: &UserProfile,
    settings: &LauncherSettings,
    directories: &LauncherDirectories,
    java_path: PathBuf,
) -> LaunchConfiguration {
    LaunchConfiguration {
        root: directories.root.clone(),
        game_directory: directories.root.clone(),
        version: LaunchVersion::release(settings.minecraft_version),
        memory: settings.memory.bounds(),
        java_path,
        authorization: LaunchAuthorization {
            name: profile.name.clone(),
            uuid: profile.uuid,
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            offline: true,
        },
        server: settings.server.clone(),
        jvm_args: settings.jvm_args.clone(),
    }
}
