use std::time::Duration;

use bridge::message::{BridgeNotificationType, MessageToFrontend};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

/// Draws backend progress messages as a single terminal bar.
pub struct ProgressRenderer {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl ProgressRenderer {
    pub fn spawn(mut receiver: UnboundedReceiver<MessageToFrontend>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        bar.enable_steady_tick(Duration::from_millis(120));

        let style = ProgressStyle::with_template("{spinner} {prefix:<28} [{bar:30}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);

        let draw = bar.clone();
        let task = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    MessageToFrontend::StageChanged { stage } => {
                        draw.set_prefix(stage.title());
                        draw.set_position(0);
                        draw.set_length(0);
                        draw.set_message("");
                    },
                    MessageToFrontend::Progress(event) => {
                        draw.set_prefix(event.stage.title());
                        draw.set_length(event.total as u64);
                        draw.set_position(event.current as u64);
                        draw.set_message(event.label.to_string());
                    },
                    MessageToFrontend::AddNotification { notification_type, message } => {
                        let tag = match notification_type {
                            BridgeNotificationType::Success => "ok",
                            BridgeNotificationType::Info => "info",
                            BridgeNotificationType::Warning => "warning",
                            BridgeNotificationType::Error => "error",
                        };
                        draw.suspend(|| eprintln!("[{tag}] {message}"));
                    },
                    MessageToFrontend::ProfileUpdated { .. } | MessageToFrontend::GameStatus(_) => {},
                }
            }
        });

        Self { bar, task }
    }

    pub fn finish(self) {
        self.task.abort();
        self.bar.finish_and_clear();
    }
}
