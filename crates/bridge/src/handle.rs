use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::message::{BridgeNotificationType, MessageToFrontend};

/// Sending half of the channel a presentation layer subscribes to.
///
/// Sends never block and never fail; a frontend that went away simply stops receiving.
#[derive(Clone, Debug)]
pub struct FrontendHandle {
    sender: UnboundedSender<MessageToFrontend>,
}

impl From<UnboundedSender<MessageToFrontend>> for FrontendHandle {
    fn from(sender: UnboundedSender<MessageToFrontend>) -> Self {
        Self { sender }
    }
}

impl FrontendHandle {
    pub fn channel() -> (Self, UnboundedReceiver<MessageToFrontend>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// A handle whose messages are dropped. Useful for headless callers.
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn send(&self, message: MessageToFrontend) {
        let _ = self.sender.send(message);
    }

    pub fn send_info(&self, message: impl Into<Arc<str>>) {
        self.notify(BridgeNotificationType::Info, message.into());
    }

    pub fn send_success(&self, message: impl Into<Arc<str>>) {
        self.notify(BridgeNotificationType::Success, message.into());
    }

    pub fn send_warning(&self, message: impl Into<Arc<str>>) {
        self.notify(BridgeNotificationType::Warning, message.into());
    }

    pub fn send_error(&self, message: impl Into<Arc<str>>) {
        self.notify(BridgeNotificationType::Error, message.into());
    }

    fn notify(&self, notification_type: BridgeNotificationType, message: Arc<str>) {
        self.send(MessageToFrontend::AddNotification { notification_type, message });
    }
}
