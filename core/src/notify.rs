//! Transient user notifications for mutation outcomes.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

/// Write operations that report their outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn verb(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl Notification {
    pub fn succeeded(kind: MutationKind) -> Self {
        let (title, description) = match kind {
            MutationKind::Create => ("Recipe created!", "Your new recipe has been saved."),
            MutationKind::Update => ("Recipe updated!", "Your changes have been saved."),
            MutationKind::Delete => ("Recipe deleted", "The recipe has been removed."),
        };
        Self {
            title: title.to_string(),
            description: description.to_string(),
            variant: Variant::Default,
        }
    }

    pub fn failed(kind: MutationKind, error: &ApiError) -> Self {
        Self {
            title: format!("Failed to {} recipe", kind.verb()),
            description: error.to_string(),
            variant: Variant::Destructive,
        }
    }
}

/// Sink for notifications. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            Variant::Default => info!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
            Variant::Destructive => warn!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
        }
    }
}

/// Forwards notifications to a channel, e.g. a UI toast queue.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A closed receiver means nobody is showing toasts any more.
        let _ = self.tx.send(notification);
    }
}
