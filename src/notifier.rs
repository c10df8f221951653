//! Outbound delivery to the messaging platform.
//!
//! The engine never talks to a transport directly. It produces
//! [`Notification`] values, and the session task hands each one to a
//! [`Notifier`].

use crate::games::mutiny::{Correlation, PlayerId, SessionId};
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// One option of a choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct ChoiceOption {
    /// Returned as the action payload when picked.
    pub value: String,
    /// What the player sees.
    pub label: String,
}

/// A numeric field of a form prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct FormField {
    /// Key in the submitted values.
    pub name: String,
    /// What the player sees.
    pub label: String,
    /// Smallest accepted value.
    pub min: u32,
    /// Largest accepted value.
    pub max: u32,
}

/// A message the engine wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Visible to everyone in the session's channel.
    Announce {
        /// Target session.
        session_id: SessionId,
        /// Message body.
        text: String,
    },
    /// Visible only to one user, inside the session's channel.
    Private {
        /// Target session.
        session_id: SessionId,
        /// Recipient.
        user_id: PlayerId,
        /// Message body.
        text: String,
    },
    /// A direct message outside the channel.
    Direct {
        /// Recipient.
        user_id: PlayerId,
        /// Message body.
        text: String,
    },
    /// Pick one of several options.
    Choice {
        /// Recipient.
        user_id: PlayerId,
        /// Options to pick from.
        options: Vec<ChoiceOption>,
        /// Routes the answer back.
        correlation: Correlation,
    },
    /// Fill in a form.
    Form {
        /// Recipient.
        user_id: PlayerId,
        /// Fields to fill.
        fields: Vec<FormField>,
        /// Routes the answer back.
        correlation: Correlation,
    },
}

impl Notification {
    /// The user a targeted notification goes to.
    pub fn recipient(&self) -> Option<&PlayerId> {
        match self {
            Notification::Announce { .. } => None,
            Notification::Private { user_id, .. }
            | Notification::Direct { user_id, .. }
            | Notification::Choice { user_id, .. }
            | Notification::Form { user_id, .. } => Some(user_id),
        }
    }
}

/// Delivery failure reported by a transport.
#[derive(Debug, Clone, Display, Error)]
#[display("Notify error: {} at {}:{}", message, file, line)]
pub struct NotifyError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl NotifyError {
    /// Creates a new delivery error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Capability to reach players on the messaging platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts to the whole session.
    async fn announce(&self, session_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Posts to one user inside the session.
    async fn notify_privately(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), NotifyError>;

    /// Messages one user directly.
    async fn direct(&self, user_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Asks one user to pick an option.
    async fn prompt_choice(
        &self,
        user_id: &str,
        options: &[ChoiceOption],
        correlation: &Correlation,
    ) -> Result<(), NotifyError>;

    /// Asks one user to fill in a form.
    async fn prompt_form(
        &self,
        user_id: &str,
        fields: &[FormField],
        correlation: &Correlation,
    ) -> Result<(), NotifyError>;
}

/// Hands a notification to `notifier`.
///
/// Failures are logged and swallowed; game state never depends on delivery.
#[instrument(skip_all)]
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    let result = match notification {
        Notification::Announce { session_id, text } => notifier.announce(session_id, text).await,
        Notification::Private {
            session_id,
            user_id,
            text,
        } => notifier.notify_privately(session_id, user_id, text).await,
        Notification::Direct { user_id, text } => notifier.direct(user_id, text).await,
        Notification::Choice {
            user_id,
            options,
            correlation,
        } => notifier.prompt_choice(user_id, options, correlation).await,
        Notification::Form {
            user_id,
            fields,
            correlation,
        } => notifier.prompt_form(user_id, fields, correlation).await,
    };

    if let Err(e) = result {
        warn!(error = %e, recipient = ?notification.recipient(), "Delivery failed");
    }
}

/// Notifier that writes every message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn announce(&self, session_id: &str, text: &str) -> Result<(), NotifyError> {
        info!(session_id, "📣 {}", text);
        Ok(())
    }

    async fn notify_privately(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), NotifyError> {
        info!(session_id, user_id, "🔒 {}", text);
        Ok(())
    }

    async fn direct(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        info!(user_id, "✉️ {}", text);
        Ok(())
    }

    async fn prompt_choice(
        &self,
        user_id: &str,
        options: &[ChoiceOption],
        correlation: &Correlation,
    ) -> Result<(), NotifyError> {
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        info!(user_id, %correlation, ?labels, "Choice prompted");
        Ok(())
    }

    async fn prompt_form(
        &self,
        user_id: &str,
        fields: &[FormField],
        correlation: &Correlation,
    ) -> Result<(), NotifyError> {
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        info!(user_id, %correlation, ?names, "Form prompted");
        Ok(())
    }
}
