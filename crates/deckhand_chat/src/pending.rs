//! Pending actions: what a reply-seeking prompt is waiting for.
//!
//! A pending action is recorded under the id of the prompt message that was
//! sent. The prompt text still carries the service id and a marker phrase so
//! a reader (and the consistency check in the resolver) can tell which action
//! it belongs to, but the record is the source of truth.

use chrono::{DateTime, Utc};
use deckhand_api::ServiceId;

use crate::types::MessageId;

/// Actions that need free text after a service was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectAction {
    SetEnvVar,
    DeleteEnvVar,
    ReplaceEnvVars,
    Rename,
    BuildCommand,
    StartCommand,
    BuildFilter,
    DeleteService,
}

impl CollectAction {
    pub const ALL: [CollectAction; 8] = [
        CollectAction::SetEnvVar,
        CollectAction::DeleteEnvVar,
        CollectAction::ReplaceEnvVars,
        CollectAction::Rename,
        CollectAction::BuildCommand,
        CollectAction::StartCommand,
        CollectAction::BuildFilter,
        CollectAction::DeleteService,
    ];

    /// Phrase that identifies the prompt of this action.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::SetEnvVar => "add or update",
            Self::DeleteEnvVar => "to DELETE",
            Self::ReplaceEnvVars => "REPLACE ALL",
            Self::Rename => "name",
            Self::BuildCommand => "Build command",
            Self::StartCommand => "Start",
            Self::BuildFilter => "IGNORE",
            Self::DeleteService => "PERMANENTLY DELETE",
        }
    }

    /// Prompt sent once the service is known. Contains the id and the marker.
    pub fn prompt(&self, service: &ServiceId) -> String {
        match self {
            Self::SetEnvVar => format!(
                "🔧 Reply with <code>KEY=VALUE</code> to add or update an environment variable on <code>{}</code>.",
                service
            ),
            Self::DeleteEnvVar => format!(
                "🗑 Reply with the variable KEY to DELETE from <code>{}</code>.",
                service
            ),
            Self::ReplaceEnvVars => format!(
                "⚠️ Reply with <code>KEY=VALUE</code> lines, one per line. They REPLACE ALL environment variables of <code>{}</code>.",
                service
            ),
            Self::Rename => format!("✏️ Reply with the new name for <code>{}</code>.", service),
            Self::BuildCommand => format!(
                "🔨 Reply with the new Build command for <code>{}</code>.",
                service
            ),
            Self::StartCommand => format!(
                "▶️ Reply with the new Start command for <code>{}</code>.",
                service
            ),
            Self::BuildFilter => format!(
                "🧹 Reply with build filter paths for <code>{}</code>, one glob per line. Prefix a line with IGNORE to exclude that path.",
                service
            ),
            Self::DeleteService => format!(
                "☠️ Reply <b>CONFIRM</b> to PERMANENTLY DELETE <code>{}</code>. Any other reply cancels.",
                service
            ),
        }
    }

    /// Input hint shown in the reply box.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::SetEnvVar => "KEY=VALUE",
            Self::DeleteEnvVar => "KEY",
            Self::ReplaceEnvVars => "A=1\nB=2",
            Self::Rename => "new-name",
            Self::BuildCommand => "npm run build",
            Self::StartCommand => "npm start",
            Self::BuildFilter => "src/**",
            Self::DeleteService => "CONFIRM",
        }
    }
}

/// Phrase identifying the login prompt.
pub const LOGIN_MARKER: &str = "API";

/// Text of the login prompt.
pub fn login_prompt() -> String {
    format!(
        "🔑 Reply to this message with your Render {} key. It is kept in memory only.",
        LOGIN_MARKER
    )
}

/// What a prompt is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    Login,
    Collect {
        action: CollectAction,
        service: ServiceId,
    },
}

impl PendingKind {
    pub fn prompt(&self) -> String {
        match self {
            Self::Login => login_prompt(),
            Self::Collect { action, service } => action.prompt(service),
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Login => "rnd_...",
            Self::Collect { action, .. } => action.placeholder(),
        }
    }
}

/// Markers in the order they are tested. More specific phrases come first so
/// a prompt classifies to exactly one action.
const MARKER_PRIORITY: [CollectAction; 8] = [
    CollectAction::DeleteService,
    CollectAction::ReplaceEnvVars,
    CollectAction::DeleteEnvVar,
    CollectAction::SetEnvVar,
    CollectAction::BuildFilter,
    CollectAction::StartCommand,
    CollectAction::BuildCommand,
    CollectAction::Rename,
];

/// Classify a prompt's text. Returns at most one kind.
pub fn classify_prompt(text: &str) -> Option<PendingKind> {
    if let Some(action) = MARKER_PRIORITY
        .iter()
        .copied()
        .find(|action| text.contains(action.marker()))
    {
        let service = ServiceId::find_in(text)?;
        return Some(PendingKind::Collect { action, service });
    }
    if text.contains(LOGIN_MARKER) {
        return Some(PendingKind::Login);
    }
    None
}

/// A recorded prompt awaiting its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub prompt: MessageId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
