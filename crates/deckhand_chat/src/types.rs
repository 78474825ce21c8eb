//! Core types for the chat layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat id (numeric, as assigned by the messaging platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// User id (numeric).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Message id within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session is one user in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat: ChatId,
    pub user: UserId,
}

impl SessionKey {
    pub fn new(chat: ChatId, user: UserId) -> Self {
        Self { chat, user }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat, self.user)
    }
}

/// The message a reply points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentMessage {
    pub id: MessageId,
    pub text: String,
}

/// What arrived from the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name arg1 arg2`
    Command { name: String, args: Vec<String> },
    /// A button press carrying an opaque correlation token
    Selection { data: String, message: MessageId },
    /// Free text sent as a reply to another message
    Reply { text: String, parent: ParentMessage },
    /// Free text that replies to nothing
    Text { text: String },
}

/// One incoming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub chat: ChatId,
    pub user: UserId,
    /// Id of the user's own message, when there is one (not for button presses)
    pub message: Option<MessageId>,
    pub kind: EventKind,
}

impl IncomingEvent {
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.chat, self.user)
    }

    pub fn command(chat: ChatId, user: UserId, name: &str, args: &[&str]) -> Self {
        Self {
            chat,
            user,
            message: None,
            kind: EventKind::Command {
                name: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        }
    }

    pub fn selection(chat: ChatId, user: UserId, data: impl Into<String>, message: MessageId) -> Self {
        Self {
            chat,
            user,
            message: None,
            kind: EventKind::Selection {
                data: data.into(),
                message,
            },
        }
    }

    pub fn reply(chat: ChatId, user: UserId, text: impl Into<String>, parent: ParentMessage) -> Self {
        Self {
            chat,
            user,
            message: None,
            kind: EventKind::Reply {
                text: text.into(),
                parent,
            },
        }
    }

    pub fn with_message(mut self, message: MessageId) -> Self {
        self.message = Some(message);
        self
    }
}

/// Parse `/cmd@botname arg1 arg2` into a command name and args.
pub fn parse_command_text(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, parts.map(str::to_string).collect()))
}

/// A labeled button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Extra presentation attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Markup {
    #[default]
    None,
    /// Rows of buttons
    Buttons(Vec<Vec<Button>>),
    /// Ask the client to open a reply to this message
    ForceReply { placeholder: Option<String> },
}

/// A message to send or an edit to apply. Text is HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Markup,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::None,
        }
    }

    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.markup = Markup::Buttons(rows);
        self
    }

    pub fn force_reply(mut self, placeholder: Option<String>) -> Self {
        self.markup = Markup::ForceReply { placeholder };
        self
    }

    pub fn demands_reply(&self) -> bool {
        matches!(self.markup, Markup::ForceReply { .. })
    }
}
