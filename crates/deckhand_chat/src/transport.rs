//! Messaging front end abstraction.
//!
//! The dispatcher only needs to send, edit, pin and delete messages. The
//! Telegram implementation lives in the binary; [`RecordingTransport`] is the
//! in-memory stand-in used by tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{ChatError, ChatResult};
use crate::types::{ChatId, MessageId, OutgoingMessage};

/// Messaging front end.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message and return its id.
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> ChatResult<MessageId>;

    /// Replace the text (and markup) of an existing message.
    async fn edit(&self, chat: ChatId, id: MessageId, message: OutgoingMessage) -> ChatResult<()>;

    /// Pin a message. Optional capability.
    async fn pin(&self, _chat: ChatId, _id: MessageId) -> ChatResult<()> {
        Ok(())
    }

    /// Delete a message. Optional capability.
    async fn delete(&self, _chat: ChatId, _id: MessageId) -> ChatResult<()> {
        Ok(())
    }
}

/// Everything a [`RecordingTransport`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Send {
        chat: ChatId,
        id: MessageId,
        message: OutgoingMessage,
    },
    Edit {
        chat: ChatId,
        id: MessageId,
        message: OutgoingMessage,
    },
    Pin {
        chat: ChatId,
        id: MessageId,
    },
    Delete {
        chat: ChatId,
        id: MessageId,
    },
}

/// In-memory transport that records calls and hands out sequential ids.
#[derive(Clone)]
pub struct RecordingTransport {
    calls: Arc<RwLock<Vec<TransportCall>>>,
    next_id: Arc<AtomicI64>,
    fail_sends: Arc<RwLock<Option<String>>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1000)),
            fail_sends: Arc::new(RwLock::new(None)),
        }
    }

    /// Make every send fail with the given message.
    pub fn fail_sends(self, message: impl Into<String>) -> Self {
        *self.fail_sends.write() = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.read().clone()
    }

    pub fn clear(&self) {
        self.calls.write().clear();
    }

    /// Messages sent so far, with their ids.
    pub fn sent(&self) -> Vec<(MessageId, OutgoingMessage)> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Send { id, message, .. } => Some((*id, message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Edits applied so far.
    pub fn edits(&self) -> Vec<(MessageId, OutgoingMessage)> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Edit { id, message, .. } => Some((*id, message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Text of the last sent or edited message.
    pub fn last_text(&self) -> Option<String> {
        self.calls.read().iter().rev().find_map(|c| match c {
            TransportCall::Send { message, .. } | TransportCall::Edit { message, .. } => {
                Some(message.text.clone())
            }
            _ => None,
        })
    }

    pub fn pinned(&self) -> Vec<MessageId> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Pin { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Delete { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> ChatResult<MessageId> {
        if let Some(msg) = self.fail_sends.read().clone() {
            return Err(ChatError::Transport(msg));
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.calls.write().push(TransportCall::Send { chat, id, message });
        Ok(id)
    }

    async fn edit(&self, chat: ChatId, id: MessageId, message: OutgoingMessage) -> ChatResult<()> {
        self.calls.write().push(TransportCall::Edit { chat, id, message });
        Ok(())
    }

    async fn pin(&self, chat: ChatId, id: MessageId) -> ChatResult<()> {
        self.calls.write().push(TransportCall::Pin { chat, id });
        Ok(())
    }

    async fn delete(&self, chat: ChatId, id: MessageId) -> ChatResult<()> {
        self.calls.write().push(TransportCall::Delete { chat, id });
        Ok(())
    }
}
