//! # deckhand_chat - Chat command layer for deckhand
//!
//! Turns chat events into provider calls and renders the answers.
//!
//! ## Key Features
//!
//! - **Command catalog**: every command is immediate, selectable, or
//!   selectable-then-collect
//! - **Service pickers**: buttons carrying a `command:srv-…` token
//! - **Reply-to-continue**: prompts are recorded per session under the prompt's
//!   message id, consumed once, and expire
//! - **Per-session ordering**: one FIFO worker per user and chat
//! - **Transport agnostic**: the messaging front end is a trait
//!
//! ## Flow
//!
//! ```text
//! /rename ──▶ picker ──▶ "rename:srv-abc123" ──▶ prompt (pending record)
//!                                                     │
//!                          reply "my-new-name" ◀──────┘
//!                                   │
//!                                   ▼
//!                    PATCH services/srv-abc123 {name}
//! ```

pub mod catalog;
pub mod continuation;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod input;
pub mod pending;
pub mod queue;
pub mod selection;
pub mod session;
pub mod transport;
pub mod types;

pub use catalog::{CommandShape, CommandSpec, ImmediateCommand, ServiceAction, ALIASES, COMMANDS};
pub use continuation::{Mutation, Resolution};
pub use dispatcher::Dispatcher;
pub use error::{ChatError, ChatResult};
pub use input::InputError;
pub use pending::{classify_prompt, CollectAction, PendingAction, PendingKind};
pub use queue::SessionQueues;
pub use selection::SelectionToken;
pub use session::{
    Clock, PendingLookup, SessionSettings, SessionStore, SystemClock, DEFAULT_PENDING_TTL_SECS,
};
pub use transport::{ChatTransport, RecordingTransport, TransportCall};
pub use types::*;
