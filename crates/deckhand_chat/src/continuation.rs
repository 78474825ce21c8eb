//! Resolving a free-text reply to the prompt it completes.
//!
//! The reply's parent message id is looked up in the session's pending table.
//! The record decides what happens; the parent text must still classify to the
//! same action and service, otherwise the reply is ignored.

use deckhand_api::{ApiResult, ApiToken, BuildFilter, EnvVar, ProviderClient, ServiceId};
use tracing::debug;

use crate::format;
use crate::input::{self, InputError};
use crate::pending::{classify_prompt, CollectAction, PendingKind};
use crate::session::{PendingLookup, SessionStore};
use crate::types::{ParentMessage, SessionKey};

/// What a reply turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not an answer to any live prompt
    Ignored,
    /// The prompt ran out of time
    Expired,
    /// Answer to the login prompt
    Login,
    /// Answer to a collect prompt
    Collect {
        action: CollectAction,
        service: ServiceId,
    },
}

/// Consume the pending record the reply points at.
pub fn resolve(store: &SessionStore, key: SessionKey, parent: &ParentMessage) -> Resolution {
    let action = match store.take_pending(key, parent.id) {
        PendingLookup::Missing => {
            debug!("Reply to {:?} in {} is not part of a flow", parent.id, key);
            return Resolution::Ignored;
        }
        PendingLookup::Expired => return Resolution::Expired,
        PendingLookup::Found(action) => action,
    };

    if classify_prompt(&parent.text).as_ref() != Some(&action.kind) {
        debug!(
            "Prompt {:?} in {} no longer matches its record, ignoring reply",
            parent.id, key
        );
        return Resolution::Ignored;
    }

    match action.kind {
        PendingKind::Login => Resolution::Login,
        PendingKind::Collect { action, service } => Resolution::Collect { action, service },
    }
}

/// A parsed reply, ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetEnvVar(EnvVar),
    DeleteEnvVar(String),
    ReplaceEnvVars(Vec<EnvVar>),
    Rename(String),
    BuildCommand(String),
    StartCommand(String),
    BuildFilter(BuildFilter),
    DeleteService,
    /// Deletion prompt answered with anything but the confirmation word
    CancelDeletion,
}

impl Mutation {
    /// Parse the reply for `action`. Nothing here touches the network.
    pub fn parse(action: CollectAction, text: &str) -> Result<Self, InputError> {
        Ok(match action {
            CollectAction::SetEnvVar => Self::SetEnvVar(input::parse_env_assignment(text)?),
            CollectAction::DeleteEnvVar => Self::DeleteEnvVar(input::parse_env_key(text)?),
            CollectAction::ReplaceEnvVars => Self::ReplaceEnvVars(input::parse_env_lines(text)?),
            CollectAction::Rename => Self::Rename(input::parse_required(text)?),
            CollectAction::BuildCommand => Self::BuildCommand(input::parse_required(text)?),
            CollectAction::StartCommand => Self::StartCommand(input::parse_required(text)?),
            CollectAction::BuildFilter => Self::BuildFilter(input::parse_build_filter(text)?),
            CollectAction::DeleteService if input::is_confirmation(text) => Self::DeleteService,
            CollectAction::DeleteService => Self::CancelDeletion,
        })
    }

    /// Run the mutation and render its confirmation.
    pub async fn apply(
        self,
        client: &ProviderClient,
        token: &ApiToken,
        service: &ServiceId,
    ) -> ApiResult<String> {
        let text = match self {
            Self::SetEnvVar(var) => {
                client.set_env_var(token, service, &var).await?;
                format::env_set(service, &var.key)
            }
            Self::DeleteEnvVar(key) => {
                let outcome = client.delete_env_var(token, service, &key).await?;
                format::env_deleted(service, &key, &outcome)
            }
            Self::ReplaceEnvVars(vars) => {
                client.replace_env_vars(token, service, &vars).await?;
                format::env_replaced(service, &vars)
            }
            Self::Rename(name) => {
                client.rename(token, service, &name).await?;
                format::renamed(service, &name)
            }
            Self::BuildCommand(command) => {
                client.update_build_command(token, service, &command).await?;
                format::build_command_updated(service, &command)
            }
            Self::StartCommand(command) => {
                client.update_start_command(token, service, &command).await?;
                format::start_command_updated(service, &command)
            }
            Self::BuildFilter(filter) => {
                client.update_build_filter(token, service, &filter).await?;
                format::build_filter_updated(service, &filter)
            }
            Self::DeleteService => {
                let outcome = client.delete_service(token, service).await?;
                format::service_deleted(service, &outcome)
            }
            Self::CancelDeletion => format::delete_cancelled(service),
        };
        Ok(text)
    }
}

/// Parse and apply a collect reply, always producing a user-facing message.
pub async fn complete(
    client: &ProviderClient,
    token: &ApiToken,
    action: CollectAction,
    service: &ServiceId,
    text: &str,
) -> String {
    let mutation = match Mutation::parse(action, text) {
        Ok(mutation) => mutation,
        Err(err) => {
            debug!("Rejected {:?} input for {}: {}", action, service, err);
            return format::input_rejected(&err);
        }
    };
    match mutation.apply(client, token, service).await {
        Ok(text) => text,
        Err(err) => format::api_error(&err),
    }
}
