//! Event dispatch.
//!
//! One call to [`Dispatcher::handle`] per incoming event. Events of the same
//! session run one at a time; different sessions do not block each other.

use std::collections::HashSet;
use std::sync::Arc;

use deckhand_api::{ApiError, ApiResult, ApiToken, CronJob, ProviderClient, ServiceId};
use tracing::{debug, info, warn};

use crate::catalog::{self, CommandShape, ImmediateCommand, ServiceAction};
use crate::continuation::{self, Resolution};
use crate::error::ChatResult;
use crate::format;
use crate::pending::{CollectAction, PendingKind};
use crate::selection::{self, SelectionToken};
use crate::session::SessionStore;
use crate::transport::ChatTransport;
use crate::types::{
    ChatId, EventKind, IncomingEvent, MessageId, OutgoingMessage, ParentMessage, SessionKey,
    UserId,
};

/// Routes events to commands, selections and continuations.
pub struct Dispatcher {
    client: ProviderClient,
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<SessionStore>,
    allowed_users: HashSet<UserId>,
}

/// Per-event context.
struct Ctx {
    chat: ChatId,
    key: SessionKey,
    /// The user's own message, if the event has one
    message: Option<MessageId>,
}

impl Dispatcher {
    pub fn new(
        client: ProviderClient,
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            client,
            transport,
            sessions,
            allowed_users: HashSet::new(),
        }
    }

    /// Restrict the bot to these users. An empty list allows everyone.
    pub fn with_allowed_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.allowed_users = users.into_iter().collect();
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn is_allowed(&self, user: UserId) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user)
    }

    /// Handle one event. Only transport failures are returned; upstream
    /// failures are reported to the user.
    pub async fn handle(&self, event: IncomingEvent) -> ChatResult<()> {
        if !self.is_allowed(event.user) {
            info!("Rejected event from unauthorized user {}", event.user);
            self.send(event.chat, OutgoingMessage::text(format::not_authorized()))
                .await?;
            return Ok(());
        }

        let key = event.session_key();
        let _guard = self.sessions.lock(key).await;
        let ctx = Ctx {
            chat: event.chat,
            key,
            message: event.message,
        };

        match event.kind {
            EventKind::Command { name, args } => self.on_command(&ctx, &name, &args).await,
            EventKind::Selection { data, message } => self.on_selection(&ctx, &data, message).await,
            EventKind::Reply { text, parent } => self.on_reply(&ctx, &text, &parent).await,
            EventKind::Text { .. } => {
                debug!("Ignoring free text in {}", key);
                Ok(())
            }
        }
    }

    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> ChatResult<MessageId> {
        self.transport.send(chat, message).await
    }

    async fn reply(&self, ctx: &Ctx, text: String) -> ChatResult<MessageId> {
        self.send(ctx.chat, OutgoingMessage::text(text)).await
    }

    /// Fail fast when the session has no key.
    fn require_token(&self, key: SessionKey) -> ApiResult<ApiToken> {
        self.sessions.token(key).ok_or(ApiError::Unauthenticated)
    }

    async fn on_command(&self, ctx: &Ctx, name: &str, args: &[String]) -> ChatResult<()> {
        let dropped = self.sessions.clear_pending(ctx.key);
        if dropped > 0 {
            debug!("/{} dropped {} pending prompt(s) in {}", name, dropped, ctx.key);
        }

        let Some(spec) = catalog::lookup(name) else {
            self.reply(ctx, format::unknown_command(name)).await?;
            return Ok(());
        };
        debug!("/{} in {}", spec.name, ctx.key);

        match spec.shape {
            CommandShape::Immediate(command) => self.on_immediate(ctx, command, args).await,
            shape => {
                let token = match self.require_token(ctx.key) {
                    Ok(token) => token,
                    Err(err) => {
                        self.reply(ctx, format::api_error(&err)).await?;
                        return Ok(());
                    }
                };
                match args.first() {
                    Some(raw) => match ServiceId::parse(raw) {
                        Ok(service) => self.run_selected(ctx, &token, shape, service, None).await,
                        Err(_) => {
                            self.reply(ctx, format::invalid_service_id(raw)).await?;
                            Ok(())
                        }
                    },
                    None => self.offer_services(ctx, &token, shape).await,
                }
            }
        }
    }

    async fn on_immediate(
        &self,
        ctx: &Ctx,
        command: ImmediateCommand,
        args: &[String],
    ) -> ChatResult<()> {
        match command {
            ImmediateCommand::Start | ImmediateCommand::Help => {
                self.reply(ctx, format::help_text()).await?;
            }
            ImmediateCommand::Login => match args.first() {
                Some(raw) => self.login(ctx, raw, ctx.message).await?,
                None => self.prompt(ctx, PendingKind::Login).await?,
            },
            ImmediateCommand::Logout => {
                self.sessions.clear(ctx.key);
                info!("Session {} logged out", ctx.key);
                self.reply(ctx, format::logged_out()).await?;
            }
            ImmediateCommand::Services => {
                let message = match self.services_overview(ctx.key).await {
                    Ok(message) => message,
                    Err(err) => OutgoingMessage::text(format::api_error(&err)),
                };
                self.send(ctx.chat, message).await?;
            }
            ImmediateCommand::Account => {
                let text = match self.account(ctx.key).await {
                    Ok(text) => text,
                    Err(err) => format::api_error(&err),
                };
                self.reply(ctx, text).await?;
            }
            ImmediateCommand::Scale => {
                let text = match self.scale(ctx.key, args).await {
                    Ok(text) => text,
                    Err(err) => format::api_error(&err),
                };
                self.reply(ctx, text).await?;
            }
            ImmediateCommand::Usage => {
                let text = match self.usage(ctx.key).await {
                    Ok(text) => text,
                    Err(err) => format::api_error(&err),
                };
                self.reply(ctx, text).await?;
            }
            ImmediateCommand::CronJobs => {
                let message = match self.cron_overview(ctx.key).await {
                    Ok(message) => message,
                    Err(err) => OutgoingMessage::text(format::api_error(&err)),
                };
                self.send(ctx.chat, message).await?;
            }
            ImmediateCommand::RunCron => {
                let text = match args.first() {
                    Some(id) => self.run_cron(ctx.key, id).await,
                    None => Ok(format::run_cron_usage()),
                };
                let text = text.unwrap_or_else(|err| format::api_error(&err));
                self.reply(ctx, text).await?;
            }
            ImmediateCommand::Databases => {
                let text = match self.databases(ctx.key).await {
                    Ok(text) => text,
                    Err(err) => format::api_error(&err),
                };
                self.reply(ctx, text).await?;
            }
        }
        Ok(())
    }

    async fn usage(&self, key: SessionKey) -> ApiResult<String> {
        let token = self.require_token(key)?;
        Ok(format::usage(&self.client.usage(&token).await?))
    }

    async fn cron_overview(&self, key: SessionKey) -> ApiResult<OutgoingMessage> {
        let token = self.require_token(key)?;
        let jobs = self.client.list_cron_jobs(&token).await?;
        let buttons = selection::cron_buttons(&jobs);
        let message = OutgoingMessage::text(format::cron_jobs(&jobs));
        Ok(if buttons.is_empty() {
            message
        } else {
            message.with_buttons(buttons)
        })
    }

    async fn run_cron(&self, key: SessionKey, id: &str) -> ApiResult<String> {
        let token = self.require_token(key)?;
        if !CronJob::is_valid_id(id) {
            return Ok(format::run_cron_usage());
        }
        self.client.run_cron_job(&token, id).await?;
        info!("Session {} ran cron job {}", key, id);
        Ok(format::cron_triggered(id))
    }

    async fn databases(&self, key: SessionKey) -> ApiResult<String> {
        let token = self.require_token(key)?;
        Ok(format::databases(&self.client.list_databases(&token).await?))
    }

    async fn services_overview(&self, key: SessionKey) -> ApiResult<OutgoingMessage> {
        let token = self.require_token(key)?;
        let services = self.client.list_services(&token).await?;
        let buttons = selection::service_buttons(
            CommandShape::Selectable(ServiceAction::Info),
            &services,
        );
        let message = OutgoingMessage::text(format::service_list(&services));
        Ok(if buttons.is_empty() {
            message
        } else {
            message.with_buttons(buttons)
        })
    }

    async fn account(&self, key: SessionKey) -> ApiResult<String> {
        let token = self.require_token(key)?;
        let user = self.client.whoami(&token).await?;
        let owners = self.client.list_owners(&token).await?;
        Ok(format::account(&user, &owners))
    }

    async fn scale(&self, key: SessionKey, args: &[String]) -> ApiResult<String> {
        let token = self.require_token(key)?;
        let parsed = match args {
            [id, count] => ServiceId::parse(id)
                .ok()
                .zip(count.parse::<u32>().ok().filter(|n| *n >= 1)),
            _ => None,
        };
        let Some((service, instances)) = parsed else {
            return Ok(format::scale_usage());
        };
        self.client.scale(&token, &service, instances).await?;
        Ok(format::scaled(&service, instances))
    }

    /// Send the picker for a service command.
    async fn offer_services(
        &self,
        ctx: &Ctx,
        token: &ApiToken,
        shape: CommandShape,
    ) -> ChatResult<()> {
        let services = match self.client.list_services(token).await {
            Ok(services) => services,
            Err(err) => {
                self.reply(ctx, format::api_error(&err)).await?;
                return Ok(());
            }
        };
        let buttons = selection::service_buttons(shape, &services);
        if buttons.is_empty() {
            self.reply(ctx, format::no_services()).await?;
            return Ok(());
        }
        let text = format::pick_service(catalog::name_of(shape));
        self.send(ctx.chat, OutgoingMessage::text(text).with_buttons(buttons))
            .await?;
        Ok(())
    }

    async fn on_selection(&self, ctx: &Ctx, data: &str, message: MessageId) -> ChatResult<()> {
        if let Some(cron) = selection::cron_run_target(data) {
            let text = self
                .run_cron(ctx.key, cron)
                .await
                .unwrap_or_else(|err| format::api_error(&err));
            self.transport
                .edit(ctx.chat, message, OutgoingMessage::text(text))
                .await?;
            return Ok(());
        }
        let token = match SelectionToken::decode(data) {
            Ok(token) => token,
            Err(err) => {
                warn!("Ignoring selection in {}: {}", ctx.key, err);
                return Ok(());
            }
        };
        let api_token = match self.require_token(ctx.key) {
            Ok(api_token) => api_token,
            Err(err) => {
                self.transport
                    .edit(ctx.chat, message, OutgoingMessage::text(format::api_error(&err)))
                    .await?;
                return Ok(());
            }
        };
        self.run_selected(ctx, &api_token, token.shape, token.service, Some(message))
            .await
    }

    /// Run a service command once the service is known. Results of immediate
    /// actions replace `picker` when there is one.
    async fn run_selected(
        &self,
        ctx: &Ctx,
        token: &ApiToken,
        shape: CommandShape,
        service: ServiceId,
        picker: Option<MessageId>,
    ) -> ChatResult<()> {
        match shape {
            CommandShape::Selectable(action) => {
                let message = self.run_action(token, action, &service).await;
                match picker {
                    Some(id) => self.transport.edit(ctx.chat, id, message).await?,
                    None => {
                        self.send(ctx.chat, message).await?;
                    }
                }
            }
            CommandShape::Collect(action) => {
                self.prompt(ctx, PendingKind::Collect { action, service })
                    .await?;
            }
            CommandShape::Immediate(_) => {
                debug!("Immediate command selected in {}, nothing to do", ctx.key);
            }
        }
        Ok(())
    }

    async fn run_action(
        &self,
        token: &ApiToken,
        action: ServiceAction,
        service: &ServiceId,
    ) -> OutgoingMessage {
        let client = &self.client;
        let result = match action {
            ServiceAction::Info => {
                return match client.get_service(token, service).await {
                    Ok(details) => OutgoingMessage::text(format::service_details(&details))
                        .with_buttons(selection::detail_buttons(&details)),
                    Err(err) => OutgoingMessage::text(format::api_error(&err)),
                };
            }
            ServiceAction::Deploys => client
                .list_deploys(token, service)
                .await
                .map(|deploys| format::deploys(service, &deploys)),
            ServiceAction::Deploy => client
                .trigger_deploy(token, service)
                .await
                .map(|deploy| format::deploy_triggered(service, deploy.as_ref())),
            ServiceAction::Cancel => client
                .cancel_latest_deploy(token, service)
                .await
                .map(|outcome| format::cancel_outcome(service, &outcome)),
            ServiceAction::Suspend => client
                .suspend(token, service)
                .await
                .map(|_| format::suspended(service)),
            ServiceAction::Resume => client
                .resume(token, service)
                .await
                .map(|_| format::resumed(service)),
            ServiceAction::Env => client
                .list_env_vars(token, service)
                .await
                .map(|vars| format::env_vars(service, &vars)),
            ServiceAction::Logs => client
                .recent_logs(token, service)
                .await
                .map(|page| format::logs(service, &page)),
        };
        OutgoingMessage::text(result.unwrap_or_else(|err| format::api_error(&err)))
    }

    /// Send a reply-seeking prompt and record what it waits for.
    async fn prompt(&self, ctx: &Ctx, kind: PendingKind) -> ChatResult<()> {
        let message = OutgoingMessage::text(kind.prompt())
            .force_reply(Some(kind.placeholder().to_string()));
        let id = self.send(ctx.chat, message).await?;
        let pending = self.sessions.register_pending(ctx.key, id, kind);
        debug!(
            "Prompt {:?} in {} waits until {}",
            id, ctx.key, pending.expires_at
        );
        Ok(())
    }

    async fn on_reply(&self, ctx: &Ctx, text: &str, parent: &ParentMessage) -> ChatResult<()> {
        match continuation::resolve(&self.sessions, ctx.key, parent) {
            Resolution::Ignored => Ok(()),
            Resolution::Expired => {
                self.reply(ctx, format::prompt_expired()).await?;
                Ok(())
            }
            Resolution::Login => self.login(ctx, text, ctx.message).await,
            Resolution::Collect { action, service } => {
                self.collect(ctx, action, &service, text).await
            }
        }
    }

    async fn collect(
        &self,
        ctx: &Ctx,
        action: CollectAction,
        service: &ServiceId,
        text: &str,
    ) -> ChatResult<()> {
        let reply = match self.require_token(ctx.key) {
            Ok(token) => continuation::complete(&self.client, &token, action, service, text).await,
            Err(err) => format::api_error(&err),
        };
        self.reply(ctx, reply).await?;
        Ok(())
    }

    /// Validate a key and store it on success. The message that carried the
    /// key is removed from the chat either way.
    async fn login(&self, ctx: &Ctx, raw: &str, carrier: Option<MessageId>) -> ChatResult<()> {
        let failure = match ApiToken::new(raw) {
            None => Some(format::invalid_key()),
            Some(token) => match self.client.validate_token(&token).await {
                Ok(user) => {
                    self.sessions.set_token(ctx.key, token);
                    info!("Session {} logged in", ctx.key);
                    let id = self.reply(ctx, format::logged_in(&user)).await?;
                    if let Err(err) = self.transport.pin(ctx.chat, id).await {
                        warn!("Could not pin login confirmation in {}: {}", ctx.key, err);
                    }
                    None
                }
                Err(err) => {
                    info!("Login rejected in {}: {}", ctx.key, err);
                    Some(format::login_rejected(&err))
                }
            },
        };

        if let Some(id) = carrier {
            if let Err(err) = self.transport.delete(ctx.chat, id).await {
                warn!("Could not delete key message in {}: {}", ctx.key, err);
            }
        }

        if let Some(text) = failure {
            self.reply(ctx, text).await?;
        }
        Ok(())
    }
}
