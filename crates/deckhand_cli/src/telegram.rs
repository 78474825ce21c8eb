//! Telegram Bot API front end.
//!
//! Long-polls `getUpdates`, turns each update into an [`IncomingEvent`] and
//! queues it for the dispatcher. Outgoing messages go through the
//! [`ChatTransport`] impl.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deckhand_chat::{
    parse_command_text, ChatError, ChatId, ChatResult, ChatTransport, CommandSpec, EventKind,
    IncomingEvent, Markup, MessageId, OutgoingMessage, ParentMessage, SessionQueues, UserId,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Default Bot API root.
pub const TELEGRAM_API_ROOT: &str = "https://api.telegram.org";

/// Telegram caps the reply placeholder at 64 characters.
const MAX_PLACEHOLDER_CHARS: usize = 64;

/// Pause after a failed `getUpdates` before polling again.
const POLL_BACKOFF: Duration = Duration::from_secs(3);

/// Thin client over the Bot API methods the bot uses.
pub struct TelegramBot {
    client: reqwest::Client,
    /// `{root}/bot{token}`; never logged
    base: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

impl TelegramBot {
    /// Build a client. The HTTP timeout must outlast the long poll.
    pub fn new(token: &str, poll_timeout_secs: u64) -> ChatResult<Self> {
        Self::with_api_root(TELEGRAM_API_ROOT, token, poll_timeout_secs)
    }

    pub fn with_api_root(root: &str, token: &str, poll_timeout_secs: u64) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 15))
            .build()
            .map_err(|e| ChatError::Transport(e.without_url().to_string()))?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", root.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> ChatResult<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("{}: {}", method, e.without_url())))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("{}: {}", method, e.without_url())))?;

        if !envelope.ok {
            return Err(ChatError::Transport(format!(
                "{} failed ({}): {}",
                method,
                envelope.error_code.unwrap_or_default(),
                envelope.description.unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| ChatError::Transport(format!("{}: empty result", method)))
    }

    /// The bot's own account.
    pub async fn get_me(&self) -> ChatResult<TgUser> {
        self.call("getMe", json!({})).await
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> ChatResult<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    /// Stop the client's spinner on a pressed button.
    pub async fn answer_callback(&self, query_id: &str) -> ChatResult<()> {
        let _: bool = self
            .call("answerCallbackQuery", json!({ "callback_query_id": query_id }))
            .await?;
        Ok(())
    }

    /// Advertise the command menu.
    pub async fn set_commands(&self, commands: &[CommandSpec]) -> ChatResult<()> {
        let _: bool = self
            .call("setMyCommands", commands_payload(commands))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramBot {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> ChatResult<MessageId> {
        let mut payload = json!({
            "chat_id": chat.0,
            "text": message.text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(markup) = reply_markup(&message.markup) {
            payload["reply_markup"] = markup;
        }
        let sent: TgMessage = self.call("sendMessage", payload).await?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit(&self, chat: ChatId, id: MessageId, message: OutgoingMessage) -> ChatResult<()> {
        let mut payload = json!({
            "chat_id": chat.0,
            "message_id": id.0,
            "text": message.text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        // Edits only accept inline keyboards
        if let Markup::Buttons(_) = message.markup {
            if let Some(markup) = reply_markup(&message.markup) {
                payload["reply_markup"] = markup;
            }
        }
        match self.call::<Value>("editMessageText", payload).await {
            Ok(_) => Ok(()),
            Err(ChatError::Transport(msg)) if msg.contains("message is not modified") => {
                debug!("Edit of {:?} in {} changed nothing", id, chat);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn pin(&self, chat: ChatId, id: MessageId) -> ChatResult<()> {
        let _: bool = self
            .call(
                "pinChatMessage",
                json!({ "chat_id": chat.0, "message_id": id.0, "disable_notification": true }),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, chat: ChatId, id: MessageId) -> ChatResult<()> {
        let _: bool = self
            .call("deleteMessage", json!({ "chat_id": chat.0, "message_id": id.0 }))
            .await?;
        Ok(())
    }
}

/// Telegram `reply_markup` for a message, if it carries any.
pub fn reply_markup(markup: &Markup) -> Option<Value> {
    match markup {
        Markup::None => None,
        Markup::Buttons(rows) => {
            let keyboard: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.label, "callback_data": b.data }))
                        .collect()
                })
                .collect();
            Some(json!({ "inline_keyboard": keyboard }))
        }
        Markup::ForceReply { placeholder } => {
            let mut value = json!({ "force_reply": true, "selective": true });
            if let Some(text) = placeholder {
                let text: String = text.chars().take(MAX_PLACEHOLDER_CHARS).collect();
                value["input_field_placeholder"] = Value::String(text);
            }
            Some(value)
        }
    }
}

fn commands_payload(commands: &[CommandSpec]) -> Value {
    let list: Vec<Value> = commands
        .iter()
        .map(|c| json!({ "command": c.name, "description": c.description }))
        .collect();
    json!({ "commands": list })
}

/// Translate an update into a dispatcher event. Updates from bots, updates
/// without text and anything else the bot does not handle yield `None`.
pub fn event_from_update(update: &Update) -> Option<IncomingEvent> {
    if let Some(query) = &update.callback_query {
        let message = query.message.as_ref()?;
        let data = query.data.as_ref()?;
        if query.from.is_bot {
            return None;
        }
        return Some(IncomingEvent::selection(
            ChatId(message.chat.id),
            UserId(query.from.id),
            data.clone(),
            MessageId(message.message_id),
        ));
    }

    let message = update.message.as_ref()?;
    let from = message.from.as_ref().filter(|u| !u.is_bot)?;
    let text = message.text.as_ref()?;

    let kind = if let Some((name, args)) = parse_command_text(text) {
        EventKind::Command { name, args }
    } else if let Some(parent) = &message.reply_to_message {
        EventKind::Reply {
            text: text.clone(),
            parent: ParentMessage {
                id: MessageId(parent.message_id),
                text: parent.text.clone().unwrap_or_default(),
            },
        }
    } else {
        EventKind::Text { text: text.clone() }
    };

    Some(IncomingEvent {
        chat: ChatId(message.chat.id),
        user: UserId(from.id),
        message: Some(MessageId(message.message_id)),
        kind,
    })
}

/// Poll until `shutdown` resolves. Events go to the per-session queues, which
/// keep each session's delivery order.
pub async fn run_polling<F>(
    bot: Arc<TelegramBot>,
    queues: SessionQueues,
    poll_timeout_secs: u64,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut offset = 0i64;
    info!("Polling for updates");

    loop {
        let updates = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping poller");
                break;
            }
            result = bot.get_updates(offset, poll_timeout_secs) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            if let Some(query) = &update.callback_query {
                let bot = Arc::clone(&bot);
                let query_id = query.id.clone();
                tokio::spawn(async move {
                    if let Err(e) = bot.answer_callback(&query_id).await {
                        debug!("answerCallbackQuery failed: {}", e);
                    }
                });
            }

            match event_from_update(&update) {
                Some(event) => queues.submit(event),
                None => debug!("Skipping update {}", update.update_id),
            }
        }
    }
}
