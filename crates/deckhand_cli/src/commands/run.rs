//! Run command - start the bot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{error, info, warn};

use deckhand_api::{HttpGateway, ProviderClient};
use deckhand_chat::{Dispatcher, SessionQueues, SessionStore, COMMANDS};

use crate::config::{BotConfig, FileConfig};
use crate::health;
use crate::telegram::{run_polling, TelegramBot};

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// YAML config file; flags and environment override it
    #[arg(short, long, env = "DECKHAND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Render API base URL
    #[arg(long, env = "RENDER_API_BASE")]
    pub api_base: Option<String>,

    /// Port of the liveness endpoint
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Telegram user ids allowed to use the bot (everyone when empty)
    #[arg(long, env = "ALLOWED_USERS", value_delimiter = ',')]
    pub allowed_users: Vec<i64>,

    /// Seconds a prompt waits for its reply
    #[arg(long, env = "PENDING_TTL_SECS")]
    pub pending_ttl_secs: Option<u64>,

    /// Forget API keys after this many seconds (0 keeps them until logout)
    #[arg(long, env = "TOKEN_TTL_SECS")]
    pub token_ttl_secs: Option<u64>,

    /// Timeout for Render API calls, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Long-poll timeout for Telegram updates, in seconds
    #[arg(long, env = "POLL_TIMEOUT_SECS")]
    pub poll_timeout_secs: Option<u64>,
}

impl RunArgs {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            bot_token: self.bot_token.clone(),
            api_base: self.api_base.clone(),
            port: self.port,
            allowed_users: self.allowed_users.clone(),
            pending_ttl_secs: self.pending_ttl_secs,
            token_ttl_secs: self.token_ttl_secs,
            http_timeout_secs: self.http_timeout_secs,
            poll_timeout_secs: self.poll_timeout_secs,
        }
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let config = BotConfig::resolve(args.config.as_deref(), args.overrides())?;
    info!(
        "Starting deckhand (api: {}, port: {}, allowed users: {})",
        config.api.base_url,
        config.port,
        if config.allowed_users.is_empty() {
            "everyone".to_string()
        } else {
            config.allowed_users.len().to_string()
        }
    );

    let gateway = HttpGateway::new(config.api.clone()).context("Failed to build API client")?;
    let client = ProviderClient::new(Arc::new(gateway));

    let bot = Arc::new(
        TelegramBot::new(&config.bot_token, config.poll_timeout_secs)
            .context("Failed to build Telegram client")?,
    );
    let me = bot.get_me().await.context("Telegram rejected the bot token")?;
    info!(
        "Connected as @{}",
        me.username.as_deref().unwrap_or("unknown")
    );

    if let Err(e) = bot.set_commands(COMMANDS).await {
        warn!("Could not register the command menu: {}", e);
    }

    let sessions = Arc::new(SessionStore::new(config.sessions));
    let dispatcher = Arc::new(
        Dispatcher::new(client, bot.clone(), sessions).with_allowed_users(config.allowed_users),
    );

    let port = config.port;
    let health = tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            error!("Health endpoint stopped: {:#}", e);
        }
    });

    let queues = SessionQueues::new(dispatcher);
    run_polling(bot, queues, config.poll_timeout_secs, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    health.abort();
    println!("👋 deckhand stopped");
    Ok(())
}
