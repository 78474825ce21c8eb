//! Check-key command - validate a Render API key from the shell.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deckhand_api::{ApiConfig, ApiToken, HttpGateway, ProviderClient, DEFAULT_BASE_URL};

#[derive(Args, Debug)]
pub struct CheckKeyArgs {
    /// Render API key to validate
    #[arg(long, env = "RENDER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Render API base URL
    #[arg(long, env = "RENDER_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,

    /// Also list the services the key can see
    #[arg(long)]
    services: bool,
}

pub async fn execute(args: CheckKeyArgs) -> Result<()> {
    let token = ApiToken::new(&args.api_key).context("API key is empty or contains whitespace")?;
    let gateway = HttpGateway::new(ApiConfig::new(args.api_base))?;
    let client = ProviderClient::new(Arc::new(gateway));

    info!("Validating API key");
    let user = client.validate_token(&token).await?;

    println!("✅ API key accepted");
    println!(
        "   Account: {}",
        user.name.as_deref().or(user.email.as_deref()).unwrap_or("unknown")
    );
    if let Some(email) = &user.email {
        println!("   Email:   {}", email);
    }

    if args.services {
        let services = client.list_services(&token).await?;
        println!("📦 {} service(s)", services.len());
        for service in services {
            println!("   {}  {}", service.id, service.display_name());
        }
    }

    Ok(())
}
