//! # deckhand_api
//!
//! Gateway to the hosting provider's REST API for deckhand.
//!
//! # Features
//!
//! - **Single gateway**: every outbound call goes through [`ApiGateway::call`]
//! - **Bearer auth**: the caller supplies the token per call; there is no
//!   process-wide key
//! - **No hidden policy**: no retries, no caching, no rate limiting
//! - **Typed client**: [`ProviderClient`] maps each upstream endpoint to a method
//! - **Mock gateway**: route table with captured calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deckhand_api::{ApiConfig, ApiToken, HttpGateway, ProviderClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = HttpGateway::new(ApiConfig::default())?;
//!     let client = ProviderClient::new(Arc::new(gateway));
//!
//!     let token = ApiToken::new("rnd_xxx").ok_or("empty key")?;
//!     for service in client.list_services(&token).await? {
//!         println!("{} {}", service.id, service.display_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod models;
pub mod provider;
pub mod request;

pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult};
pub use gateway::{ApiGateway, HttpGateway};
pub use mock::{CapturedCall, MockGateway, MockReply};
pub use models::{
    BuildFilter, Commit, CronJob, Database, Deploy, DeployStatus, EnvSpecificDetails, EnvVar,
    LogEntry, LogPage, Owner, Service, ServiceDetails, ServiceId, Suspension, UsageItem, User,
    CRON_JOB_ID_PREFIX, SERVICE_ID_PREFIX,
};
pub use provider::{CancelOutcome, DeleteOutcome, ProviderClient};
pub use request::{ApiBody, ApiRequest, ApiToken, Method};
