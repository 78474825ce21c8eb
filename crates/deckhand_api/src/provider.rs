//! Typed operations over the gateway.
//!
//! One method per upstream call. Each returns a fresh snapshot; nothing is
//! cached between calls.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use urlencoding::encode;

use crate::error::{ApiError, ApiResult};
use crate::gateway::ApiGateway;
use crate::models::{
    BuildFilter, CronJob, Database, Deploy, EnvVar, LogPage, Owner, Service, ServiceId,
    UsageItem, User,
};
use crate::request::{ApiBody, ApiRequest, ApiToken};

/// Page size used for service listings.
pub const SERVICE_PAGE_SIZE: u32 = 50;

/// Page size used for deploy listings.
pub const DEPLOY_PAGE_SIZE: u32 = 10;

/// Number of log lines fetched per request.
pub const LOG_PAGE_SIZE: u32 = 20;

/// Outcome of a delete call, separating "already gone" from real failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

/// Outcome of a cancel request.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Canceled(Deploy),
    NothingToCancel,
}

/// Typed client for the provider's REST API.
pub struct ProviderClient {
    gateway: Arc<dyn ApiGateway>,
}

impl Clone for ProviderClient {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl ProviderClient {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self { gateway }
    }

    async fn call(&self, token: &ApiToken, request: ApiRequest) -> ApiResult<ApiBody> {
        self.gateway.call(token, request).await
    }

    /// Whoami: a 200 proves the key is valid.
    pub async fn whoami(&self, token: &ApiToken) -> ApiResult<User> {
        match self.call(token, ApiRequest::get("users")).await? {
            ApiBody::Empty => Ok(User::default()),
            body => body.decode(),
        }
    }

    /// Validate a key; any non-2xx answer rejects it.
    pub async fn validate_token(&self, token: &ApiToken) -> ApiResult<User> {
        let user = self.whoami(token).await?;
        info!("API key validated");
        Ok(user)
    }

    pub async fn list_owners(&self, token: &ApiToken) -> ApiResult<Vec<Owner>> {
        self.call(token, ApiRequest::get("owners").query("limit", 20))
            .await?
            .decode_list("owner")
    }

    pub async fn list_services(&self, token: &ApiToken) -> ApiResult<Vec<Service>> {
        self.call(
            token,
            ApiRequest::get("services").query("limit", SERVICE_PAGE_SIZE),
        )
        .await?
        .decode_list("service")
    }

    pub async fn get_service(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<Service> {
        self.call(token, ApiRequest::get(format!("services/{}", id)))
            .await?
            .decode()
    }

    pub async fn list_deploys(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<Vec<Deploy>> {
        self.call(
            token,
            ApiRequest::get(format!("services/{}/deploys", id)).query("limit", DEPLOY_PAGE_SIZE),
        )
        .await?
        .decode_list("deploy")
    }

    pub async fn trigger_deploy(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<Option<Deploy>> {
        let body = self
            .call(
                token,
                ApiRequest::post(format!("services/{}/deploys", id))
                    .json(json!({ "clearCache": "do_not_clear" })),
            )
            .await?;
        match body {
            ApiBody::Empty => Ok(None),
            body => Ok(Some(body.decode()?)),
        }
    }

    /// Cancel the newest deploy that is not in a terminal state.
    pub async fn cancel_latest_deploy(
        &self,
        token: &ApiToken,
        id: &ServiceId,
    ) -> ApiResult<CancelOutcome> {
        let deploys = self.list_deploys(token, id).await?;
        let Some(active) = deploys.into_iter().find(|d| !d.status.is_terminal()) else {
            return Ok(CancelOutcome::NothingToCancel);
        };

        let body = self
            .call(
                token,
                ApiRequest::post(format!("services/{}/deploys/{}/cancel", id, active.id)),
            )
            .await?;
        match body {
            ApiBody::Empty => Ok(CancelOutcome::Canceled(active)),
            body => Ok(CancelOutcome::Canceled(body.decode()?)),
        }
    }

    pub async fn suspend(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<()> {
        self.call(token, ApiRequest::post(format!("services/{}/suspend", id)))
            .await?;
        Ok(())
    }

    pub async fn resume(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<()> {
        self.call(token, ApiRequest::post(format!("services/{}/resume", id)))
            .await?;
        Ok(())
    }

    /// Set the instance count of a service.
    pub async fn scale(&self, token: &ApiToken, id: &ServiceId, instances: u32) -> ApiResult<()> {
        self.call(
            token,
            ApiRequest::post(format!("services/{}/scale", id))
                .json(json!({ "numInstances": instances })),
        )
        .await?;
        info!("Scaled {} to {} instance(s)", id, instances);
        Ok(())
    }

    pub async fn list_env_vars(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<Vec<EnvVar>> {
        self.call(
            token,
            ApiRequest::get(format!("services/{}/env-vars", id)).query("limit", 100),
        )
        .await?
        .decode_list("envVar")
    }

    /// Add or update one variable.
    pub async fn set_env_var(&self, token: &ApiToken, id: &ServiceId, var: &EnvVar) -> ApiResult<()> {
        check_env_key(&var.key)?;
        self.call(
            token,
            ApiRequest::put(format!("services/{}/env-vars/{}", id, encode(&var.key)))
                .json(json!({ "value": var.value })),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_env_var(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        key: &str,
    ) -> ApiResult<DeleteOutcome> {
        check_env_key(key)?;
        let request = ApiRequest::delete(format!("services/{}/env-vars/{}", id, encode(key)));
        deletion(self.call(token, request).await)
    }

    /// Replace the full set of variables, keeping the given order.
    pub async fn replace_env_vars(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        vars: &[EnvVar],
    ) -> ApiResult<()> {
        for var in vars {
            check_env_key(&var.key)?;
        }
        self.call(
            token,
            ApiRequest::put(format!("services/{}/env-vars", id)).json(serde_json::to_value(vars)?),
        )
        .await?;
        Ok(())
    }

    async fn patch_service(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        patch: serde_json::Value,
    ) -> ApiResult<Option<Service>> {
        let body = self
            .call(token, ApiRequest::patch(format!("services/{}", id)).json(patch))
            .await?;
        match body {
            ApiBody::Empty => Ok(None),
            body => Ok(Some(body.decode()?)),
        }
    }

    pub async fn rename(&self, token: &ApiToken, id: &ServiceId, name: &str) -> ApiResult<Option<Service>> {
        self.patch_service(token, id, json!({ "name": name })).await
    }

    pub async fn update_build_command(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        command: &str,
    ) -> ApiResult<Option<Service>> {
        self.patch_service(
            token,
            id,
            json!({ "serviceDetails": { "envSpecificDetails": { "buildCommand": command } } }),
        )
        .await
    }

    pub async fn update_start_command(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        command: &str,
    ) -> ApiResult<Option<Service>> {
        self.patch_service(
            token,
            id,
            json!({ "serviceDetails": { "envSpecificDetails": { "startCommand": command } } }),
        )
        .await
    }

    pub async fn update_build_filter(
        &self,
        token: &ApiToken,
        id: &ServiceId,
        filter: &BuildFilter,
    ) -> ApiResult<Option<Service>> {
        self.patch_service(token, id, json!({ "buildFilter": filter }))
            .await
    }

    pub async fn delete_service(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<DeleteOutcome> {
        let outcome = deletion(
            self.call(token, ApiRequest::delete(format!("services/{}", id)))
                .await,
        )?;
        info!("Service {} delete outcome: {:?}", id, outcome);
        Ok(outcome)
    }

    /// Recent log lines for a service. Logs are scoped by owner, so the
    /// service is fetched first.
    pub async fn recent_logs(&self, token: &ApiToken, id: &ServiceId) -> ApiResult<LogPage> {
        let service = self.get_service(token, id).await?;
        let owner = service.owner_id.ok_or_else(|| {
            ApiError::UnexpectedResponse(format!("service {} has no ownerId", id))
        })?;

        let body = self
            .call(
                token,
                ApiRequest::get("logs")
                    .query("ownerId", owner)
                    .query("resource", id)
                    .query("direction", "backward")
                    .query("limit", LOG_PAGE_SIZE),
            )
            .await?;
        match body {
            ApiBody::Empty => Ok(LogPage::default()),
            body => body.decode(),
        }
    }

    pub async fn list_cron_jobs(&self, token: &ApiToken) -> ApiResult<Vec<CronJob>> {
        self.call(token, ApiRequest::get("crons").query("limit", 20))
            .await?
            .decode_list("cronJob")
    }

    /// Start a cron job run outside its schedule.
    pub async fn run_cron_job(&self, token: &ApiToken, id: &str) -> ApiResult<()> {
        if !CronJob::is_valid_id(id) {
            return Err(ApiError::InvalidCronJobId(id.to_string()));
        }
        self.call(token, ApiRequest::post(format!("crons/{}/runs", id)))
            .await?;
        info!("Triggered cron job {}", id);
        Ok(())
    }

    pub async fn list_databases(&self, token: &ApiToken) -> ApiResult<Vec<Database>> {
        self.call(token, ApiRequest::get("databases").query("limit", 20))
            .await?
            .decode_list("database")
    }

    /// Metered usage of the account for the current billing period.
    pub async fn usage(&self, token: &ApiToken) -> ApiResult<Vec<UsageItem>> {
        // Items carry a `usage` amount, so the list wrapper lookup cannot be used.
        match self.call(token, ApiRequest::get("usage")).await? {
            ApiBody::Empty | ApiBody::Json(serde_json::Value::Null) => Ok(Vec::new()),
            body => body.decode(),
        }
    }
}

/// Keys become a URL path segment.
fn check_env_key(key: &str) -> ApiResult<()> {
    if EnvVar::is_valid_key(key) {
        Ok(())
    } else {
        Err(ApiError::InvalidEnvKey(key.to_string()))
    }
}

fn deletion(result: ApiResult<ApiBody>) -> ApiResult<DeleteOutcome> {
    match result {
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(err) if err.is_not_found() => Ok(DeleteOutcome::AlreadyGone),
        Err(err) => Err(err),
    }
}
