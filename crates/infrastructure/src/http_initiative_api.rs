mod dto;

use std::time::Duration;

use async_trait::async_trait;
use initiative_access_application::{
    InitiativeDirectory, ResourceCommand, ResourceCommandGateway, ResourceSnapshot,
};
use initiative_access_core::{AppError, AppResult, GuildId, UserIdentity};
use initiative_access_domain::{
    GuildMembership, Initiative, InitiativeId, InitiativeRole, PermissionSet, Principal,
    ResourceRef, UserId,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use dto::{
    GuildMembershipDto, InitiativeDto, InitiativeRoleDto, PermissionFlagsDto, ResourceDto,
    RoleGrantBody, TagBody, UserDto, UserGrantBody,
};

/// Connection settings for [`HttpInitiativeApi`].
#[derive(Debug, Clone)]
pub struct HttpInitiativeApiConfig {
    /// Base URL of the REST API.
    pub base_url: Url,
    /// Bearer token sent with every request.
    pub api_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per request, including the first.
    pub max_attempts: u8,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
}

/// REST adapter for initiative reads and resource mutations.
pub struct HttpInitiativeApi {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpInitiativeApi {
    /// Creates a new API client.
    pub fn new(config: HttpInitiativeApiConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
            api_token: config.api_token,
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms.max(50),
        })
    }

    /// Loads the account behind the configured token.
    pub async fn fetch_current_user(&self, guild_id: GuildId) -> AppResult<UserIdentity> {
        let user: UserDto = self.get_json("users/me").await?;
        user.into_identity(guild_id)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .send_with_retry(Method::GET, path, None::<&()>)
            .await?;

        response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!("failed to decode response of GET /{path}: {error}"))
        })
    }

    async fn get_optional_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        match self.get_json(path).await {
            Ok(value) => Ok(Some(value)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn send<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> AppResult<()> {
        self.send_with_retry(method, path, body).await.map(|_| ())
    }

    async fn send_with_retry<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> AppResult<reqwest::Response> {
        let url = self.endpoint(path);
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let mut builder = self
                .http_client
                .request(method.clone(), url.as_str())
                .bearer_auth(self.api_token.as_str());
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(method = %method, path, attempt, "initiative API call succeeded");
                    return Ok(response);
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for {method} /{path}",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(status_error(status, &method, path, &body));
                }
                Err(error) => {
                    last_error = Some(format!("transport error for {method} /{path}: {error}"));
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    method = %method,
                    path,
                    attempt,
                    error = last_error.as_deref().unwrap_or_default(),
                    "retrying initiative API call"
                );
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Unavailable(last_error.unwrap_or_else(|| {
            format!("{method} /{path} exhausted retries")
        })))
    }
}

fn status_error(status: StatusCode, method: &Method, path: &str, body: &str) -> AppError {
    let message = format!("{method} /{path} failed with status {status}: {body}");
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Internal(message),
    }
}

fn resource_path(resource: ResourceRef) -> String {
    format!("{}/{}", resource.kind.collection(), resource.id)
}

#[async_trait]
impl InitiativeDirectory for HttpInitiativeApi {
    async fn fetch_initiative(&self, initiative_id: InitiativeId) -> AppResult<Initiative> {
        let initiative: InitiativeDto = self
            .get_json(&format!("initiatives/{initiative_id}"))
            .await?;
        Initiative::try_from(initiative)
    }

    async fn list_roles(&self, initiative_id: InitiativeId) -> AppResult<Vec<InitiativeRole>> {
        let roles: Vec<InitiativeRoleDto> = self
            .get_json(&format!("initiatives/{initiative_id}/roles"))
            .await?;
        roles.into_iter().map(InitiativeRole::try_from).collect()
    }

    async fn fetch_guild_membership(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> AppResult<Option<GuildMembership>> {
        let membership: Option<GuildMembershipDto> = self
            .get_optional_json(&format!("guilds/{guild_id}/members/{user_id}"))
            .await?;
        Ok(membership.map(GuildMembership::from))
    }

    async fn fetch_my_permissions(&self, initiative_id: InitiativeId) -> AppResult<PermissionSet> {
        let flags: PermissionFlagsDto = self
            .get_json(&format!("initiatives/{initiative_id}/my-permissions"))
            .await?;
        Ok(flags.permission_set())
    }

    async fn fetch_resource(&self, resource: ResourceRef) -> AppResult<ResourceSnapshot> {
        let payload: ResourceDto = self.get_json(&resource_path(resource)).await?;
        payload.into_snapshot(resource)
    }
}

#[async_trait]
impl ResourceCommandGateway for HttpInitiativeApi {
    async fn execute(&self, command: ResourceCommand) -> AppResult<()> {
        let base = resource_path(command.resource());

        match command {
            ResourceCommand::PutGrant { grant, .. } => match grant.principal() {
                Principal::User(user_id) => {
                    let body = UserGrantBody {
                        user_id: user_id.value(),
                        level: grant.level(),
                    };
                    self.send(Method::POST, &format!("{base}/members"), Some(&body))
                        .await
                }
                Principal::Role(role_id) => {
                    let body = RoleGrantBody {
                        role_id: role_id.value(),
                        level: grant.level(),
                    };
                    self.send(Method::POST, &format!("{base}/role-permissions"), Some(&body))
                        .await
                }
            },
            ResourceCommand::DeleteGrant { principal, .. } => {
                let path = match principal {
                    Principal::User(user_id) => format!("{base}/members/{user_id}"),
                    Principal::Role(role_id) => format!("{base}/role-permissions/{role_id}"),
                };
                self.send(Method::DELETE, &path, None::<&()>).await
            }
            ResourceCommand::AddTag { tag_id, .. } => {
                let body = TagBody {
                    tag_id: tag_id.value(),
                };
                self.send(Method::POST, &format!("{base}/tags"), Some(&body))
                    .await
            }
            ResourceCommand::RemoveTag { tag_id, .. } => {
                self.send(Method::DELETE, &format!("{base}/tags/{tag_id}"), None::<&()>)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests;
