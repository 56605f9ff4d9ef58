use std::env;
use std::time::Duration;

use initiative_access_application::{AccessServiceConfig, PermissionSource};
use initiative_access_core::{AppError, AppResult, GuildId};
use initiative_access_infrastructure::HttpInitiativeApiConfig;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api: HttpInitiativeApiConfig,
    pub guild_id: GuildId,
    pub cache_ttl_seconds: u32,
    pub permission_source: PermissionSource,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let base_url = required_env(&lookup, "INITIATIVE_API_BASE_URL")?;
        let base_url = Url::parse(base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid INITIATIVE_API_BASE_URL '{base_url}': {error}"
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "INITIATIVE_API_BASE_URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let api_token = required_env(&lookup, "INITIATIVE_API_TOKEN")?;
        let guild_id = required_env(&lookup, "INITIATIVE_GUILD_ID")?
            .parse::<i64>()
            .map(GuildId::new)
            .map_err(|error| {
                AppError::Validation(format!("invalid INITIATIVE_GUILD_ID: {error}"))
            })?;

        let timeout_seconds = parse_env(&lookup, "INITIATIVE_HTTP_TIMEOUT_SECS", 15_u64)?;
        let max_attempts = parse_env(&lookup, "INITIATIVE_HTTP_MAX_ATTEMPTS", 3_u8)?;
        let retry_backoff_ms = parse_env(&lookup, "INITIATIVE_HTTP_RETRY_BACKOFF_MS", 200_u64)?;
        let cache_ttl_seconds = parse_env(&lookup, "INITIATIVE_CACHE_TTL_SECS", 30_u32)?;
        let permission_source = lookup("INITIATIVE_PERMISSION_SOURCE")
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.trim().parse::<PermissionSource>())
            .transpose()?
            .unwrap_or_default();

        if timeout_seconds == 0 {
            return Err(AppError::Validation(
                "INITIATIVE_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        if max_attempts == 0 {
            return Err(AppError::Validation(
                "INITIATIVE_HTTP_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api: HttpInitiativeApiConfig {
                base_url,
                api_token,
                timeout: Duration::from_secs(timeout_seconds),
                max_attempts,
                retry_backoff_ms,
            },
            guild_id,
            cache_ttl_seconds,
            permission_source,
        })
    }

    pub fn access_service_config(&self) -> AccessServiceConfig {
        AccessServiceConfig {
            permission_source: self.permission_source,
            cache_ttl_seconds: self.cache_ttl_seconds,
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        Some(_) => Err(AppError::Validation(format!("{name} must not be empty"))),
        None => Err(AppError::Validation(format!("{name} is required"))),
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
