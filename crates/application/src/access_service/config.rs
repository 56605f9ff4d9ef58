use std::str::FromStr;

use initiative_access_core::AppError;

/// Which permission set drives initiative-level checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionSource {
    /// The `my-permissions` endpoint is authoritative; local resolution is
    /// only compared against it.
    #[default]
    Server,
    /// Only local resolution is used and `my-permissions` is never fetched.
    Local,
}

impl PermissionSource {
    /// Returns the stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Local => "local",
        }
    }
}

impl FromStr for PermissionSource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "local" => Ok(Self::Local),
            other => Err(AppError::Validation(format!(
                "permission source must be either 'server' or 'local', got '{other}'"
            ))),
        }
    }
}

/// Configuration for the access service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessServiceConfig {
    /// Source of initiative permission sets.
    pub permission_source: PermissionSource,
    /// Lifetime of cached snapshots. Zero disables caching.
    pub cache_ttl_seconds: u32,
}

impl Default for AccessServiceConfig {
    fn default() -> Self {
        Self {
            permission_source: PermissionSource::Server,
            cache_ttl_seconds: 30,
        }
    }
}
