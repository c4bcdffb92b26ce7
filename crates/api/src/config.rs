use std::time::Duration;

use farmchain_core::error::CoreError;
use farmchain_core::lifecycle::TransitionPolicy;
use farmchain_core::service::{ServiceSettings, DEFAULT_STORE_TIMEOUT};
use farmchain_core::taxonomy::{parse_list, Taxonomy};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Store timeout, transition policy and taxonomy handed to the services.
    pub services: ServiceSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `STORE_TIMEOUT_MS`      | `5000`                     |
    /// | `CROP_STATUS_POLICY`    | `permissive`               |
    /// | `CROP_TYPES`            | built-in crop taxonomy     |
    /// | `FARM_REGIONS`          | built-in region list       |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let services = service_settings(|key| std::env::var(key).ok())
            .unwrap_or_else(|e| panic!("Invalid service configuration: {e}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            services,
        }
    }
}

/// Build [`ServiceSettings`] from a variable lookup.
///
/// Unset variables fall back to the defaults. Empty lists are rejected.
pub fn service_settings<F>(var: F) -> Result<ServiceSettings, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    let store_timeout = match var("STORE_TIMEOUT_MS") {
        Some(raw) => {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!("STORE_TIMEOUT_MS must be a whole number, got '{raw}'"))
            })?;
            if ms == 0 {
                return Err(CoreError::Validation(
                    "STORE_TIMEOUT_MS must be greater than zero".to_string(),
                ));
            }
            Duration::from_millis(ms)
        }
        None => DEFAULT_STORE_TIMEOUT,
    };

    let transition_policy = match var("CROP_STATUS_POLICY") {
        Some(raw) => TransitionPolicy::parse(raw.trim())?,
        None => TransitionPolicy::default(),
    };

    let defaults = Taxonomy::default();
    let crop_types = var("CROP_TYPES")
        .map(|raw| parse_list(&raw))
        .unwrap_or_else(|| defaults.crop_types().to_vec());
    let regions = var("FARM_REGIONS")
        .map(|raw| parse_list(&raw))
        .unwrap_or_else(|| defaults.regions().to_vec());

    Ok(ServiceSettings {
        store_timeout,
        transition_policy,
        taxonomy: Taxonomy::new(crop_types, regions)?,
    })
}
