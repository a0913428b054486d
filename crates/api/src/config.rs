use std::str::FromStr;
use std::time::Duration;

use quicklab_db::store::DEFAULT_MAIL_DOMAIN;
use quicklab_gitlab::RetryPolicy;

/// A configuration variable that is missing or cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// Everything except the GitLab token has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// SQLite database URL.
    pub database_url: String,
    /// Base URL of the GitLab instance courses are provisioned on.
    pub gitlab_url: String,
    /// Personal access token used for every GitLab call.
    pub gitlab_token: String,
    /// Whether created GitLab accounts receive a password-reset mail.
    pub gitlab_reset_password: bool,
    pub provision_max_attempts: u32,
    pub provision_initial_delay_ms: u64,
    pub provision_max_delay_ms: u64,
    /// Mail domain for head TAs added without a stored account.
    pub ta_mail_domain: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                   |
    /// |------------------------------|---------------------------|
    /// | `HOST`                       | `0.0.0.0`                 |
    /// | `PORT`                       | `3000`                    |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                      |
    /// | `DATABASE_URL`               | `sqlite://quicklab.db`    |
    /// | `GITLAB_URL`                 | `https://gitlab.com`      |
    /// | `GITLAB_TOKEN`               | (required)                |
    /// | `GITLAB_RESET_PASSWORD`      | `true`                    |
    /// | `PROVISION_MAX_ATTEMPTS`     | `5`                       |
    /// | `PROVISION_INITIAL_DELAY_MS` | `2000`                    |
    /// | `PROVISION_MAX_DELAY_MS`     | `30000`                   |
    /// | `TA_MAIL_DOMAIN`             | `tudelft.nl`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let gitlab_token = lookup("GITLAB_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                name: "GITLAB_TOKEN",
            })?;

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", var("PORT", "3000"))?,
            cors_origins,
            request_timeout_secs: parse("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS", "30"))?,
            database_url: var("DATABASE_URL", "sqlite://quicklab.db"),
            gitlab_url: var("GITLAB_URL", "https://gitlab.com"),
            gitlab_token,
            gitlab_reset_password: parse(
                "GITLAB_RESET_PASSWORD",
                var("GITLAB_RESET_PASSWORD", "true"),
            )?,
            provision_max_attempts: parse(
                "PROVISION_MAX_ATTEMPTS",
                var("PROVISION_MAX_ATTEMPTS", "5"),
            )?,
            provision_initial_delay_ms: parse(
                "PROVISION_INITIAL_DELAY_MS",
                var("PROVISION_INITIAL_DELAY_MS", "2000"),
            )?,
            provision_max_delay_ms: parse(
                "PROVISION_MAX_DELAY_MS",
                var("PROVISION_MAX_DELAY_MS", "30000"),
            )?,
            ta_mail_domain: var("TA_MAIL_DOMAIN", DEFAULT_MAIL_DOMAIN),
        })
    }

    /// Backoff applied to transient GitLab failures while provisioning.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provision_max_attempts,
            initial_delay: Duration::from_millis(self.provision_initial_delay_ms),
            max_delay: Duration::from_millis(self.provision_max_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
