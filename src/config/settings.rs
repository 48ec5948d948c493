//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{
    DEFAULT_ADDRESS_ALLOCATION_ATTEMPTS, DEFAULT_AGENT_TIMEOUT_SECS, DEFAULT_DATABASE_URL,
    DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_STATS_POLL_CONCURRENCY, DEFAULT_STATS_POLL_INTERVAL_SECS, DEFAULT_TUNNEL_PORT,
    MIN_JWT_SECRET_LENGTH,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Timeout applied to every gateway agent call
    pub agent_timeout_secs: u64,
    pub stats_poll_interval_secs: u64,
    pub stats_poll_concurrency: usize,
    /// WireGuard port written into client configs
    pub tunnel_port: u16,
    pub address_allocation_attempts: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("agent_timeout_secs", &self.agent_timeout_secs)
            .field("stats_poll_interval_secs", &self.stats_poll_interval_secs)
            .field("stats_poll_concurrency", &self.stats_poll_concurrency)
            .field("tunnel_port", &self.tunnel_port)
            .field("address_allocation_attempts", &self.address_allocation_attempts)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set or is too short (security requirement).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        Self::with_secret(jwt_secret)
    }

    /// Build a configuration around an explicit JWT secret, reading the
    /// remaining settings from the environment.
    ///
    /// # Panics
    /// Panics if the secret is shorter than the minimum length.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", DEFAULT_JWT_EXPIRATION_HOURS),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            agent_timeout_secs: env_or("AGENT_TIMEOUT_SECS", DEFAULT_AGENT_TIMEOUT_SECS),
            stats_poll_interval_secs: env_or(
                "STATS_POLL_INTERVAL_SECS",
                DEFAULT_STATS_POLL_INTERVAL_SECS,
            ),
            stats_poll_concurrency: env_or(
                "STATS_POLL_CONCURRENCY",
                DEFAULT_STATS_POLL_CONCURRENCY,
            )
            .max(1),
            tunnel_port: env_or("TUNNEL_PORT", DEFAULT_TUNNEL_PORT),
            address_allocation_attempts: env_or(
                "ADDRESS_ALLOCATION_ATTEMPTS",
                DEFAULT_ADDRESS_ALLOCATION_ATTEMPTS,
            ),
        }
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn stats_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stats_poll_interval_secs.max(1))
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_addr_follows_overrides() {
        let mut config = Config::with_secret("test-secret-key-for-testing-only-32chars");
        config.server_host = "127.0.0.1".to_string();
        config.server_port = 4100;
        assert_eq!(config.server_addr(), "127.0.0.1:4100");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::with_secret("test-secret-key-for-testing-only-32chars");
        assert!(!format!("{:?}", config).contains("test-secret-key"));
    }
}
