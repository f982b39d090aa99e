//! Environment configuration for the proxy binary.
//!
//! Credentials come from the standard AWS environment variables; the HTTP
//! listener and persistence toggle use `EC2DASH_*` variables. Missing values
//! fall back to the defaults the original backend used.

use std::env;

use super::session::ConnectionContext;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Persist submitted credentials to the config dir for later restarts.
    pub persist_credentials: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            persist_credentials: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("EC2DASH_HOST").unwrap_or(defaults.host),
            port: env::var("EC2DASH_PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.port),
            persist_credentials: env_flag("EC2DASH_PERSIST_CREDENTIALS"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a connection context from the standard AWS environment variables.
/// Returns `None` when no key pair is present; validation of the assembled
/// context happens at connect time.
pub fn connection_from_env() -> Option<ConnectionContext> {
    let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok()?;
    let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok()?;
    let region = env::var("AWS_REGION")
        .or_else(|_| env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_default();
    let session_token = env::var("AWS_SESSION_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());

    Some(ConnectionContext {
        access_key_id,
        secret_access_key,
        session_token,
        region,
    })
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
