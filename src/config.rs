//! Configuration, resolved once at the process boundary.
//!
//! Nothing below the [`Config`] reads the environment; everything that needs
//! a credential or the user id gets it from here.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::graph_api::ig::PollOptions;
use crate::graph_api::GRAPH_URL;

pub const ENV_CLIENT_ID: &str = "INSTAGRAM_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "INSTAGRAM_CLIENT_SECRET";
pub const ENV_EXCHANGE_TOKEN: &str = "INSTAGRAM_TOKEN";
pub const ENV_USER_ID: &str = "INSTAGRAM_USER_ID";
pub const ENV_CREDENTIALS_TABLE: &str = "CREDENTIALS_TABLE";
/// Older deployments name the table here; read when the plain key is unset.
pub const ENV_LEGACY_CREDENTIALS_TABLE: &str = "DYNAMODB_CREDENTIALS_TABLE";
pub const ENV_GRAPH_URL: &str = "GRAPH_API_URL";
pub const ENV_POLL_TIMEOUT: &str = "GRAPH_POLL_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL: &str = "GRAPH_POLL_INTERVAL_SECS";

pub const DEFAULT_CREDENTIALS_TABLE: &str = "MetaCredentials";

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Raw token to exchange; takes precedence over one read from the store.
    pub exchange_token: Option<String>,
    pub user_id: Option<String>,
    pub credentials_table: String,
    pub poll: PollOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: GRAPH_URL.to_string(),
            client_id: None,
            client_secret: None,
            exchange_token: None,
            user_id: None,
            credentials_table: DEFAULT_CREDENTIALS_TABLE.to_string(),
            poll: PollOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let mut poll = defaults.poll.clone();
        if let Some(timeout) = get(ENV_POLL_TIMEOUT) {
            poll.timeout = parse_secs(ENV_POLL_TIMEOUT, &timeout)?;
        }
        if let Some(interval) = get(ENV_POLL_INTERVAL) {
            poll.interval = parse_secs(ENV_POLL_INTERVAL, &interval)?;
            if poll.interval.is_zero() {
                return Err(Error::Config(format!("{ENV_POLL_INTERVAL} must be at least 1 second")));
            }
        }

        Ok(Config {
            base_url: get(ENV_GRAPH_URL).unwrap_or(defaults.base_url),
            client_id: get(ENV_CLIENT_ID),
            client_secret: get(ENV_CLIENT_SECRET),
            exchange_token: get(ENV_EXCHANGE_TOKEN),
            user_id: get(ENV_USER_ID),
            credentials_table: get(ENV_CREDENTIALS_TABLE)
                .or_else(|| get(ENV_LEGACY_CREDENTIALS_TABLE))
                .unwrap_or(defaults.credentials_table),
            poll,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_exchange_token(mut self, token: impl Into<String>) -> Self {
        self.exchange_token = Some(token.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_credentials_table(mut self, table: impl Into<String>) -> Self {
        self.credentials_table = table.into();
        self
    }

    pub fn with_poll(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn require_user_id(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{ENV_USER_ID} must be defined")))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("exchange_token", &redact(&self.exchange_token))
            .field("user_id", &self.user_id)
            .field("credentials_table", &self.credentials_table)
            .field("poll", &self.poll)
            .finish()
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            Error::Config(format!("{key} must be a whole number of seconds, got '{value}'"))
        })
}
