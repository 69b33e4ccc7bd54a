//! Two-slot access token cache.
//!
//! The short-lived slot holds the raw token issued by the Meta Business
//! platform; the long-lived slot holds the token obtained by exchanging it,
//! together with the time it stops being usable.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{StoredToken, TokenStore};

pub const SHORT_LIVED_TOKEN_ID: &str = "fb_access_token";
pub const LONG_LIVED_TOKEN_ID: &str = "meta_access_token";

/// Validity window given to a freshly saved long-lived token (60 days).
pub const LONG_LIVED_TOKEN_TTL_SECS: i64 = 60 * 24 * 60 * 60;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// `None` for short-lived tokens, whose expiry only the remote knows.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }

    fn from_stored(item: StoredToken) -> Self {
        AccessToken {
            token: item.token,
            expires_at: item.expiration.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct TokenCache<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: TokenStore> TokenCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: TokenStore, C: Clock> TokenCache<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        TokenCache { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The long-lived token, only while `now < expiration`.
    pub async fn get_long_lived_token(&self) -> Result<Option<AccessToken>> {
        let Some(item) = self.store.get_item(LONG_LIVED_TOKEN_ID).await? else {
            return Ok(None);
        };

        let now = self.clock.now().timestamp();
        match item.expiration {
            Some(expiration) if now < expiration => Ok(Some(AccessToken::from_stored(item))),
            _ => {
                debug!("Stored long-lived token has expired");
                Ok(None)
            }
        }
    }

    /// The raw short-lived token. Never checked for expiry.
    pub async fn get_short_lived_token(&self) -> Result<Option<AccessToken>> {
        let item = self.store.get_item(SHORT_LIVED_TOKEN_ID).await?;
        Ok(item.map(|item| AccessToken {
            token: item.token,
            expires_at: None,
        }))
    }

    pub async fn save_short_lived_token(&self, token: &str) -> Result<AccessToken> {
        self.store
            .put_item(
                SHORT_LIVED_TOKEN_ID,
                StoredToken {
                    token: token.to_string(),
                    expiration: None,
                },
            )
            .await?;

        Ok(AccessToken {
            token: token.to_string(),
            expires_at: None,
        })
    }

    pub async fn save_long_lived_token(&self, token: &str) -> Result<AccessToken> {
        let expiration = self.clock.now().timestamp() + LONG_LIVED_TOKEN_TTL_SECS;
        let item = StoredToken {
            token: token.to_string(),
            expiration: Some(expiration),
        };

        self.store.put_item(LONG_LIVED_TOKEN_ID, item.clone()).await?;
        info!(expiration, "Saved long-lived access token");

        Ok(AccessToken::from_stored(item))
    }

    /// Cached long-lived token, or exchange the short-lived one for a new one.
    ///
    /// `exchange` gets the stored short-lived token (if any) and is not called
    /// at all while a valid long-lived token is cached. Its errors propagate
    /// unchanged. If saving fails after a successful exchange the new token
    /// is dropped and the next call exchanges again.
    pub async fn get_or_generate_long_lived_token<F, Fut>(&self, exchange: F) -> Result<AccessToken>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(token) = self.get_long_lived_token().await? {
            return Ok(token);
        }

        info!("No valid long-lived token cached, exchanging short-lived token");
        let short_lived = self.get_short_lived_token().await?.map(|t| t.token);
        let long_lived = exchange(short_lived).await?;

        self.save_long_lived_token(&long_lived).await
    }
}
