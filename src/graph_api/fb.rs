use tracing::info;

use crate::config::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_EXCHANGE_TOKEN};
use crate::error::{Error, Result};
use crate::graph_api::transport::GraphRequest;
use crate::graph_api::GraphApi;
use crate::store::TokenStore;
use crate::token_cache::{AccessToken, Clock, TokenCache};

impl GraphApi {
    /// Exchange a short-lived token for one valid about 60 days.
    ///
    /// A configured exchange token takes precedence over `short_token`.
    pub async fn exchange_token(&self, short_token: Option<&str>) -> Result<String> {
        let result = self.get_long_lived_access_token(short_token).await;
        if let Err(err) = &result {
            self.notify(&format!("Exception during token generation: {err}"));
        }

        result
    }

    /// Cached long-lived token, exchanged through this client when missing.
    pub async fn long_lived_token<S, C>(&self, cache: &TokenCache<S, C>) -> Result<AccessToken>
    where
        S: TokenStore,
        C: Clock,
    {
        cache
            .get_or_generate_long_lived_token(|short| async move {
                self.exchange_token(short.as_deref()).await
            })
            .await
    }

    async fn get_long_lived_access_token(&self, short_token: Option<&str>) -> Result<String> {
        let config = self.config();
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        else {
            return Err(Error::Config(format!(
                "{ENV_CLIENT_ID} or {ENV_CLIENT_SECRET} must be defined"
            )));
        };
        let fb_exchange_token = config
            .exchange_token
            .as_deref()
            .or(short_token)
            .ok_or_else(|| {
                Error::Config(format!(
                    "No short-lived token stored and {ENV_EXCHANGE_TOKEN} is not set"
                ))
            })?;

        let resp = self
            .send(
                GraphRequest::post(self.url("oauth/access_token"))
                    .param("grant_type", "fb_exchange_token")
                    .param("client_id", client_id.as_str())
                    .param("client_secret", client_secret.as_str())
                    .param("fb_exchange_token", fb_exchange_token),
            )
            .await?;

        match resp.str_field("access_token") {
            Some(token) => {
                info!("Generated long-lived access token");
                Ok(token)
            }
            None => Err(Error::TokenExchange(format!(
                "Long-lived access token couldn't be generated: {}",
                resp.graph_error()
            ))),
        }
    }
}
