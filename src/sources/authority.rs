use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{AUTHORIZATION, CACHE_CONTROL};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::cache::token_cache::TokenCache;
use crate::config::settings::Credentials;
use crate::error::{ClientError, Result};
use crate::observability::metrics::{Metrics, ORIGIN_CACHE, ORIGIN_REMOTE};
use crate::utils::constants::{
    CONNECTION_FAILED_MSG, TOKEN_GRANT_TYPE, TOKEN_SCOPE, UNEXPECTED_RESPONSE_MSG,
};

/// Body of the token endpoint's answer, successful or not.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Hands out bearer tokens, from the cache when allowed, else from the
/// OAuth2 token endpoint (client credentials grant).
#[derive(Clone)]
pub struct TokenAuthority {
    client: Client,
    token_url: String,
    credentials: Credentials,
    cache: TokenCache,
    metrics: Arc<Metrics>,
}

impl TokenAuthority {
    pub fn new(
        client: Client,
        token_url: String,
        credentials: Credentials,
        cache: TokenCache,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { client, token_url, credentials, cache, metrics }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns a cached token unless `force_refresh`, otherwise fetches a new
    /// one and stores it (best-effort).
    pub async fn obtain(&self, force_refresh: bool) -> Result<Token> {
        let cache_usable = match self.cache.ensure_directory().await {
            Ok(()) => true,
            Err(err) => {
                warn!("token cache disabled for this call: {}", err);
                false
            }
        };

        if !force_refresh && cache_usable {
            if let Some(token) = self.cache.lookup().await {
                self.metrics.token_requests.with_label_values(&[ORIGIN_CACHE]).inc();
                return Ok(token);
            }
        }

        let value = self.fetch().await.inspect_err(|err| {
            self.metrics.token_failures.with_label_values(&[err.reason()]).inc();
        })?;
        self.metrics.token_requests.with_label_values(&[ORIGIN_REMOTE]).inc();

        if cache_usable {
            if let Err(err) = self.cache.store(&value).await {
                warn!("could not cache token at '{}': {}", self.cache.path().display(), err);
            }
        }
        Ok(Token::fresh(value))
    }

    async fn fetch(&self) -> Result<String> {
        info!("requesting new token from '{}'", self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, self.basic_authorization())
            .header(CACHE_CONTROL, "no-cache")
            .form(&[("grant_type", TOKEN_GRANT_TYPE), ("scope", TOKEN_SCOPE)])
            .send()
            .await
            .map_err(|err| ClientError::Connection(format!("{}: {}", CONNECTION_FAILED_MSG, err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Connection(format!("{}: {}", CONNECTION_FAILED_MSG, err)))?;
        debug!("token endpoint answered with status {}", status);

        parse_token_response(&body)
    }

    fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.credentials.client_id, self.credentials.secret);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

fn parse_token_response(body: &str) -> Result<String> {
    let parsed: TokenResponse = serde_json::from_str(body).map_err(|err| {
        ClientError::Connection(format!("{}: unreadable token response ({})", CONNECTION_FAILED_MSG, err))
    })?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ClientError::Authorization(
            parsed
                .error_description
                .or(parsed.error)
                .unwrap_or_else(|| UNEXPECTED_RESPONSE_MSG.to_owned()),
        )),
    }
}
