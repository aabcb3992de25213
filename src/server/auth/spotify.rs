use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;

/// Exchange failures abort the login; authorization codes are single-use,
/// so nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("token endpoint rejected the authorization code ({status}): {body}")]
    InvalidCode { status: StatusCode, body: String },

    #[error("could not reach token endpoint: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("identity endpoint rejected the access token ({0})")]
    Unauthorized(StatusCode),

    #[error("could not reach identity endpoint: {0}")]
    Network(#[from] reqwest::Error),
}

/// Tokens returned by a successful exchange.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Client for the two server-to-server Spotify calls in the login flow:
/// the code-for-token exchange and the "who am I" lookup.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        SpotifyClient {
            http: reqwest::Client::new(),
            accounts_url: config.accounts_url.clone(),
            api_url: config.api_url.clone(),
        }
    }

    /// Redeem an authorization code. `verifier` must be the one whose
    /// challenge was sent in the authorize redirect; the provider checks
    /// that pairing, which is what makes an intercepted code worthless.
    pub async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, ExchangeError> {
        let res = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .form(&[
                ("client_id", client_id),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", verifier),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ExchangeError::InvalidCode { status, body });
        }

        let tokens: TokenPair = res.json().await?;
        debug!("Token exchange succeeded");
        Ok(tokens)
    }

    /// Resolve the stable user id behind an access token via `/v1/me`.
    pub async fn current_user_id(&self, access_token: &str) -> Result<String, ResolveError> {
        #[derive(Deserialize)]
        struct Me {
            id: String,
        }

        let res = self
            .http
            .get(format!("{}/v1/me", self.api_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ResolveError::Unauthorized(res.status()));
        }

        let me: Me = res.json().await?;
        Ok(me.id)
    }
}
