pub mod dto;
pub mod handlers;
pub mod pkce;
pub mod spotify;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::Config;

use pkce::PendingLogins;
use spotify::SpotifyClient;
use store::{StoreError, TokenStore};

/// Everything the login flow needs, shared across requests.
pub struct AuthState {
    pub config: Config,
    pub store: TokenStore,
    pub pending: PendingLogins,
    pub spotify: SpotifyClient,
}

impl AuthState {
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let store = TokenStore::from_backend(&config.store_backend)?;
        let spotify = SpotifyClient::new(&config);
        Ok(AuthState {
            config,
            store,
            pending: PendingLogins::new(),
            spotify,
        })
    }
}

pub fn routes(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/login", get(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/access/{id}", get(handlers::access).delete(handlers::logout))
        .route("/profile/{id}", get(handlers::profile))
        .with_state(state)
}
