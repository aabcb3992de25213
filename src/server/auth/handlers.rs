use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use tracing::{debug, info, warn};

use crate::config::{Config, SCOPE};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extractors::ValidQuery;

use super::dto::{AccessResponse, CallbackQuery};
use super::pkce::PkcePair;
use super::store::TokenRecord;
use super::AuthState;

const PROFILE_HTML: &str = include_str!("../../../web/profile.html");

/// Build the provider authorize URL for one login attempt. Pure string
/// assembly; the caller turns it into a redirect.
pub fn authorize_url(config: &Config, pair: &PkcePair, state: &str) -> String {
    format!(
        "{}/authorize?response_type=code&client_id={}&scope={}&code_challenge_method=S256&code_challenge={}&redirect_uri={}&state={}",
        config.accounts_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(SCOPE),
        urlencoding::encode(&pair.challenge),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(state),
    )
}

/// `GET /login`. Start a fresh attempt: new PKCE pair, new state nonce,
/// off to the provider.
pub async fn login(State(state): State<Arc<AuthState>>) -> Redirect {
    let pair = PkcePair::generate();
    let nonce = state.pending.begin(&pair).await;
    debug!(challenge = %pair.challenge, "Starting login attempt");
    Redirect::to(&authorize_url(&state.config, &pair, &nonce))
}

/// `GET /callback`. The provider sent the browser back. Every failure
/// mode short of a store outage collapses to a silent redirect home; the
/// detail goes to the log, never to the browser.
pub async fn callback(
    State(state): State<Arc<AuthState>>,
    ValidQuery(query): ValidQuery<CallbackQuery>,
) -> ApiResult<Response> {
    let (Some(code), Some(nonce)) = (query.code, query.state) else {
        debug!("Callback missing code or state, redirecting home");
        return Ok(Redirect::to("/").into_response());
    };

    let Some(verifier) = state.pending.take(&nonce).await else {
        warn!("Callback with unknown, reused, or expired state nonce");
        return Ok(Redirect::to("/").into_response());
    };

    let tokens = match state
        .spotify
        .exchange(
            &code,
            &verifier,
            &state.config.client_id,
            &state.config.redirect_uri,
        )
        .await
    {
        Ok(tokens) => tokens,
        Err(err) => {
            // The code is single-use; retrying the same exchange would
            // fail again, so the user has to restart the login.
            warn!(error = %err, "Login aborted: token exchange failed");
            return Ok(Redirect::to("/").into_response());
        }
    };

    // Resolve identity exactly once, before anything is written: the
    // record's key must be the id this resolution returned.
    let id = match state.spotify.current_user_id(&tokens.access_token).await {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "Login aborted: identity resolution failed");
            return Ok(Redirect::to("/").into_response());
        }
    };

    state
        .store
        .upsert(TokenRecord {
            id: id.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
        .await?;

    info!(user = %id, "Login completed");
    let target = format!("/profile/{}", urlencoding::encode(&id));
    Ok(Redirect::to(&target).into_response())
}

/// `GET /access/{id}`. Hand out the stored tokens for an id.
///
/// The id works as a bearer capability here: anyone who holds it can read
/// the credentials. Tie this to the requester's own session before
/// exposing the server beyond trusted callers.
pub async fn access(
    State(state): State<Arc<AuthState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccessResponse>> {
    match state.store.get(&id).await? {
        Some(record) => Ok(Json(AccessResponse {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
        })),
        None => Err(ApiError::NotFound(format!("no tokens stored for {id}"))),
    }
}

/// `DELETE /access/{id}`. Drop the stored credential.
pub async fn logout(
    State(state): State<Arc<AuthState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete(&id).await?;
    info!(user = %id, "Logged out");
    Ok(Json(serde_json::json!({"ok": true})))
}

/// `GET /profile/{id}`. User-scoped page, gated on a stored record.
pub async fn profile(
    State(state): State<Arc<AuthState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    if state.store.exists(&id).await? {
        Ok(Html(PROFILE_HTML).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}
