//! Shopify install routes.

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::config::CALLBACK_PATH;
use crate::error::AppError;
use crate::middleware::{CONNECTED_SHOP_KEY, OAUTH_STATE_KEY};
use crate::services::auth::{AuthError, AuthorizationState, CallbackQuery, MANAGEMENT_PATH};
use crate::state::AppState;

use super::found;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/install", get(install))
        .route(CALLBACK_PATH, get(callback))
}

#[derive(Debug, Deserialize)]
struct InstallParams {
    shop: Option<String>,
}

fn session_error(err: tower_sessions::session::Error) -> AuthError {
    AuthError::Session(err.to_string())
}

/// GET /auth/install - Start OAuth flow.
#[instrument(skip(state, session))]
async fn install(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<InstallParams>,
) -> Result<Response, AppError> {
    let redirect = state.auth().initiate_install(params.shop.as_deref())?;

    session
        .insert(OAUTH_STATE_KEY, &redirect.state)
        .await
        .map_err(session_error)?;

    info!(shop = %redirect.state.shop(), "Redirecting to Shopify consent screen");
    Ok(found(&redirect.authorize_url))
}

/// GET /auth/callback - Handle OAuth callback.
///
/// The issued state is taken out of the session before any check runs, so
/// a failed or replayed callback cannot reuse it.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> Result<Response, AppError> {
    let issued = session
        .remove::<AuthorizationState>(OAUTH_STATE_KEY)
        .await
        .map_err(session_error)?;
    let query = CallbackQuery::parse(raw.as_deref().unwrap_or_default());

    let authorized = state.auth().handle_callback(&query, issued).await?;

    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(CONNECTED_SHOP_KEY, &authorized.shop)
        .await
        .map_err(session_error)?;

    info!(
        shop = %authorized.shop,
        webhook_registered = authorized.webhook_registered,
        "Install complete"
    );
    Ok(found(MANAGEMENT_PATH))
}
