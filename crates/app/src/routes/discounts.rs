//! Discount configuration routes.
//!
//! All routes act on the shop connected in the current session.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use autodiscount_core::{DiscountConfiguration, DiscountId, DiscountSpec, ShopDomain};

use crate::error::AppError;
use crate::middleware::CONNECTED_SHOP_KEY;
use crate::services::discounts::DiscountError;
use crate::state::AppState;

use super::MessageResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discount", get(list))
        .route("/discount/create", post(create))
        .route("/discount/update/{id}", put(update))
        .route("/discount/delete/{id}", delete(remove))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountResponse {
    message: &'static str,
    discount_config: DiscountConfiguration,
}

/// Shop connected in this session.
async fn connected_shop(session: &Session) -> Result<ShopDomain, AppError> {
    session
        .get::<ShopDomain>(CONNECTED_SHOP_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {e}")))?
        .ok_or(AppError::Discount(DiscountError::NotAuthorized))
}

/// GET /discount - List configurations in priority order.
#[instrument(skip(state, session))]
async fn list(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<DiscountConfiguration>>, AppError> {
    let shop = connected_shop(&session).await?;
    Ok(Json(state.discounts().list(&shop).await?))
}

/// POST /discount/create - Create a configuration.
#[instrument(skip(state, session, spec))]
async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(spec): Json<DiscountSpec>,
) -> Result<(StatusCode, Json<DiscountResponse>), AppError> {
    let shop = connected_shop(&session).await?;
    let config = state.discounts().create(&shop, spec).await?;

    Ok((
        StatusCode::CREATED,
        Json(DiscountResponse {
            message: "Discount configuration saved",
            discount_config: config,
        }),
    ))
}

/// PUT /discount/update/{id} - Replace a configuration.
#[instrument(skip(state, session, spec))]
async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(spec): Json<DiscountSpec>,
) -> Result<Json<DiscountResponse>, AppError> {
    let shop = connected_shop(&session).await?;
    let config = state
        .discounts()
        .update(&shop, &DiscountId::from(id), spec)
        .await?;

    Ok(Json(DiscountResponse {
        message: "Discount configuration updated",
        discount_config: config,
    }))
}

/// DELETE /discount/delete/{id} - Delete a configuration.
#[instrument(skip(state, session))]
async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let shop = connected_shop(&session).await?;
    state.discounts().delete(&shop, &DiscountId::from(id)).await?;

    Ok(Json(MessageResponse {
        message: "Discount configuration deleted",
    }))
}
