use axum::{
    extract::{Extension, Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use stallbook_catalog::{BookFair, FairStatus, Stall, StallSize};

/// Catalog routes. Browsing is open to any authenticated caller; mutations
/// are gated on the organizer role inside the handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/fairs", get(list_fairs).post(create_fair))
        .route("/v1/fairs/{id}/status", put(update_fair_status))
        .route("/v1/stalls", get(list_stalls).post(create_stall))
}

fn require_organizer(claims: &Claims) -> Result<(), AppError> {
    if !claims.is_organizer() {
        return Err(AppError::AuthorizationError("organizer role required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFairRequest {
    name: String,
    venue: String,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFairStatusRequest {
    status: FairStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStallRequest {
    name: String,
    size: StallSize,
}

async fn create_fair(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateFairRequest>,
) -> Result<Json<BookFair>, AppError> {
    require_organizer(&claims)?;
    if req.ends_on < req.starts_on {
        return Err(AppError::ValidationError("fair ends before it starts".to_string()));
    }
    let fair = BookFair::new(req.name, req.venue, req.starts_on, req.ends_on);
    state.fairs.insert(&fair).await?;
    Ok(Json(fair))
}

async fn list_fairs(State(state): State<AppState>) -> Result<Json<Vec<BookFair>>, AppError> {
    Ok(Json(state.fairs.list().await?))
}

async fn update_fair_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFairStatusRequest>,
) -> Result<Json<BookFair>, AppError> {
    require_organizer(&claims)?;
    let mut fair = state
        .fairs
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("book fair not found".to_string()))?;

    fair.transition_to(req.status)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    state.fairs.set_status(id, req.status).await?;
    Ok(Json(fair))
}

async fn create_stall(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStallRequest>,
) -> Result<Json<Stall>, AppError> {
    require_organizer(&claims)?;
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("stall name is required".to_string()));
    }
    let stall = Stall::new(req.name, req.size);
    state.stalls.insert(&stall).await?;
    Ok(Json(stall))
}

async fn list_stalls(State(state): State<AppState>) -> Result<Json<Vec<Stall>>, AppError> {
    Ok(Json(state.stalls.list().await?))
}
