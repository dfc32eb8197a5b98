use axum::{
    extract::{Extension, Path, Query, State},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use stallbook_catalog::ReservationSummary;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation).get(list_reservations))
        .route("/v1/reservations/{id}", delete(cancel_reservation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReservationRequest {
    book_fair_id: Uuid,
    stall_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: Uuid,
}

async fn create_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<Json<ReservationSummary>, AppError> {
    let user_id = claims.user_id()?;
    let summary = state
        .reservations
        .reserve(user_id, &claims.username, req.stall_id, req.book_fair_id)
        .await?;
    Ok(Json(summary))
}

async fn list_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ReservationSummary>>, AppError> {
    // Vendors may only read their own list; organizers see anyone's.
    if !claims.is_organizer() && claims.user_id()? != query.user_id {
        return Err(AppError::AuthorizationError(
            "cannot list another user's reservations".to_string(),
        ));
    }
    let rows = state.reservations.list_for_user(query.user_id).await?;
    Ok(Json(rows))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ReservationSummary>, AppError> {
    if claims.user_id()? != query.user_id {
        return Err(AppError::AuthorizationError(
            "cannot cancel on behalf of another user".to_string(),
        ));
    }
    let summary = state.reservations.cancel(id, query.user_id).await?;
    Ok(Json(summary))
}
