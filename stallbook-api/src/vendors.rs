use axum::{
    extract::{Extension, Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use stallbook_core::identity::IdentityProfile;
use stallbook_shared::models::events::{topics, AccountCreatedEvent};
use stallbook_shared::models::messages::{
    CreateIdentityCommand, StatusReply, UpdateIdentityCommand, STATUS_SUCCESS,
};
use stallbook_shared::pii::Masked;

/// Authenticated vendor routes. Registration is public and wired separately
/// in `app`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/vendors/{id}", put(update_vendor).delete(delete_vendor))
        .route("/v1/profiles/{username}", get(get_profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVendorRequest {
    pub username: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub profession: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateVendorRequest {
    username: String,
    old_password: String,
    new_password: String,
    phone: String,
    address: String,
    profession: String,
}

/// POST /v1/vendors — account creation is owned by the identity service; this
/// handler is one bridge call plus a best-effort welcome notification.
pub async fn register_vendor(
    State(state): State<AppState>,
    Json(req): Json<RegisterVendorRequest>,
) -> Result<Json<StatusReply>, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("username and password are required".to_string()));
    }

    let username = req.username.clone();
    let cmd = CreateIdentityCommand {
        username: req.username,
        password: Masked(req.password),
        phone: req.phone,
        address: req.address,
        profession: req.profession,
    };
    let message = state.identity.create_identity(cmd).await?;

    // Fire-and-forget: a broker hiccup must not fail the registration the
    // downstream already committed.
    let event = AccountCreatedEvent {
        username: username.clone(),
        timestamp: Utc::now().timestamp(),
    };
    state.notifier.publish(topics::ACCOUNT_CREATED, &username, &event).await;

    Ok(Json(StatusReply {
        status: STATUS_SUCCESS.to_string(),
        message,
    }))
}

async fn update_vendor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVendorRequest>,
) -> Result<Json<StatusReply>, AppError> {
    if claims.user_id()? != id {
        return Err(AppError::AuthorizationError("cannot update another account".to_string()));
    }

    let cmd = UpdateIdentityCommand {
        user_id: id,
        username: req.username,
        old_password: Masked(req.old_password),
        new_password: Masked(req.new_password),
        phone: req.phone,
        address: req.address,
        profession: req.profession,
    };
    let message = state.identity.update_identity(cmd).await?;
    Ok(Json(StatusReply {
        status: STATUS_SUCCESS.to_string(),
        message,
    }))
}

async fn delete_vendor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusReply>, AppError> {
    if !claims.is_organizer() && claims.user_id()? != id {
        return Err(AppError::AuthorizationError("cannot delete another account".to_string()));
    }

    let message = state.identity.delete_identity(id).await?;
    Ok(Json(StatusReply {
        status: STATUS_SUCCESS.to_string(),
        message,
    }))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<Json<IdentityProfile>, AppError> {
    let profile = state.identity.fetch_profile(&username).await?;
    Ok(Json(profile))
}
