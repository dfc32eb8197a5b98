use uuid::Uuid;
use crate::pii::Masked;

/// Command/reply channel pairs shared with the identity service.
/// Every payload carries a `correlationId` so the reply consumer can route
/// it back to the waiting caller.
pub mod channels {
    pub const CREATE_IDENTITY: &str = "create-identity";
    pub const CREATE_IDENTITY_REPLY: &str = "create-identity-reply";
    pub const UPDATE_IDENTITY: &str = "update-identity";
    pub const UPDATE_IDENTITY_REPLY: &str = "update-identity-reply";
    pub const DELETE_IDENTITY: &str = "delete-identity";
    pub const DELETE_IDENTITY_REPLY: &str = "delete-identity-reply";
    pub const GET_IDENTITY_PROFILE: &str = "get-identity-profile";
    pub const GET_IDENTITY_PROFILE_REPLY: &str = "get-identity-profile-reply";
    pub const GET_VENDOR_RESERVATIONS: &str = "get-vendor-reservations";
    pub const GET_VENDOR_RESERVATIONS_REPLY: &str = "get-vendor-reservations-reply";

    /// Reply channels this service consumes for its own outbound calls.
    pub const REPLY_CHANNELS: [&str; 4] = [
        CREATE_IDENTITY_REPLY,
        UPDATE_IDENTITY_REPLY,
        DELETE_IDENTITY_REPLY,
        GET_IDENTITY_PROFILE_REPLY,
    ];
}

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentityCommand {
    pub username: String,
    pub password: Masked<String>,
    pub phone: String,
    pub address: String,
    pub profession: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdentityCommand {
    pub user_id: Uuid,
    pub username: String,
    pub old_password: Masked<String>,
    pub new_password: Masked<String>,
    pub phone: String,
    pub address: String,
    pub profession: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteIdentityCommand {
    pub user_id: Uuid,
}

/// Generic `{status, message}` reply shared by the identity mutation channels.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfileRequest {
    pub username: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfileReply {
    pub id: Uuid,
    pub username: String,
    pub phone: String,
    pub address: String,
    pub profession: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorReservationsRequest {
    pub vendor_id: Uuid,
}

/// One row of the `get-vendor-reservations-reply` payload; stall and fair
/// names are denormalized in so the identity service never has to call back.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorReservationRow {
    pub reservation_id: Uuid,
    pub stall_id: Uuid,
    pub stall_name: String,
    pub book_fair_id: Uuid,
    pub book_fair_name: String,
    pub pass_token: String,
    pub status: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorReservationsReply {
    pub reservations: Vec<VendorReservationRow>,
    pub status: String,
    pub message: String,
}
