use uuid::Uuid;

/// Topics the notification consumers (email side) subscribe to.
pub mod topics {
    pub const RESERVATION_CONFIRMED: &str = "reservation.confirmed";
    pub const RESERVATION_CANCELLED: &str = "reservation.cancelled";
    pub const ACCOUNT_CREATED: &str = "account.created";
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationConfirmedEvent {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub stall_id: Uuid,
    pub book_fair_id: Uuid,
    pub pass_token: String,
    pub vendor_name: String,
    pub vendor_phone: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCancelledEvent {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub stall_id: Uuid,
    pub book_fair_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct AccountCreatedEvent {
    pub username: String,
    pub timestamp: i64,
}
