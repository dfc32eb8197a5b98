use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Active reservations count toward the per-stall uniqueness and the
    /// per-vendor capacity invariants.
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Approved => "APPROVED",
            ReservationStatus::Rejected => "REJECTED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<ReservationStatus> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "APPROVED" => Some(ReservationStatus::Approved),
            "REJECTED" => Some(ReservationStatus::Rejected),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            "COMPLETED" => Some(ReservationStatus::Completed),
            _ => None,
        }
    }
}

/// A stall allocation. The pass token is issued once at creation, never
/// changes, and is the join key the QR codec uses at venue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stall_id: Uuid,
    pub book_fair_id: Uuid,
    pub status: ReservationStatus,
    pub pass_token: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(user_id: Uuid, stall_id: Uuid, book_fair_id: Uuid, pass_token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            stall_id,
            book_fair_id,
            status: ReservationStatus::Approved,
            pass_token,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ReservationSummary {
        ReservationSummary {
            id: self.id,
            user_id: self.user_id,
            stall_id: self.stall_id,
            book_fair_id: self.book_fair_id,
            status: self.status,
            pass_token: self.pass_token.clone(),
        }
    }
}

/// What the API returns for a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stall_id: Uuid,
    pub book_fair_id: Uuid,
    pub status: ReservationStatus,
    pub pass_token: String,
}
