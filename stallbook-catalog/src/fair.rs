use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

/// Lifecycle of a book fair. Transitions are one-directional: once a fair has
/// left UPCOMING it never returns, and COMPLETED/CANCELLED are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FairStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl FairStatus {
    /// Reservations may only be created while the fair is still upcoming.
    pub fn accepts_reservations(&self) -> bool {
        matches!(self, FairStatus::Upcoming)
    }

    pub fn can_transition_to(&self, next: FairStatus) -> bool {
        matches!(
            (self, next),
            (FairStatus::Upcoming, FairStatus::Ongoing)
                | (FairStatus::Upcoming, FairStatus::Cancelled)
                | (FairStatus::Ongoing, FairStatus::Completed)
                | (FairStatus::Ongoing, FairStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FairStatus::Upcoming => "UPCOMING",
            FairStatus::Ongoing => "ONGOING",
            FairStatus::Completed => "COMPLETED",
            FairStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<FairStatus> {
        match s {
            "UPCOMING" => Some(FairStatus::Upcoming),
            "ONGOING" => Some(FairStatus::Ongoing),
            "COMPLETED" => Some(FairStatus::Completed),
            "CANCELLED" => Some(FairStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid fair transition: {from:?} -> {to:?}")]
pub struct FairTransitionError {
    pub from: FairStatus,
    pub to: FairStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookFair {
    pub id: Uuid,
    pub name: String,
    pub venue: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: FairStatus,
    pub created_at: DateTime<Utc>,
}

impl BookFair {
    pub fn new(name: String, venue: String, starts_on: NaiveDate, ends_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            venue,
            starts_on,
            ends_on,
            status: FairStatus::Upcoming,
            created_at: Utc::now(),
        }
    }

    pub fn transition_to(&mut self, next: FairStatus) -> Result<(), FairTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(FairTransitionError { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }
}
