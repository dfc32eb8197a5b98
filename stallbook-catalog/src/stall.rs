use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StallSize {
    Small,
    Medium,
    Large,
}

impl StallSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallSize::Small => "SMALL",
            StallSize::Medium => "MEDIUM",
            StallSize::Large => "LARGE",
        }
    }

    pub fn parse(s: &str) -> Option<StallSize> {
        match s {
            "SMALL" => Some(StallSize::Small),
            "MEDIUM" => Some(StallSize::Medium),
            "LARGE" => Some(StallSize::Large),
            _ => None,
        }
    }
}

/// RESERVED is informational (kept in sync by the allocation engine); only
/// BLOCKED takes a stall out of service. Uniqueness is enforced on the
/// reservation rows, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StallStatus {
    Available,
    Blocked,
    Reserved,
}

impl StallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallStatus::Available => "AVAILABLE",
            StallStatus::Blocked => "BLOCKED",
            StallStatus::Reserved => "RESERVED",
        }
    }

    pub fn parse(s: &str) -> Option<StallStatus> {
        match s {
            "AVAILABLE" => Some(StallStatus::Available),
            "BLOCKED" => Some(StallStatus::Blocked),
            "RESERVED" => Some(StallStatus::Reserved),
            _ => None,
        }
    }
}

/// A stall exists independent of any book fair; it becomes associated with a
/// fair only through a reservation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stall {
    pub id: Uuid,
    pub name: String,
    pub size: StallSize,
    pub status: StallStatus,
    pub created_at: DateTime<Utc>,
}

impl Stall {
    pub fn new(name: String, size: StallSize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            size,
            status: StallStatus::Available,
            created_at: Utc::now(),
        }
    }
}
