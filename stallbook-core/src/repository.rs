use async_trait::async_trait;
use uuid::Uuid;

use crate::outbox::OutboxRecord;
use crate::CoreResult;
use stallbook_catalog::{BookFair, FairStatus, Reservation, Stall, StallStatus};
use stallbook_shared::models::messages::VendorReservationRow;

/// Repository trait for book fair data access
#[async_trait]
pub trait BookFairRepository: Send + Sync {
    async fn insert(&self, fair: &BookFair) -> CoreResult<()>;

    async fn find(&self, id: Uuid) -> CoreResult<Option<BookFair>>;

    async fn list(&self) -> CoreResult<Vec<BookFair>>;

    async fn set_status(&self, id: Uuid, status: FairStatus) -> CoreResult<()>;
}

/// Repository trait for stall data access
#[async_trait]
pub trait StallRepository: Send + Sync {
    async fn insert(&self, stall: &Stall) -> CoreResult<()>;

    async fn find(&self, id: Uuid) -> CoreResult<Option<Stall>>;

    async fn list(&self) -> CoreResult<Vec<Stall>>;

    async fn set_status(&self, id: Uuid, status: StallStatus) -> CoreResult<()>;
}

/// Repository trait for reservation rows. Implementations are the real guard
/// for the allocation invariants: `create` must enforce "one active
/// reservation per (stall, fair)" and the per-user capacity atomically —
/// via storage constraints, not a pre-check — and write the outbox record in
/// the same transaction. A violated constraint surfaces as
/// `CoreError::Conflict`.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn create(&self, reservation: &Reservation, outbox: &OutboxRecord) -> CoreResult<()>;

    async fn find(&self, id: Uuid) -> CoreResult<Option<Reservation>>;

    async fn find_active_for_stall(&self, stall_id: Uuid, fair_id: Uuid) -> CoreResult<Option<Reservation>>;

    async fn count_active_for_user(&self, user_id: Uuid, fair_id: Uuid) -> CoreResult<i64>;

    /// Most recent first.
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>>;

    /// Summaries with stall and fair names joined in, most recent first.
    async fn list_for_vendor(&self, vendor_id: Uuid) -> CoreResult<Vec<VendorReservationRow>>;

    /// Transitions the row to CANCELLED and writes the outbox record in the
    /// same transaction.
    async fn cancel(&self, id: Uuid, outbox: &OutboxRecord) -> CoreResult<()>;
}

/// Repository trait for the transactional outbox.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Undispatched records whose next attempt is due, oldest first.
    async fn pending_batch(&self, limit: i64) -> CoreResult<Vec<OutboxRecord>>;

    async fn mark_dispatched(&self, id: Uuid) -> CoreResult<()>;

    /// Bumps the attempt counter and pushes next_attempt_at out by the
    /// backoff schedule.
    async fn record_failure(&self, id: Uuid) -> CoreResult<()>;
}
