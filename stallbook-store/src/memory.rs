use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use stallbook_catalog::{BookFair, FairStatus, Reservation, ReservationStatus, Stall, StallStatus};
use stallbook_core::outbox::OutboxRecord;
use stallbook_core::repository::{
    BookFairRepository, OutboxRepository, ReservationRepository, StallRepository,
};
use stallbook_core::{CoreError, CoreResult};
use stallbook_shared::models::messages::VendorReservationRow;

#[derive(Default)]
struct Inner {
    fairs: HashMap<Uuid, BookFair>,
    stalls: HashMap<Uuid, Stall>,
    reservations: HashMap<Uuid, Reservation>,
    outbox: Vec<OutboxRecord>,
}

/// In-memory store for tests and local development. One mutex guards all
/// tables, so `create` checks and inserts atomically — the same guarantees
/// the Postgres constraints give, without Postgres.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    capacity_per_fair: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(3)
    }

    pub fn with_capacity(capacity_per_fair: i64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity_per_fair,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    pub fn seed_fair(&self, fair: BookFair) {
        self.lock().fairs.insert(fair.id, fair);
    }

    pub fn seed_stall(&self, stall: Stall) {
        self.lock().stalls.insert(stall.id, stall);
    }

    pub fn fair_snapshot(&self, id: Uuid) -> Option<BookFair> {
        self.lock().fairs.get(&id).cloned()
    }

    pub fn stall_snapshot(&self, id: Uuid) -> Option<Stall> {
        self.lock().stalls.get(&id).cloned()
    }

    pub fn enqueue_outbox(&self, record: OutboxRecord) {
        self.lock().outbox.push(record);
    }

    pub fn outbox_snapshot(&self) -> Vec<OutboxRecord> {
        self.lock().outbox.clone()
    }

    /// Pull a record's next attempt into the past, for backoff tests.
    pub fn force_due(&self, id: Uuid) {
        let mut inner = self.lock();
        if let Some(record) = inner.outbox.iter_mut().find(|r| r.id == id) {
            record.next_attempt_at = Utc::now() - Duration::seconds(1);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookFairRepository for MemoryStore {
    async fn insert(&self, fair: &BookFair) -> CoreResult<()> {
        self.lock().fairs.insert(fair.id, fair.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<BookFair>> {
        Ok(self.lock().fairs.get(&id).cloned())
    }

    async fn list(&self) -> CoreResult<Vec<BookFair>> {
        let mut fairs: Vec<BookFair> = self.lock().fairs.values().cloned().collect();
        fairs.sort_by_key(|f| f.starts_on);
        Ok(fairs)
    }

    async fn set_status(&self, id: Uuid, status: FairStatus) -> CoreResult<()> {
        let mut inner = self.lock();
        let fair = inner
            .fairs
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound("book fair not found".to_string()))?;
        fair.status = status;
        Ok(())
    }
}

#[async_trait]
impl StallRepository for MemoryStore {
    async fn insert(&self, stall: &Stall) -> CoreResult<()> {
        self.lock().stalls.insert(stall.id, stall.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Stall>> {
        Ok(self.lock().stalls.get(&id).cloned())
    }

    async fn list(&self) -> CoreResult<Vec<Stall>> {
        let mut stalls: Vec<Stall> = self.lock().stalls.values().cloned().collect();
        stalls.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stalls)
    }

    async fn set_status(&self, id: Uuid, status: StallStatus) -> CoreResult<()> {
        let mut inner = self.lock();
        let stall = inner
            .stalls
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound("stall not found".to_string()))?;
        stall.status = status;
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn create(&self, reservation: &Reservation, outbox: &OutboxRecord) -> CoreResult<()> {
        let mut inner = self.lock();

        // Mirrors the partial unique index on active (stall_id, book_fair_id).
        let stall_taken = inner.reservations.values().any(|r| {
            r.stall_id == reservation.stall_id
                && r.book_fair_id == reservation.book_fair_id
                && r.status.is_active()
        });
        if stall_taken {
            return Err(CoreError::Conflict("already reserved".to_string()));
        }

        // Mirrors the unique constraint on pass_token.
        if inner.reservations.values().any(|r| r.pass_token == reservation.pass_token) {
            return Err(CoreError::Conflict("pass token collision".to_string()));
        }

        let active_for_user = inner
            .reservations
            .values()
            .filter(|r| {
                r.user_id == reservation.user_id
                    && r.book_fair_id == reservation.book_fair_id
                    && r.status.is_active()
            })
            .count() as i64;
        if active_for_user >= self.capacity_per_fair {
            return Err(CoreError::Conflict("capacity exceeded".to_string()));
        }

        inner.reservations.insert(reservation.id, reservation.clone());
        inner.outbox.push(outbox.clone());
        if let Some(stall) = inner.stalls.get_mut(&reservation.stall_id) {
            stall.status = StallStatus::Reserved;
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        Ok(self.lock().reservations.get(&id).cloned())
    }

    async fn find_active_for_stall(&self, stall_id: Uuid, fair_id: Uuid) -> CoreResult<Option<Reservation>> {
        Ok(self
            .lock()
            .reservations
            .values()
            .find(|r| r.stall_id == stall_id && r.book_fair_id == fair_id && r.status.is_active())
            .cloned())
    }

    async fn count_active_for_user(&self, user_id: Uuid, fair_id: Uuid) -> CoreResult<i64> {
        Ok(self
            .lock()
            .reservations
            .values()
            .filter(|r| r.user_id == user_id && r.book_fair_id == fair_id && r.status.is_active())
            .count() as i64)
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let mut rows: Vec<Reservation> = self
            .lock()
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_for_vendor(&self, vendor_id: Uuid) -> CoreResult<Vec<VendorReservationRow>> {
        let inner = self.lock();
        let mut rows: Vec<(chrono::DateTime<Utc>, VendorReservationRow)> = inner
            .reservations
            .values()
            .filter(|r| r.user_id == vendor_id)
            .map(|r| {
                let stall_name = inner
                    .stalls
                    .get(&r.stall_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                let fair_name = inner
                    .fairs
                    .get(&r.book_fair_id)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                (
                    r.created_at,
                    VendorReservationRow {
                        reservation_id: r.id,
                        stall_id: r.stall_id,
                        stall_name,
                        book_fair_id: r.book_fair_id,
                        book_fair_name: fair_name,
                        pass_token: r.pass_token.clone(),
                        status: r.status.as_str().to_string(),
                    },
                )
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn cancel(&self, id: Uuid, outbox: &OutboxRecord) -> CoreResult<()> {
        let mut inner = self.lock();
        let stall_id = {
            let reservation = inner
                .reservations
                .get_mut(&id)
                .ok_or_else(|| CoreError::NotFound("reservation not found".to_string()))?;
            reservation.status = ReservationStatus::Cancelled;
            reservation.stall_id
        };
        inner.outbox.push(outbox.clone());
        if let Some(stall) = inner.stalls.get_mut(&stall_id) {
            stall.status = StallStatus::Available;
        }
        Ok(())
    }
}

#[async_trait]
impl OutboxRepository for MemoryStore {
    async fn pending_batch(&self, limit: i64) -> CoreResult<Vec<OutboxRecord>> {
        let now = Utc::now();
        let mut due: Vec<OutboxRecord> = self
            .lock()
            .outbox
            .iter()
            .filter(|r| r.dispatched_at.is_none() && r.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_dispatched(&self, id: Uuid) -> CoreResult<()> {
        let mut inner = self.lock();
        if let Some(record) = inner.outbox.iter_mut().find(|r| r.id == id) {
            record.dispatched_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_failure(&self, id: Uuid) -> CoreResult<()> {
        let mut inner = self.lock();
        if let Some(record) = inner.outbox.iter_mut().find(|r| r.id == id) {
            let backoff = OutboxRecord::backoff_seconds(record.attempts);
            record.attempts += 1;
            record.next_attempt_at = Utc::now() + Duration::seconds(backoff);
        }
        Ok(())
    }
}
