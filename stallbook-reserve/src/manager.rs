use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::tokens::generate_pass_token;
use stallbook_catalog::{Reservation, ReservationStatus, ReservationSummary, StallStatus};
use stallbook_core::identity::IdentityGateway;
use stallbook_core::outbox::OutboxRecord;
use stallbook_core::repository::{BookFairRepository, ReservationRepository, StallRepository};
use stallbook_core::{CoreError, CoreResult};
use stallbook_shared::models::events::{topics, ReservationCancelledEvent, ReservationConfirmedEvent};

/// Owns the reservation invariants and lifecycle. Validation and conflict
/// checks run synchronously against local state before anything touches the
/// message bus; the identity lookup is the only cross-service step and a
/// timeout there aborts the reservation before any row exists.
pub struct ReservationManager {
    reservations: Arc<dyn ReservationRepository>,
    stalls: Arc<dyn StallRepository>,
    fairs: Arc<dyn BookFairRepository>,
    identity: Arc<dyn IdentityGateway>,
    max_active_per_fair: i64,
}

impl ReservationManager {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        stalls: Arc<dyn StallRepository>,
        fairs: Arc<dyn BookFairRepository>,
        identity: Arc<dyn IdentityGateway>,
        max_active_per_fair: i64,
    ) -> Self {
        Self {
            reservations,
            stalls,
            fairs,
            identity,
            max_active_per_fair,
        }
    }

    pub async fn reserve(
        &self,
        user_id: Uuid,
        username: &str,
        stall_id: Uuid,
        book_fair_id: Uuid,
    ) -> CoreResult<ReservationSummary> {
        let fair = self
            .fairs
            .find(book_fair_id)
            .await?
            .ok_or_else(|| CoreError::Validation("book fair not found".to_string()))?;
        let stall = self
            .stalls
            .find(stall_id)
            .await?
            .ok_or_else(|| CoreError::Validation("stall not found".to_string()))?;

        if !fair.status.accepts_reservations() {
            return Err(CoreError::Validation(format!(
                "book fair {} is not accepting reservations",
                fair.status.as_str()
            )));
        }
        if stall.status == StallStatus::Blocked {
            return Err(CoreError::Validation("stall is blocked".to_string()));
        }

        // Pre-checks; the storage constraint behind `create` is the guarantee.
        if self
            .reservations
            .find_active_for_stall(stall_id, book_fair_id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict("already reserved".to_string()));
        }
        if self
            .reservations
            .count_active_for_user(user_id, book_fair_id)
            .await?
            >= self.max_active_per_fair
        {
            return Err(CoreError::Conflict("capacity exceeded".to_string()));
        }

        // Cross-service step: Timeout/Remote surface to the caller and no row
        // is created.
        let profile = self.identity.fetch_profile(username).await?;

        let reservation = Reservation::new(user_id, stall_id, book_fair_id, generate_pass_token());
        let event = ReservationConfirmedEvent {
            reservation_id: reservation.id,
            user_id,
            stall_id,
            book_fair_id,
            pass_token: reservation.pass_token.clone(),
            vendor_name: profile.username,
            vendor_phone: profile.phone,
            timestamp: Utc::now().timestamp(),
        };
        let outbox = OutboxRecord::new(
            topics::RESERVATION_CONFIRMED,
            reservation.id.to_string(),
            serde_json::to_string(&event)?,
        );

        self.reservations.create(&reservation, &outbox).await?;

        info!(
            reservation_id = %reservation.id,
            user_id = %user_id,
            stall_id = %stall_id,
            book_fair_id = %book_fair_id,
            "Reservation approved"
        );
        Ok(reservation.summary())
    }

    /// Owner-only. Cancelling an already-cancelled reservation is an
    /// idempotent no-op; COMPLETED and REJECTED are conflicts.
    pub async fn cancel(&self, reservation_id: Uuid, user_id: Uuid) -> CoreResult<ReservationSummary> {
        let reservation = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("reservation not found".to_string()))?;

        if reservation.user_id != user_id {
            return Err(CoreError::Authorization(
                "reservation belongs to another user".to_string(),
            ));
        }

        match reservation.status {
            ReservationStatus::Cancelled => Ok(reservation.summary()),
            ReservationStatus::Completed | ReservationStatus::Rejected => Err(CoreError::Conflict(
                format!("reservation is {}", reservation.status.as_str()),
            )),
            ReservationStatus::Pending | ReservationStatus::Approved => {
                let event = ReservationCancelledEvent {
                    reservation_id,
                    user_id,
                    stall_id: reservation.stall_id,
                    book_fair_id: reservation.book_fair_id,
                    timestamp: Utc::now().timestamp(),
                };
                let outbox = OutboxRecord::new(
                    topics::RESERVATION_CANCELLED,
                    reservation_id.to_string(),
                    serde_json::to_string(&event)?,
                );
                self.reservations.cancel(reservation_id, &outbox).await?;

                info!(reservation_id = %reservation_id, user_id = %user_id, "Reservation cancelled");
                let mut summary = reservation.summary();
                summary.status = ReservationStatus::Cancelled;
                Ok(summary)
            }
        }
    }

    /// Most recent first.
    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<ReservationSummary>> {
        let rows = self.reservations.list_for_user(user_id).await?;
        Ok(rows.iter().map(Reservation::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stallbook_bridge::StaticIdentityGateway;
    use stallbook_catalog::{BookFair, FairStatus, Stall, StallSize};
    use stallbook_core::identity::IdentityProfile;
    use stallbook_core::repository::OutboxRepository;
    use stallbook_shared::models::messages::CreateIdentityCommand;
    use stallbook_store::memory::MemoryStore;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn manager_with(store: Arc<MemoryStore>) -> ReservationManager {
        let identity = Arc::new(StaticIdentityGateway::for_user(Uuid::new_v4(), "vendor"));
        ReservationManager::new(store.clone(), store.clone(), store, identity, 3)
    }

    fn fair() -> BookFair {
        BookFair::new(
            "Colombo Book Fair".to_string(),
            "Exhibition Hall 2".to_string(),
            NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 25).unwrap(),
        )
    }

    fn stall(name: &str) -> Stall {
        Stall::new(name.to_string(), StallSize::Medium)
    }

    fn seeded() -> (ReservationManager, Arc<MemoryStore>, BookFair, Stall) {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        let s = stall("A-01");
        store.seed_fair(f.clone());
        store.seed_stall(s.clone());
        (manager_with(store.clone()), store, f, s)
    }

    #[tokio::test]
    async fn test_reserve_approves_and_queues_notification() {
        let (manager, store, f, s) = seeded();
        let user = Uuid::new_v4();

        let summary = manager.reserve(user, "vendor42", s.id, f.id).await.unwrap();
        assert_eq!(summary.status, ReservationStatus::Approved);
        assert_eq!(summary.user_id, user);
        assert!(summary.pass_token.starts_with("BF-"));

        // Confirmation rides the outbox, in the same transaction as the row.
        let pending = store.pending_batch(16).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].topic, "reservation.confirmed");

        // Stall marked informationally.
        let s = store.stall_snapshot(s.id).unwrap();
        assert_eq!(s.status, StallStatus::Reserved);
    }

    #[tokio::test]
    async fn test_reserve_unknown_references_fail_validation() {
        let (manager, _store, f, s) = seeded();
        let user = Uuid::new_v4();

        let err = manager.reserve(user, "v", Uuid::new_v4(), f.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = manager.reserve(user, "v", s.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reserve_rejected_unless_fair_upcoming() {
        for status in [FairStatus::Ongoing, FairStatus::Completed, FairStatus::Cancelled] {
            let store = Arc::new(MemoryStore::new());
            let mut f = fair();
            f.status = status;
            let s = stall("B-02");
            store.seed_fair(f.clone());
            store.seed_stall(s.clone());
            let manager = manager_with(store.clone());

            let user = Uuid::new_v4();
            let err = manager.reserve(user, "v", s.id, f.id).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "status {:?}", status);

            // No row was created.
            assert!(manager.list_for_user(user).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_reserve_blocked_stall_fails_validation() {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        let mut s = stall("C-03");
        s.status = StallStatus::Blocked;
        store.seed_fair(f.clone());
        store.seed_stall(s.clone());
        let manager = manager_with(store);

        let err = manager.reserve(Uuid::new_v4(), "v", s.id, f.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_second_vendor_conflicts_on_same_stall() {
        let (manager, _store, f, s) = seeded();

        manager.reserve(Uuid::new_v4(), "first", s.id, f.id).await.unwrap();
        let err = manager.reserve(Uuid::new_v4(), "second", s.id, f.id).await.unwrap_err();
        match err {
            CoreError::Conflict(msg) => assert_eq!(msg, "already reserved"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_capacity_three_then_conflict() {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        store.seed_fair(f.clone());
        let stalls: Vec<Stall> = (0..4).map(|i| stall(&format!("D-{:02}", i))).collect();
        for s in &stalls {
            store.seed_stall(s.clone());
        }
        let manager = manager_with(store);
        let user = Uuid::new_v4();

        for s in &stalls[..3] {
            manager.reserve(user, "hoarder", s.id, f.id).await.unwrap();
        }
        let err = manager.reserve(user, "hoarder", stalls[3].id, f.id).await.unwrap_err();
        match err {
            CoreError::Conflict(msg) => assert_eq!(msg, "capacity exceeded"),
            other => panic!("expected conflict, got {:?}", other),
        }

        // A cancelled slot frees capacity.
        let held = manager.list_for_user(user).await.unwrap();
        manager.cancel(held[0].id, user).await.unwrap();
        manager.reserve(user, "hoarder", stalls[3].id, f.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_ten_concurrent_reserves_one_winner() {
        let (manager, _store, f, s) = seeded();
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for i in 0..10 {
            let manager = manager.clone();
            let (stall_id, fair_id) = (s.id, f.id);
            handles.push(tokio::spawn(async move {
                manager
                    .reserve(Uuid::new_v4(), &format!("vendor{}", i), stall_id, fair_id)
                    .await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CoreError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 9);
    }

    #[tokio::test]
    async fn test_pass_tokens_never_repeat() {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        store.seed_fair(f.clone());
        let manager = manager_with(store.clone());

        let mut tokens = HashSet::new();
        for i in 0..50 {
            let s = stall(&format!("E-{:02}", i));
            store.seed_stall(s.clone());
            let summary = manager.reserve(Uuid::new_v4(), "v", s.id, f.id).await.unwrap();
            assert!(tokens.insert(summary.pass_token), "token repeated at {}", i);
        }
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership() {
        let (manager, _store, f, s) = seeded();
        let owner = Uuid::new_v4();
        let summary = manager.reserve(owner, "owner", s.id, f.id).await.unwrap();

        let err = manager.cancel(summary.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::Authorization(_)));

        // Status untouched.
        let held = manager.list_for_user(owner).await.unwrap();
        assert_eq!(held[0].status, ReservationStatus::Approved);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (manager, store, f, s) = seeded();
        let owner = Uuid::new_v4();
        let summary = manager.reserve(owner, "owner", s.id, f.id).await.unwrap();

        let first = manager.cancel(summary.id, owner).await.unwrap();
        assert_eq!(first.status, ReservationStatus::Cancelled);

        let outbox_after_first = store.outbox_snapshot().len();
        let second = manager.cancel(summary.id, owner).await.unwrap();
        assert_eq!(second.status, ReservationStatus::Cancelled);
        // No duplicate cancellation event.
        assert_eq!(store.outbox_snapshot().len(), outbox_after_first);

        // Stall released.
        let s = store.stall_snapshot(s.id).unwrap();
        assert_eq!(s.status, StallStatus::Available);
    }

    #[tokio::test]
    async fn test_cancel_unknown_reservation_is_not_found() {
        let (manager, _store, _f, _s) = seeded();
        let err = manager.cancel(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    struct UnreachableIdentity;

    #[async_trait]
    impl IdentityGateway for UnreachableIdentity {
        async fn fetch_profile(&self, _username: &str) -> stallbook_core::CoreResult<IdentityProfile> {
            Err(CoreError::Timeout("no reply from downstream service".to_string()))
        }

        async fn create_identity(&self, _cmd: CreateIdentityCommand) -> stallbook_core::CoreResult<String> {
            Err(CoreError::Timeout("no reply from downstream service".to_string()))
        }

        async fn update_identity(
            &self,
            _cmd: stallbook_shared::models::messages::UpdateIdentityCommand,
        ) -> stallbook_core::CoreResult<String> {
            Err(CoreError::Timeout("no reply from downstream service".to_string()))
        }

        async fn delete_identity(&self, _user_id: Uuid) -> stallbook_core::CoreResult<String> {
            Err(CoreError::Timeout("no reply from downstream service".to_string()))
        }
    }

    #[tokio::test]
    async fn test_identity_timeout_aborts_before_insert() {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        let s = stall("F-01");
        store.seed_fair(f.clone());
        store.seed_stall(s.clone());
        let manager = ReservationManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(UnreachableIdentity),
            3,
        );

        let user = Uuid::new_v4();
        let err = manager.reserve(user, "v", s.id, f.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));

        assert!(manager.list_for_user(user).await.unwrap().is_empty());
        assert!(store.outbox_snapshot().is_empty());
        // Stall never flipped.
        let s = store.stall_snapshot(s.id).unwrap();
        assert_eq!(s.status, StallStatus::Available);
    }

    #[tokio::test]
    async fn test_list_for_user_most_recent_first() {
        let store = Arc::new(MemoryStore::new());
        let f = fair();
        store.seed_fair(f.clone());
        let manager = manager_with(store.clone());
        let user = Uuid::new_v4();

        let mut expected = Vec::new();
        for i in 0..3 {
            let s = stall(&format!("G-{:02}", i));
            store.seed_stall(s.clone());
            let summary = manager.reserve(user, "v", s.id, f.id).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            expected.push(summary.id);
        }
        expected.reverse();

        let listed: Vec<Uuid> = manager
            .list_for_user(user)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, expected);
    }
}
