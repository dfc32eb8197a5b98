use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stallbook_catalog::{Reservation, ReservationStatus};
use stallbook_core::outbox::OutboxRecord;
use stallbook_core::repository::ReservationRepository;
use stallbook_core::{CoreError, CoreResult};
use stallbook_shared::models::messages::VendorReservationRow;

fn internal(e: sqlx::Error) -> CoreError {
    CoreError::Internal(e.to_string())
}

/// The partial unique index over active (stall_id, book_fair_id) is the real
/// uniqueness guard; a 23505 from it comes back as the same Conflict the
/// pre-check would have produced.
fn map_insert_err(e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return match db.constraint() {
                Some("reservations_pass_token_key") => {
                    CoreError::Conflict("pass token collision".to_string())
                }
                _ => CoreError::Conflict("already reserved".to_string()),
            };
        }
    }
    internal(e)
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    user_id: Uuid,
    stall_id: Uuid,
    book_fair_id: Uuid,
    status: String,
    pass_token: String,
    created_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_reservation(self) -> CoreResult<Reservation> {
        let status = ReservationStatus::parse(&self.status)
            .ok_or_else(|| CoreError::Internal(format!("unknown reservation status {:?}", self.status)))?;
        Ok(Reservation {
            id: self.id,
            user_id: self.user_id,
            stall_id: self.stall_id,
            book_fair_id: self.book_fair_id,
            status,
            pass_token: self.pass_token,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VendorRow {
    reservation_id: Uuid,
    stall_id: Uuid,
    stall_name: String,
    book_fair_id: Uuid,
    book_fair_name: String,
    pass_token: String,
    status: String,
}

pub struct PgReservationRepository {
    pool: PgPool,
    capacity_per_fair: i64,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool, capacity_per_fair: i64) -> Self {
        Self {
            pool,
            capacity_per_fair,
        }
    }
}

async fn insert_outbox(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    outbox: &OutboxRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO outbox (id, topic, key, payload, attempts, next_attempt_at, dispatched_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(outbox.id)
    .bind(&outbox.topic)
    .bind(&outbox.key)
    .bind(&outbox.payload)
    .bind(outbox.attempts)
    .bind(outbox.next_attempt_at)
    .bind(outbox.dispatched_at)
    .bind(outbox.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create(&self, reservation: &Reservation, outbox: &OutboxRecord) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        // Serializes competing inserts for the same (user, fair) so the
        // capacity count below cannot race; released at commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", reservation.user_id, reservation.book_fair_id))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations \
             WHERE user_id = $1 AND book_fair_id = $2 AND status IN ('PENDING', 'APPROVED')",
        )
        .bind(reservation.user_id)
        .bind(reservation.book_fair_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(internal)?;
        if active >= self.capacity_per_fair {
            return Err(CoreError::Conflict("capacity exceeded".to_string()));
        }

        sqlx::query(
            "INSERT INTO reservations (id, user_id, stall_id, book_fair_id, status, pass_token, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reservation.id)
        .bind(reservation.user_id)
        .bind(reservation.stall_id)
        .bind(reservation.book_fair_id)
        .bind(reservation.status.as_str())
        .bind(&reservation.pass_token)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_err)?;

        insert_outbox(&mut tx, outbox).await.map_err(internal)?;

        sqlx::query("UPDATE stalls SET status = 'RESERVED' WHERE id = $1")
            .bind(reservation.stall_id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        tx.commit().await.map_err(internal)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, user_id, stall_id, book_fair_id, status, pass_token, created_at \
             FROM reservations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(ReservationRow::into_reservation).transpose()
    }

    async fn find_active_for_stall(&self, stall_id: Uuid, fair_id: Uuid) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, user_id, stall_id, book_fair_id, status, pass_token, created_at \
             FROM reservations \
             WHERE stall_id = $1 AND book_fair_id = $2 AND status IN ('PENDING', 'APPROVED')",
        )
        .bind(stall_id)
        .bind(fair_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(ReservationRow::into_reservation).transpose()
    }

    async fn count_active_for_user(&self, user_id: Uuid, fair_id: Uuid) -> CoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations \
             WHERE user_id = $1 AND book_fair_id = $2 AND status IN ('PENDING', 'APPROVED')",
        )
        .bind(user_id)
        .bind(fair_id)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, user_id, stall_id, book_fair_id, status, pass_token, created_at \
             FROM reservations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.into_iter().map(ReservationRow::into_reservation).collect()
    }

    async fn list_for_vendor(&self, vendor_id: Uuid) -> CoreResult<Vec<VendorReservationRow>> {
        let rows = sqlx::query_as::<_, VendorRow>(
            "SELECT r.id AS reservation_id, r.stall_id, s.name AS stall_name, \
                    r.book_fair_id, f.name AS book_fair_name, r.pass_token, r.status \
             FROM reservations r \
             JOIN stalls s ON s.id = r.stall_id \
             JOIN book_fairs f ON f.id = r.book_fair_id \
             WHERE r.user_id = $1 \
             ORDER BY r.created_at DESC",
        )
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        Ok(rows
            .into_iter()
            .map(|r| VendorReservationRow {
                reservation_id: r.reservation_id,
                stall_id: r.stall_id,
                stall_name: r.stall_name,
                book_fair_id: r.book_fair_id,
                book_fair_name: r.book_fair_name,
                pass_token: r.pass_token,
                status: r.status,
            })
            .collect())
    }

    async fn cancel(&self, id: Uuid, outbox: &OutboxRecord) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let result = sqlx::query("UPDATE reservations SET status = 'CANCELLED' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("reservation not found".to_string()));
        }

        insert_outbox(&mut tx, outbox).await.map_err(internal)?;

        sqlx::query(
            "UPDATE stalls SET status = 'AVAILABLE' \
             WHERE id = (SELECT stall_id FROM reservations WHERE id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;

        tx.commit().await.map_err(internal)?;
        Ok(())
    }
}
