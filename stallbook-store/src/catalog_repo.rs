use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stallbook_catalog::{BookFair, FairStatus, Stall, StallSize, StallStatus};
use stallbook_core::repository::{BookFairRepository, StallRepository};
use stallbook_core::{CoreError, CoreResult};

fn internal(e: sqlx::Error) -> CoreError {
    CoreError::Internal(e.to_string())
}

#[derive(sqlx::FromRow)]
struct FairRow {
    id: Uuid,
    name: String,
    venue: String,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl FairRow {
    fn into_fair(self) -> CoreResult<BookFair> {
        let status = FairStatus::parse(&self.status)
            .ok_or_else(|| CoreError::Internal(format!("unknown fair status {:?}", self.status)))?;
        Ok(BookFair {
            id: self.id,
            name: self.name,
            venue: self.venue,
            starts_on: self.starts_on,
            ends_on: self.ends_on,
            status,
            created_at: self.created_at,
        })
    }
}

pub struct PgBookFairRepository {
    pool: PgPool,
}

impl PgBookFairRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookFairRepository for PgBookFairRepository {
    async fn insert(&self, fair: &BookFair) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO book_fairs (id, name, venue, starts_on, ends_on, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(fair.id)
        .bind(&fair.name)
        .bind(&fair.venue)
        .bind(fair.starts_on)
        .bind(fair.ends_on)
        .bind(fair.status.as_str())
        .bind(fair.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<BookFair>> {
        let row = sqlx::query_as::<_, FairRow>(
            "SELECT id, name, venue, starts_on, ends_on, status, created_at FROM book_fairs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(FairRow::into_fair).transpose()
    }

    async fn list(&self) -> CoreResult<Vec<BookFair>> {
        let rows = sqlx::query_as::<_, FairRow>(
            "SELECT id, name, venue, starts_on, ends_on, status, created_at FROM book_fairs ORDER BY starts_on ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.into_iter().map(FairRow::into_fair).collect()
    }

    async fn set_status(&self, id: Uuid, status: FairStatus) -> CoreResult<()> {
        let result = sqlx::query("UPDATE book_fairs SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("book fair not found".to_string()));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct StallRow {
    id: Uuid,
    name: String,
    size: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl StallRow {
    fn into_stall(self) -> CoreResult<Stall> {
        let size = StallSize::parse(&self.size)
            .ok_or_else(|| CoreError::Internal(format!("unknown stall size {:?}", self.size)))?;
        let status = StallStatus::parse(&self.status)
            .ok_or_else(|| CoreError::Internal(format!("unknown stall status {:?}", self.status)))?;
        Ok(Stall {
            id: self.id,
            name: self.name,
            size,
            status,
            created_at: self.created_at,
        })
    }
}

pub struct PgStallRepository {
    pool: PgPool,
}

impl PgStallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StallRepository for PgStallRepository {
    async fn insert(&self, stall: &Stall) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO stalls (id, name, size, status, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(stall.id)
        .bind(&stall.name)
        .bind(stall.size.as_str())
        .bind(stall.status.as_str())
        .bind(stall.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Stall>> {
        let row = sqlx::query_as::<_, StallRow>(
            "SELECT id, name, size, status, created_at FROM stalls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(StallRow::into_stall).transpose()
    }

    async fn list(&self) -> CoreResult<Vec<Stall>> {
        let rows = sqlx::query_as::<_, StallRow>(
            "SELECT id, name, size, status, created_at FROM stalls ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        rows.into_iter().map(StallRow::into_stall).collect()
    }

    async fn set_status(&self, id: Uuid, status: StallStatus) -> CoreResult<()> {
        let result = sqlx::query("UPDATE stalls SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("stall not found".to_string()));
        }
        Ok(())
    }
}
