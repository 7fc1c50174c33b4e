use crate::error::StoreError;
use crate::models::ListingRecord;
use crate::store::ListingStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS listings (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT UNIQUE NOT NULL,
        make VARCHAR(100) NOT NULL,
        model VARCHAR(100) NOT NULL,
        year INT NOT NULL,
        mileage BIGINT NOT NULL,
        transmission VARCHAR(100) NOT NULL,
        engine_capacity DOUBLE PRECISION NOT NULL,
        fuel_type VARCHAR(50) NOT NULL,
        plate VARCHAR(50) NOT NULL,
        body_type VARCHAR(50) NOT NULL,
        price BIGINT,
        seen BIGINT NOT NULL DEFAULT 1,
        sold BOOLEAN NOT NULL DEFAULT false,
        description TEXT NOT NULL,
        detail_url TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

const SELECT_ACTIVE: &str = r"
    SELECT id, remote_id, make, model, year, mileage, transmission, engine_capacity,
           fuel_type, plate, body_type, price, seen, sold, description, detail_url, created_at
    FROM listings
    WHERE sold = false
";

const INSERT: &str = r"
    INSERT INTO listings (
        remote_id, make, model, year, mileage, transmission, engine_capacity,
        fuel_type, plate, body_type, price, description, detail_url, created_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
    RETURNING id
";

const MARK_SOLD: &str = "UPDATE listings SET sold = true WHERE id = $1 AND sold = false";

const ROW_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM listings WHERE id = $1)";

/// Postgres-backed store; one row per listing in `listings`
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    /// Connect and verify the database answers
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!("connected to Postgres");
        Ok(Self { pool })
    }

    fn record_from_row(row: &PgRow) -> Result<ListingRecord, sqlx::Error> {
        Ok(ListingRecord {
            persisted_id: Some(row.try_get("id")?),
            remote_id: from_db(row.try_get("remote_id")?),
            make: row.try_get("make")?,
            model: row.try_get("model")?,
            year: from_db(i64::from(row.try_get::<i32, _>("year")?)),
            mileage: from_db(row.try_get("mileage")?),
            transmission: row.try_get("transmission")?,
            engine_capacity: row.try_get("engine_capacity")?,
            fuel_type: row.try_get("fuel_type")?,
            plate: row.try_get("plate")?,
            body_type: row.try_get("body_type")?,
            price: row.try_get::<Option<i64>, _>("price")?.map(from_db),
            seen_count: from_db(row.try_get("seen")?),
            sold: row.try_get("sold")?,
            description: row.try_get("description")?,
            detail_url: row.try_get("detail_url")?,
            scraped_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn update_one(&self, query: &str, persisted_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(query).bind(persisted_id).execute(&self.pool).await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::NotFound(persisted_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        debug!("listings table ready");
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError> {
        let rows = sqlx::query(SELECT_ACTIVE).fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(Self::record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(active = records.len(), "loaded active listings");
        Ok(records)
    }

    async fn insert(&self, record: &ListingRecord) -> Result<i64, StoreError> {
        let inserted = sqlx::query_scalar::<_, i64>(INSERT)
            .bind(to_db(record.remote_id))
            .bind(&record.make)
            .bind(&record.model)
            .bind(i32::try_from(record.year).unwrap_or(0))
            .bind(to_db(record.mileage))
            .bind(&record.transmission)
            .bind(record.engine_capacity)
            .bind(&record.fuel_type)
            .bind(&record.plate)
            .bind(&record.body_type)
            .bind(record.price.map(to_db))
            .bind(&record.description)
            .bind(&record.detail_url)
            .bind(record.scraped_at)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.remote_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_sold(&self, persisted_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(MARK_SOLD).bind(persisted_id).execute(&self.pool).await?;
        if result.rows_affected() == 1 {
            return Ok(());
        }
        // Nothing changed: either already sold or not there at all.
        let exists: bool = sqlx::query_scalar(ROW_EXISTS)
            .bind(persisted_id)
            .fetch_one(&self.pool)
            .await?;
        unchanged_sold_update(persisted_id, exists)
    }

    async fn increment_seen(&self, persisted_id: i64) -> Result<(), StoreError> {
        self.update_one("UPDATE listings SET seen = seen + 1 WHERE id = $1", persisted_id)
            .await
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// A sold update that touched no row succeeds when the row is already sold
fn unchanged_sold_update(persisted_id: i64, exists: bool) -> Result<(), StoreError> {
    if exists {
        debug!(persisted_id, "listing already marked sold");
        Ok(())
    } else {
        Err(StoreError::NotFound(persisted_id))
    }
}

// Postgres has no unsigned integers; out-of-range values saturate.
fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_conversion_saturates() {
        assert_eq!(to_db(42), 42);
        assert_eq!(to_db(u64::MAX), i64::MAX);
        assert_eq!(from_db(-5), 0);
        assert_eq!(from_db(85_000), 85_000);
    }

    #[test]
    fn repeated_sold_update_is_only_an_error_for_missing_rows() {
        assert!(unchanged_sold_update(7, true).is_ok());
        assert!(matches!(unchanged_sold_update(7, false), Err(StoreError::NotFound(7))));
    }
}
