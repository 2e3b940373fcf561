use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::conversion::{Conversion, NewConversion, TargetFormat};
use crate::infra::db::Db;

/// Persistence for conversion records.
#[async_trait]
pub trait ConversionStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Inserts a record; the store assigns `id` and `created_at`.
    async fn insert(&self, new: NewConversion) -> Result<Conversion>;

    /// Most recently created records first, at most `limit` of them.
    async fn recent(&self, limit: i64) -> Result<Vec<Conversion>>;

    async fn find(&self, id: Uuid) -> Result<Option<Conversion>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgConversionStore {
    db: Db,
}

impl PgConversionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversionStore for PgConversionStore {
    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }

    async fn insert(&self, new: NewConversion) -> Result<Conversion> {
        let row = sqlx::query(
            "INSERT INTO conversions (original_name, converted_name, format, size) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, original_name, converted_name, format, size, created_at",
        )
        .bind(&new.original_name)
        .bind(&new.converted_name)
        .bind(new.format.as_str())
        .bind(new.size)
        .fetch_one(self.db.pool())
        .await?;

        conversion_from_row(&row)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Conversion>> {
        let rows = sqlx::query(
            "SELECT id, original_name, converted_name, format, size, created_at \
             FROM conversions \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(conversion_from_row).collect()
    }

    async fn find(&self, id: Uuid) -> Result<Option<Conversion>> {
        let row = sqlx::query(
            "SELECT id, original_name, converted_name, format, size, created_at \
             FROM conversions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(conversion_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversions WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn conversion_from_row(row: &PgRow) -> Result<Conversion> {
    let format: String = row.get("format");
    let format = TargetFormat::parse(&format)
        .ok_or_else(|| anyhow!("unexpected stored format: {}", format))?;

    Ok(Conversion {
        id: row.get("id"),
        original_name: row.get("original_name"),
        converted_name: row.get("converted_name"),
        format,
        size: row.get("size"),
        created_at: row.get("created_at"),
    })
}
