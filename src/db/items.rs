//! Items table adapter
//!
//! Reads and rewrites the relational projection of the `items` list.
//!
//! The table is a lossy view of the document: CRDT identity and merge
//! history never reach it. Rebuilding a document from these rows starts a
//! fresh history. Writes are a full-table replace rather than an upsert,
//! because records have no durable id to match rows against. Adding a stable
//! id field to `ItemRecord` would allow switching to id-keyed upserts.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::document::{parse_date, ItemRecord};
use crate::error::{AppError, Result};

/// BirthDate written when the record has none
pub const DEFAULT_BIRTH_DATE: &str = "1990-01-01";
/// Gender written when the record has none
pub const DEFAULT_GENDER: &str = "M";
pub const DEFAULT_EMAIL: &str = "";
pub const DEFAULT_PHONE_NUMBER: &str = "";
pub const DEFAULT_ADDRESS: &str = "";
/// Status written when the record has none
pub const DEFAULT_STATUS: &str = "Active";

/// Storage for the flat projection of `items`
#[async_trait]
pub trait ItemTable: Send + Sync {
    /// Read every row, in insertion order
    async fn read_all(&self) -> Result<Vec<ItemRecord>>;

    /// Replace the whole table with `items`
    ///
    /// Either every row is replaced or none is.
    async fn rewrite_all(&self, items: &[ItemRecord]) -> Result<()>;
}

/// `ItemTable` backed by a SQLite pool
#[derive(Clone)]
pub struct SqlItemTable {
    pool: SqlitePool,
}

impl SqlItemTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemTable for SqlItemTable {
    async fn read_all(&self) -> Result<Vec<ItemRecord>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT FirstName, LastName, Department, Position, HireDate, BirthDate,
                   Gender, Email, PhoneNumber, Address, Status
            FROM PWA_Offline_poc
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::StorageUnavailable)?;

        Ok(rows.into_iter().map(ItemRow::into_record).collect())
    }

    async fn rewrite_all(&self, items: &[ItemRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(AppError::StorageUnavailable)?;

        sqlx::query("DELETE FROM PWA_Offline_poc")
            .execute(&mut *tx)
            .await
            .map_err(AppError::StorageWrite)?;

        let today = Utc::now().date_naive();
        for item in items {
            let row = ItemRow::with_defaults(item, today);
            sqlx::query(
                r#"
                INSERT INTO PWA_Offline_poc (
                    FirstName, LastName, Department, Position, HireDate, BirthDate,
                    Gender, Email, PhoneNumber, Address, Status
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.first_name)
            .bind(row.last_name)
            .bind(row.department)
            .bind(row.position)
            .bind(row.hire_date)
            .bind(row.birth_date)
            .bind(row.gender)
            .bind(row.email)
            .bind(row.phone_number)
            .bind(row.address)
            .bind(row.status)
            .execute(&mut *tx)
            .await
            .map_err(AppError::StorageWrite)?;
        }

        // Dropping `tx` on any error above rolls the delete back
        tx.commit().await.map_err(AppError::StorageWrite)?;

        tracing::debug!("Rewrote items table with {} rows", items.len());
        Ok(())
    }
}

/// One physical row
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct ItemRow {
    first_name: Option<String>,
    last_name: Option<String>,
    department: Option<String>,
    position: Option<String>,
    hire_date: Option<String>,
    birth_date: Option<String>,
    gender: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    status: Option<String>,
}

impl ItemRow {
    /// Row for `record`, with absent required fields filled from the defaults
    fn with_defaults(record: &ItemRecord, today: NaiveDate) -> Self {
        let or_default = |value: &Option<String>, default: &str| {
            Some(value.clone().unwrap_or_else(|| default.to_string()))
        };

        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            department: record.department.clone(),
            position: record.position.clone(),
            hire_date: Some(record.hire_date.unwrap_or(today).to_string()),
            birth_date: Some(
                record
                    .birth_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| DEFAULT_BIRTH_DATE.to_string()),
            ),
            gender: or_default(&record.gender, DEFAULT_GENDER),
            email: or_default(&record.email, DEFAULT_EMAIL),
            phone_number: or_default(&record.phone_number, DEFAULT_PHONE_NUMBER),
            address: or_default(&record.address, DEFAULT_ADDRESS),
            status: or_default(&record.status, DEFAULT_STATUS),
        }
    }

    fn into_record(self) -> ItemRecord {
        ItemRecord {
            first_name: self.first_name,
            last_name: self.last_name,
            department: self.department,
            position: self.position,
            hire_date: self.hire_date.as_deref().and_then(parse_date),
            birth_date: self.birth_date.as_deref().and_then(parse_date),
            gender: self.gender,
            email: self.email,
            phone_number: self.phone_number,
            address: self.address,
            status: self.status,
        }
    }
}
