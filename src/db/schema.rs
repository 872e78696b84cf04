//! Database schema initialization

use sqlx::SqlitePool;

/// Create the items table if it does not exist yet
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Relational projection of the `items` list.
-- No primary key: rows carry no identity and are always rewritten as a whole.
CREATE TABLE IF NOT EXISTS PWA_Offline_poc (
    FirstName TEXT,
    LastName TEXT,
    Department TEXT,
    Position TEXT,
    -- Dates as 'YYYY-MM-DD'
    HireDate TEXT NOT NULL,
    BirthDate TEXT NOT NULL,
    Gender TEXT NOT NULL,
    Email TEXT NOT NULL,
    PhoneNumber TEXT NOT NULL,
    Address TEXT NOT NULL,
    Status TEXT NOT NULL
);
"#;
