use eyre::{Result, WrapErr};
use sqlx::{Executor, Pool, Postgres};
use tracing::info;

const TABLES: &[(&str, &str)] = &[
    (
        "providers",
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id VARCHAR(64) PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            specialization VARCHAR(255) NOT NULL,
            work_start TIME NOT NULL,
            work_end TIME NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_working_hours CHECK (work_end > work_start)
        );
        "#,
    ),
    (
        "provider_consultation_types",
        r#"
        CREATE TABLE IF NOT EXISTS provider_consultation_types (
            provider_id VARCHAR(64) NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
            kind VARCHAR(16) NOT NULL,
            fee BIGINT NOT NULL CHECK (fee >= 0),
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            PRIMARY KEY (provider_id, kind)
        );
        "#,
    ),
    (
        "accounts",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id VARCHAR(64) PRIMARY KEY,
            email VARCHAR(255) NOT NULL UNIQUE,
            role VARCHAR(16) NOT NULL,
            display_name VARCHAR(255) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token VARCHAR(128) PRIMARY KEY,
            account_id VARCHAR(64) NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    ),
    (
        "appointments",
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id VARCHAR(64) PRIMARY KEY,
            patient_id VARCHAR(64) NOT NULL,
            provider_id VARCHAR(64) NOT NULL REFERENCES providers(id),
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            consultation_type VARCHAR(16) NOT NULL,
            reason TEXT NOT NULL,
            symptoms TEXT[] NOT NULL DEFAULT '{}',
            status VARCHAR(16) NOT NULL,
            payment_amount BIGINT NOT NULL,
            payment_status VARCHAR(16) NOT NULL,
            notes TEXT NULL,
            provider_notes TEXT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL
        );
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_appointments_provider_date ON appointments(provider_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_account_id ON sessions(account_id)",
];

/// Creates every table and index if missing. Safe to run on each start.
pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    for (table, ddl) in TABLES {
        pool.execute(*ddl)
            .await
            .wrap_err_with(|| format!("Failed to create table {}", table))?;
    }

    for ddl in INDEXES {
        pool.execute(*ddl).await.wrap_err("Failed to create index")?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
