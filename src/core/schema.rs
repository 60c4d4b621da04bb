use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::config::AdminSeedConfig;
use crate::core::database::{Database, Dialect};

const SQLITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS complaints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ghmc_id TEXT NOT NULL UNIQUE,
        user_id INTEGER,
        category TEXT NOT NULL DEFAULT 'Other',
        priority TEXT NOT NULL DEFAULT 'Medium',
        subject TEXT NOT NULL,
        description TEXT NOT NULL,
        location TEXT NOT NULL,
        zone TEXT NOT NULL DEFAULT 'Unknown',
        gps_lat REAL,
        gps_lng REAL,
        status TEXT NOT NULL DEFAULT 'Submitted',
        submitted_by TEXT NOT NULL DEFAULT 'Citizen',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        CHECK ((gps_lat IS NULL) = (gps_lng IS NULL))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        phone TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS admins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS status_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        complaint_id INTEGER NOT NULL,
        old_status TEXT,
        new_status TEXT NOT NULL,
        changed_by TEXT NOT NULL,
        comments TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_complaints_user_id ON complaints (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_status_history_complaint_id ON status_history (complaint_id)",
];

const POSTGRES_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS complaints (
        id BIGSERIAL PRIMARY KEY,
        ghmc_id TEXT NOT NULL UNIQUE,
        user_id BIGINT,
        category TEXT NOT NULL DEFAULT 'Other',
        priority TEXT NOT NULL DEFAULT 'Medium',
        subject TEXT NOT NULL,
        description TEXT NOT NULL,
        location TEXT NOT NULL,
        zone TEXT NOT NULL DEFAULT 'Unknown',
        gps_lat DOUBLE PRECISION,
        gps_lng DOUBLE PRECISION,
        status TEXT NOT NULL DEFAULT 'Submitted',
        submitted_by TEXT NOT NULL DEFAULT 'Citizen',
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        CHECK ((gps_lat IS NULL) = (gps_lng IS NULL))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        phone TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS admins (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS status_history (
        id BIGSERIAL PRIMARY KEY,
        complaint_id BIGINT NOT NULL,
        old_status TEXT,
        new_status TEXT NOT NULL,
        changed_by TEXT NOT NULL,
        comments TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_complaints_user_id ON complaints (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_status_history_complaint_id ON status_history (complaint_id)",
];

impl Dialect {
    /// Idempotent DDL for this dialect, in creation order
    pub fn schema_statements(&self) -> &'static [&'static str] {
        match self {
            Dialect::Postgres => POSTGRES_SCHEMA,
            Dialect::Sqlite => SQLITE_SCHEMA,
        }
    }
}

/// Create the schema if missing and seed the default admin when the
/// `admins` table is empty. Safe to run on every start.
pub async fn initialize(db: &Database, admin_seed: &AdminSeedConfig) -> Result<(), sqlx::Error> {
    for statement in db.dialect().schema_statements() {
        db.execute(statement, &[]).await?;
    }

    let admin_count = db
        .fetch_one("SELECT COUNT(*) AS count FROM admins", &[])
        .await?
        .and_then(|row| row.get("count").and_then(|v| v.as_i64()))
        .unwrap_or(0);

    if admin_count == 0 {
        let salt = Uuid::new_v4().simple().to_string();
        db.execute(
            "INSERT INTO admins (username, password_hash, name) VALUES (?, ?, ?)",
            &[
                admin_seed.username.as_str().into(),
                hash_password(&admin_seed.password, &salt).into(),
                admin_seed.name.as_str().into(),
            ],
        )
        .await?;
        tracing::info!("Seeded default admin account '{}'", admin_seed.username);
    }

    tracing::info!("Schema ready on tier {}", db.tier());
    Ok(())
}

/// `<salt>:<sha256-hex(password + salt)>`
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{}:{}", salt, hex::encode(hasher.finalize()))
}
