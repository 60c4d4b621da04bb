//! Dialect-translating executor over the relational store.
//!
//! Queries are written once with `?` placeholders and the portable subset of
//! SQL shared by PostgreSQL and SQLite. The [`Dialect`] chosen at startup
//! rewrites placeholders for the active backend, and every returned row is
//! normalized into a column-name → JSON value map so callers never see
//! backend-specific row types.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Decode, Postgres, Row as _, Sqlite, Transaction, TypeInfo, ValueRef};

use crate::core::config::{AdminSeedConfig, DatabaseConfig};
use crate::core::schema;

/// A normalized result row: column name → value
pub type RowMap = serde_json::Map<String, Value>;

/// Typed query parameter. Each variant is nullable so that NULLs are bound
/// with a concrete type on backends that check parameter types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(Option<i64>),
    Real(Option<f64>),
    Text(Option<String>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(Some(v))
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

/// Durability tier the adapter bound to at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    /// Networked PostgreSQL service
    Postgres,
    /// Embedded single-file SQLite store
    SqliteFile,
    /// Transient in-memory SQLite store; data is lost on restart
    InMemory,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Postgres => "postgres",
            StorageTier::SqliteFile => "sqlite-file",
            StorageTier::InMemory => "in-memory",
        }
    }

    pub fn is_durable(&self) -> bool {
        !matches!(self, StorageTier::InMemory)
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` markers, passed through unchanged
    QuestionMark,
    /// `$1`, `$2`, ... markers
    DollarNumbered,
}

/// SQL dialect strategy, selected once when the backend is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::DollarNumbered,
            Dialect::Sqlite => PlaceholderStyle::QuestionMark,
        }
    }

    /// Rewrite `?` markers into this dialect's placeholder syntax.
    /// Markers inside single-quoted literals are left untouched.
    pub fn translate<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.placeholder_style() {
            PlaceholderStyle::QuestionMark => Cow::Borrowed(sql),
            PlaceholderStyle::DollarNumbered => {
                let mut out = String::with_capacity(sql.len() + 16);
                let mut position = 0;
                let mut in_literal = false;

                for ch in sql.chars() {
                    match ch {
                        '\'' => {
                            in_literal = !in_literal;
                            out.push(ch);
                        }
                        '?' if !in_literal => {
                            position += 1;
                            out.push('$');
                            out.push_str(&position.to_string());
                        }
                        _ => out.push(ch),
                    }
                }

                Cow::Owned(out)
            }
        }
    }
}

enum Backend {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Persistence adapter bound to one backend for the process lifetime
pub struct Database {
    backend: Backend,
    dialect: Dialect,
    tier: StorageTier,
}

macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlValue::Integer(v) => query.bind(*v),
                SqlValue::Real(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
            };
        }
        query
    }};
}

macro_rules! fetch_one_on {
    ($executor:expr, $sql:expr, $params:expr, $convert:path) => {{
        let query = bind_params!(sqlx::query($sql), $params);
        match query.fetch_optional($executor).await? {
            Some(row) => Some($convert(&row)?),
            None => None,
        }
    }};
}

macro_rules! fetch_all_on {
    ($executor:expr, $sql:expr, $params:expr, $convert:path) => {{
        let query = bind_params!(sqlx::query($sql), $params);
        query
            .fetch_all($executor)
            .await?
            .iter()
            .map($convert)
            .collect::<Result<Vec<_>, sqlx::Error>>()?
    }};
}

macro_rules! execute_on {
    ($executor:expr, $sql:expr, $params:expr) => {{
        let query = bind_params!(sqlx::query($sql), $params);
        query.execute($executor).await?.rows_affected()
    }};
}

impl Database {
    /// Bind to the first backend that accepts a connection, in priority
    /// order: networked PostgreSQL, embedded SQLite file, in-memory SQLite.
    /// The schema is created and the default admin seeded on the bound tier.
    pub async fn connect(
        config: &DatabaseConfig,
        admin_seed: &AdminSeedConfig,
    ) -> Result<Self, sqlx::Error> {
        let database = Self::connect_first_available(config).await?;
        schema::initialize(&database, admin_seed).await?;
        Ok(database)
    }

    async fn connect_first_available(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        if let Some(url) = config.postgres_url() {
            match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
                .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    tracing::info!("Storage bound to tier: {}", StorageTier::Postgres);
                    return Ok(Self::from_postgres(pool));
                }
                Err(e) => {
                    tracing::warn!("PostgreSQL unavailable, falling back to SQLite file: {}", e);
                }
            }
        }

        let file_options = SqliteConnectOptions::new()
            .filename(&config.sqlite_path)
            .create_if_missing(true)
            .foreign_keys(true);

        match SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(file_options)
            .await
        {
            Ok(pool) => {
                tracing::warn!(
                    "Storage bound to tier: {} ({}); data is local to this host",
                    StorageTier::SqliteFile,
                    config.sqlite_path
                );
                return Ok(Self::from_sqlite(pool, StorageTier::SqliteFile));
            }
            Err(e) => {
                tracing::warn!("SQLite file store unavailable, falling back to memory: {}", e);
            }
        }

        let database = Self::connect_in_memory().await?;
        tracing::warn!(
            "Storage bound to tier: {}; complaints will NOT survive a restart",
            StorageTier::InMemory
        );
        Ok(database)
    }

    /// Open a fresh in-memory store without schema.
    ///
    /// Every SQLite memory connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::from_sqlite(pool, StorageTier::InMemory))
    }

    fn from_postgres(pool: PgPool) -> Self {
        Self {
            backend: Backend::Postgres(pool),
            dialect: Dialect::Postgres,
            tier: StorageTier::Postgres,
        }
    }

    fn from_sqlite(pool: SqlitePool, tier: StorageTier) -> Self {
        Self {
            backend: Backend::Sqlite(pool),
            dialect: Dialect::Sqlite,
            tier,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn tier(&self) -> StorageTier {
        self.tier
    }

    /// Fetch at most one row
    pub async fn fetch_one(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<RowMap>, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let row = match &self.backend {
            Backend::Postgres(pool) => fetch_one_on!(pool, &sql, params, pg_row_to_map),
            Backend::Sqlite(pool) => fetch_one_on!(pool, &sql, params, sqlite_row_to_map),
        };
        Ok(row)
    }

    pub async fn fetch_all(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<RowMap>, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let rows = match &self.backend {
            Backend::Postgres(pool) => fetch_all_on!(pool, &sql, params, pg_row_to_map),
            Backend::Sqlite(pool) => fetch_all_on!(pool, &sql, params, sqlite_row_to_map),
        };
        Ok(rows)
    }

    /// Execute a statement, returning the number of affected rows
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let affected = match &self.backend {
            Backend::Postgres(pool) => execute_on!(pool, &sql, params),
            Backend::Sqlite(pool) => execute_on!(pool, &sql, params),
        };
        Ok(affected)
    }

    /// Start a transaction. Dropping the handle without [`DbTransaction::commit`]
    /// rolls it back.
    pub async fn begin(&self) -> Result<DbTransaction, sqlx::Error> {
        let inner = match &self.backend {
            Backend::Postgres(pool) => TxBackend::Postgres(pool.begin().await?),
            Backend::Sqlite(pool) => TxBackend::Sqlite(pool.begin().await?),
        };
        Ok(DbTransaction {
            inner,
            dialect: self.dialect,
        })
    }
}

enum TxBackend {
    Postgres(Transaction<'static, Postgres>),
    Sqlite(Transaction<'static, Sqlite>),
}

/// Open transaction exposing the same operations as [`Database`]
pub struct DbTransaction {
    inner: TxBackend,
    dialect: Dialect,
}

impl DbTransaction {
    pub async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<RowMap>, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let row = match &mut self.inner {
            TxBackend::Postgres(tx) => fetch_one_on!(&mut **tx, &sql, params, pg_row_to_map),
            TxBackend::Sqlite(tx) => fetch_one_on!(&mut **tx, &sql, params, sqlite_row_to_map),
        };
        Ok(row)
    }

    pub async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<RowMap>, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let rows = match &mut self.inner {
            TxBackend::Postgres(tx) => fetch_all_on!(&mut **tx, &sql, params, pg_row_to_map),
            TxBackend::Sqlite(tx) => fetch_all_on!(&mut **tx, &sql, params, sqlite_row_to_map),
        };
        Ok(rows)
    }

    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, sqlx::Error> {
        let sql = self.dialect.translate(sql);
        let affected = match &mut self.inner {
            TxBackend::Postgres(tx) => execute_on!(&mut **tx, &sql, params),
            TxBackend::Sqlite(tx) => execute_on!(&mut **tx, &sql, params),
        };
        Ok(affected)
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self.inner {
            TxBackend::Postgres(tx) => tx.commit().await,
            TxBackend::Sqlite(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self.inner {
            TxBackend::Postgres(tx) => tx.rollback().await,
            TxBackend::Sqlite(tx) => tx.rollback().await,
        }
    }
}

fn decode_failure(column: &str, type_name: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unsupported column type {}", type_name).into(),
    }
}

fn pg_row_to_map(row: &PgRow) -> Result<RowMap, sqlx::Error> {
    let mut map = RowMap::new();

    for column in row.columns() {
        let name = column.name();
        let raw = row.try_get_raw(column.ordinal())?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            let decoded = match type_name.as_str() {
                "INT8" => <i64 as Decode<Postgres>>::decode(raw).map(Value::from),
                "INT4" => <i32 as Decode<Postgres>>::decode(raw).map(Value::from),
                "INT2" => <i16 as Decode<Postgres>>::decode(raw).map(Value::from),
                "FLOAT8" => <f64 as Decode<Postgres>>::decode(raw).map(Value::from),
                "FLOAT4" => <f32 as Decode<Postgres>>::decode(raw).map(Value::from),
                "BOOL" => <bool as Decode<Postgres>>::decode(raw).map(Value::from),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                    <String as Decode<Postgres>>::decode(raw).map(Value::from)
                }
                "TIMESTAMP" => <chrono::NaiveDateTime as Decode<Postgres>>::decode(raw)
                    .map(|ts| Value::from(ts.format("%Y-%m-%d %H:%M:%S").to_string())),
                "TIMESTAMPTZ" => {
                    <chrono::DateTime<chrono::Utc> as Decode<Postgres>>::decode(raw)
                        .map(|ts| Value::from(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                }
                other => return Err(decode_failure(name, other)),
            };

            decoded.map_err(|source| sqlx::Error::ColumnDecode {
                index: name.to_string(),
                source,
            })?
        };

        map.insert(name.to_string(), value);
    }

    Ok(map)
}

fn sqlite_row_to_map(row: &SqliteRow) -> Result<RowMap, sqlx::Error> {
    let mut map = RowMap::new();

    for column in row.columns() {
        let name = column.name();
        let raw = row.try_get_raw(column.ordinal())?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            // SQLite reports the storage class of the value itself
            let type_name = raw.type_info().name().to_string();
            let decoded = match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => <i64 as Decode<Sqlite>>::decode(raw).map(Value::from),
                "REAL" | "NUMERIC" => <f64 as Decode<Sqlite>>::decode(raw).map(Value::from),
                "TEXT" | "DATETIME" | "DATE" | "TIME" => {
                    <String as Decode<Sqlite>>::decode(raw).map(Value::from)
                }
                "BLOB" => <Vec<u8> as Decode<Sqlite>>::decode(raw)
                    .map(|bytes| Value::from(hex::encode(bytes))),
                other => return Err(decode_failure(name, other)),
            };

            decoded.map_err(|source| sqlx::Error::ColumnDecode {
                index: name.to_string(),
                source,
            })?
        };

        map.insert(name.to_string(), value);
    }

    Ok(map)
}
