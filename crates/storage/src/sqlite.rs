//! SQLite Repository

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use policy_engine::{ActionSet, Conditions, Policy};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{Alert, Decision, Device, NewDevice, Repository, StorageError};

/// Schema, applied idempotently on connect.
///
/// `seq` columns record insertion order; devices use the implicit rowid.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        id        TEXT PRIMARY KEY NOT NULL,
        cert      TEXT,
        status    TEXT,
        last_seen TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS policies (
        seq        INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL UNIQUE,
        conditions TEXT NOT NULL,
        actions    TEXT NOT NULL,
        enabled    INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        seq        INTEGER PRIMARY KEY AUTOINCREMENT,
        id         TEXT NOT NULL UNIQUE,
        source     TEXT NOT NULL,
        rule_id    TEXT NOT NULL,
        severity   INTEGER NOT NULL CHECK (severity BETWEEN 0 AND 10),
        data       TEXT NOT NULL,
        created_at TEXT NOT NULL,
        processed  INTEGER NOT NULL DEFAULT 0,
        decision   TEXT,
        CHECK ((processed = 0 AND decision IS NULL) OR (processed = 1 AND decision IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts (created_at DESC, seq DESC)",
];

/// Repository backed by a SQLite connection pool
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `url` (e.g. `sqlite://secops.db?mode=rwc`, `sqlite::memory:`)
    /// and apply the schema.
    ///
    /// In-memory databases are pinned to a single long-lived connection,
    /// since every SQLite connection gets its own private in-memory database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::DatabaseError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            error!("Failed to open database {}: {}", url, e);
            db_err(e)
        })?;

        let repo = Self { pool };
        repo.migrate().await?;
        info!("Opened SQLite repository at {}", url);
        Ok(repo)
    }

    /// Apply the schema
    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        debug!("Schema applied ({} statements)", SCHEMA.len());
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::DatabaseError(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::SerializationError(e.to_string()))
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("Bad timestamp '{}': {}", raw, e)))
}

fn device_from_row(row: &SqliteRow) -> Result<Device, StorageError> {
    let last_seen: Option<String> = row.try_get("last_seen").map_err(db_err)?;
    Ok(Device {
        id: row.try_get("id").map_err(db_err)?,
        cert: row.try_get("cert").map_err(db_err)?,
        status: row.try_get("status").map_err(db_err)?,
        last_seen: last_seen.as_deref().map(parse_ts).transpose()?,
    })
}

fn policy_from_row(row: &SqliteRow) -> Result<Policy, StorageError> {
    let conditions: String = row.try_get("conditions").map_err(db_err)?;
    let actions: String = row.try_get("actions").map_err(db_err)?;
    Ok(Policy {
        name: row.try_get("name").map_err(db_err)?,
        conditions: from_json::<Conditions>(&conditions)?,
        actions: from_json::<ActionSet>(&actions)?,
        enabled: row.try_get("enabled").map_err(db_err)?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<Alert, StorageError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let data: String = row.try_get("data").map_err(db_err)?;
    let created_at: String = row.try_get("created_at").map_err(db_err)?;
    let decision: Option<String> = row.try_get("decision").map_err(db_err)?;

    Ok(Alert {
        id: Uuid::parse_str(&id)
            .map_err(|e| StorageError::SerializationError(format!("Bad alert id '{}': {}", id, e)))?,
        source: row.try_get("source").map_err(db_err)?,
        rule_id: row.try_get("rule_id").map_err(db_err)?,
        severity: row.try_get("severity").map_err(db_err)?,
        data: from_json(&data)?,
        created_at: parse_ts(&created_at)?,
        processed: row.try_get("processed").map_err(db_err)?,
        decision: decision.as_deref().map(from_json::<Decision>).transpose()?,
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_err)
    }

    async fn insert_device(&self, device: NewDevice) -> Result<Device, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO devices (id, cert, status, last_seen) VALUES (?, ?, ?, NULL)")
            .bind(&device.id)
            .bind(&device.cert)
            .bind(&device.status)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::Conflict(format!("device '{}' already exists", device.id))
                } else {
                    db_err(e)
                }
            })?;

        tx.commit().await.map_err(db_err)?;
        debug!("Inserted device {}", device.id);
        Ok(Device::from(device))
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StorageError> {
        let rows = sqlx::query("SELECT id, cert, status, last_seen FROM devices ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(device_from_row).collect()
    }

    async fn record_heartbeat(
        &self,
        id: &str,
        status: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> Result<Device, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let seen_at = format_ts(&seen_at);

        let result = match &status {
            Some(status) => sqlx::query("UPDATE devices SET status = ?, last_seen = ? WHERE id = ?")
                .bind(status)
                .bind(&seen_at)
                .bind(id),
            None => sqlx::query("UPDATE devices SET last_seen = ? WHERE id = ?")
                .bind(&seen_at)
                .bind(id),
        }
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("device '{}'", id)));
        }

        let row = sqlx::query("SELECT id, cert, status, last_seen FROM devices WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let device = device_from_row(&row)?;

        tx.commit().await.map_err(db_err)?;
        Ok(device)
    }

    async fn insert_policy(&self, policy: Policy) -> Result<Policy, StorageError> {
        let conditions = to_json(&policy.conditions)?;
        let actions = to_json(&policy.actions)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO policies (name, conditions, actions, enabled) VALUES (?, ?, ?, ?)")
            .bind(&policy.name)
            .bind(conditions)
            .bind(actions)
            .bind(policy.enabled)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::Conflict(format!("policy '{}' already exists", policy.name))
                } else {
                    db_err(e)
                }
            })?;

        tx.commit().await.map_err(db_err)?;
        debug!("Inserted policy {}", policy.name);
        Ok(policy)
    }

    async fn list_policies(&self) -> Result<Vec<Policy>, StorageError> {
        let rows = sqlx::query("SELECT name, conditions, actions, enabled FROM policies ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(policy_from_row).collect()
    }

    async fn enabled_policies(&self) -> Result<Vec<Policy>, StorageError> {
        let rows = sqlx::query(
            "SELECT name, conditions, actions, enabled FROM policies WHERE enabled = 1 ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(policy_from_row).collect()
    }

    async fn insert_alert(&self, alert: Alert) -> Result<Alert, StorageError> {
        let data = to_json(&alert.data)?;
        let decision = alert.decision.as_ref().map(to_json).transpose()?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO alerts (id, source, rule_id, severity, data, created_at, processed, decision)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(&alert.source)
        .bind(&alert.rule_id)
        .bind(alert.severity)
        .bind(data)
        .bind(format_ts(&alert.created_at))
        .bind(alert.processed)
        .bind(decision)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict(format!("alert {} already exists", alert.id))
            } else {
                db_err(e)
            }
        })?;

        tx.commit().await.map_err(db_err)?;
        debug!("Inserted alert {} (processed: {})", alert.id, alert.processed);
        Ok(alert)
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, rule_id, severity, data, created_at, processed, decision
            FROM alerts
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(alert_from_row).collect()
    }
}
