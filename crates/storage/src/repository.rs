//! Repository Trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policy_engine::Policy;

use crate::{Alert, Device, NewDevice, StorageError};

/// Data access for devices, policies, and alerts.
///
/// Every write is atomic: on error nothing from that call is visible.
/// Implementations must be `Send + Sync + 'static` so they can sit in axum
/// state behind an `Arc<dyn Repository>`.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Check that the backing store is reachable
    async fn ping(&self) -> Result<(), StorageError>;

    // ── Devices ──────────────────────────────────────────────────────────

    /// Register a device.
    ///
    /// Returns `Err(StorageError::Conflict)` if the id is already taken; the
    /// existing record is left untouched.
    async fn insert_device(&self, device: NewDevice) -> Result<Device, StorageError>;

    /// All devices in registration order
    async fn list_devices(&self) -> Result<Vec<Device>, StorageError>;

    /// Stamp `last_seen` and, when given, replace `status`.
    ///
    /// Returns `Err(StorageError::NotFound)` for an unknown id.
    async fn record_heartbeat(
        &self,
        id: &str,
        status: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> Result<Device, StorageError>;

    // ── Policies ─────────────────────────────────────────────────────────

    /// Store a policy. Returns `Err(StorageError::Conflict)` on a duplicate name.
    async fn insert_policy(&self, policy: Policy) -> Result<Policy, StorageError>;

    /// All policies in creation order
    async fn list_policies(&self) -> Result<Vec<Policy>, StorageError>;

    /// Enabled policies in creation order
    async fn enabled_policies(&self) -> Result<Vec<Policy>, StorageError>;

    // ── Alerts ───────────────────────────────────────────────────────────

    /// Store a new alert record
    async fn insert_alert(&self, alert: Alert) -> Result<Alert, StorageError>;

    /// All alerts, newest first
    async fn list_alerts(&self) -> Result<Vec<Alert>, StorageError>;
}
