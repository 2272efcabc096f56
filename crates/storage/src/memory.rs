//! In-Memory Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policy_engine::Policy;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{Alert, Device, NewDevice, Repository, StorageError};

/// Repository kept entirely in process memory.
///
/// Records are held in insertion order; nothing survives a restart.
pub struct MemoryRepository {
    devices: Mutex<Vec<Device>>,
    policies: Mutex<Vec<Policy>>,
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryRepository {
    /// Create an empty in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            devices: Mutex::new(Vec::new()),
            policies: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::with_capacity(1000)),
        }
    }

    /// Get total alert count
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut devices) = self.devices.lock() {
            devices.clear();
        }
        if let Ok(mut policies) = self.policies.lock() {
            policies.clear();
        }
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.clear();
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), StorageError> {
        lock(&self.devices).map(|_| ())
    }

    async fn insert_device(&self, device: NewDevice) -> Result<Device, StorageError> {
        let mut devices = lock(&self.devices)?;

        if devices.iter().any(|d| d.id == device.id) {
            return Err(StorageError::Conflict(format!(
                "device '{}' already exists",
                device.id
            )));
        }

        let device = Device::from(device);
        devices.push(device.clone());
        debug!("Inserted device {}", device.id);
        Ok(device)
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StorageError> {
        Ok(lock(&self.devices)?.clone())
    }

    async fn record_heartbeat(
        &self,
        id: &str,
        status: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> Result<Device, StorageError> {
        let mut devices = lock(&self.devices)?;

        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("device '{}'", id)))?;

        if status.is_some() {
            device.status = status;
        }
        device.last_seen = Some(seen_at);

        Ok(device.clone())
    }

    async fn insert_policy(&self, policy: Policy) -> Result<Policy, StorageError> {
        let mut policies = lock(&self.policies)?;

        if policies.iter().any(|p| p.name == policy.name) {
            return Err(StorageError::Conflict(format!(
                "policy '{}' already exists",
                policy.name
            )));
        }

        policies.push(policy.clone());
        debug!("Inserted policy {}", policy.name);
        Ok(policy)
    }

    async fn list_policies(&self) -> Result<Vec<Policy>, StorageError> {
        Ok(lock(&self.policies)?.clone())
    }

    async fn enabled_policies(&self) -> Result<Vec<Policy>, StorageError> {
        Ok(lock(&self.policies)?
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: Alert) -> Result<Alert, StorageError> {
        let mut alerts = lock(&self.alerts)?;

        if alerts.iter().any(|a| a.id == alert.id) {
            return Err(StorageError::Conflict(format!("alert {} already exists", alert.id)));
        }

        alerts.push(alert.clone());
        debug!("Inserted alert {}", alert.id);
        Ok(alert)
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, StorageError> {
        let alerts = lock(&self.alerts)?;

        // Insertion order breaks created_at ties, newest first.
        let mut newest_first: Vec<Alert> = alerts.iter().rev().cloned().collect();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(newest_first)
    }
}
