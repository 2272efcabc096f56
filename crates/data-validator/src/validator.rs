//! Payload Validator

use crate::error::ValidationError;
use policy_engine::Policy;
use serde::{Deserialize, Serialize};
use storage::{NewAlert, NewDevice};
use tracing::debug;

/// Alert severity valid range (inclusive). Matches the store's CHECK constraint.
pub const SEVERITY_RANGE: (i64, i64) = (0, 10);

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Longest accepted identifier (device id, policy name, drone id)
    pub max_identifier_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_identifier_len: 256,
        }
    }
}

/// Validator for inbound payloads
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: i64,
        range: (i64, i64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate alert severity
    pub fn validate_severity(&self, severity: i64) -> Result<(), ValidationError> {
        self.validate_range("severity", severity, SEVERITY_RANGE)
    }

    /// Validate a required text field: not blank
    pub fn validate_required(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::MissingField(field))
        } else {
            Ok(())
        }
    }

    /// Validate an identifier: not blank, bounded length, no control characters
    pub fn validate_identifier(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        self.validate_required(field, value)?;

        if value.chars().count() > self.config.max_identifier_len {
            return Err(ValidationError::InvalidFormat(format!(
                "{} exceeds {} characters",
                field, self.config.max_identifier_len
            )));
        }

        if value.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFormat(format!(
                "{} contains control characters",
                field
            )));
        }

        Ok(())
    }

    /// Validate a device registration
    pub fn validate_device(&self, device: &NewDevice) -> Result<(), ValidationError> {
        self.validate_identifier("id", &device.id)
    }

    /// Validate a policy definition
    pub fn validate_policy(&self, policy: &Policy) -> Result<(), ValidationError> {
        self.validate_identifier("name", &policy.name)?;

        let unknown: Vec<&str> = policy.conditions.unknown_keys().collect();
        if !unknown.is_empty() {
            debug!(
                "Policy '{}' carries unrecognized condition keys {:?}; they will not affect matching",
                policy.name, unknown
            );
        }

        Ok(())
    }

    /// Validate an alert
    pub fn validate_alert(&self, alert: &NewAlert) -> Result<(), ValidationError> {
        self.validate_required("source", &alert.source)?;
        self.validate_required("rule_id", &alert.rule_id)?;
        self.validate_severity(alert.severity)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
