//! Policy Definition

use serde::{Deserialize, Serialize};

use crate::{ActionSet, Conditions};

fn default_enabled() -> bool {
    true
}

/// A named rule: match conditions plus the actions to take on a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy name
    pub name: String,
    /// Match conditions (all must hold); required, `{}` matches everything
    pub conditions: Conditions,
    /// Actions emitted on match
    #[serde(default)]
    pub actions: ActionSet,
    /// Disabled policies never match
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Policy {
    /// Create an enabled policy
    pub fn new(name: impl Into<String>, conditions: Conditions, actions: ActionSet) -> Self {
        Self {
            name: name.into(),
            conditions,
            actions,
            enabled: true,
        }
    }

    /// Set the enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// The alert fields conditions are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFacts<'a> {
    pub source: &'a str,
    pub rule_id: &'a str,
    pub severity: i64,
}

impl<'a> AlertFacts<'a> {
    pub fn new(source: &'a str, rule_id: &'a str, severity: i64) -> Self {
        Self {
            source,
            rule_id,
            severity,
        }
    }
}
