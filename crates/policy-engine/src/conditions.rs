//! Policy Condition Set

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conjunctive match conditions of a policy.
///
/// Recognized keys are typed; anything else lands in `extra` so it survives
/// a store round trip, but it never takes part in matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Minimum severity (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_gte: Option<i64>,
    /// Maximum severity (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_lte: Option<i64>,
    /// Allowed alert sources; empty means unconstrained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_in: Option<Vec<String>>,
    /// Allowed rule identifiers; empty means unconstrained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id_in: Option<Vec<String>>,
    /// Unrecognized keys, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conditions {
    /// Conditions that match every alert
    pub fn any() -> Self {
        Self::default()
    }

    /// Require `severity >= min`
    pub fn with_severity_gte(mut self, min: i64) -> Self {
        self.severity_gte = Some(min);
        self
    }

    /// Require `severity <= max`
    pub fn with_severity_lte(mut self, max: i64) -> Self {
        self.severity_lte = Some(max);
        self
    }

    /// Restrict to the given sources
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_in = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to the given rule identifiers
    pub fn with_rule_ids<I, S>(mut self, rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_id_in = Some(rule_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Names of the unrecognized keys carried in this set
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }
}
