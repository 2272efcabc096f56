//! Persisted Records

use chrono::{DateTime, SubsecRound, Utc};
use policy_engine::{ActionDescriptor, AlertFacts};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Current time at the precision the stores keep (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Registered device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub cert: Option<String>,
    pub status: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Device registration payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewDevice {
    pub id: String,
    #[serde(default)]
    pub cert: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewDevice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cert: None,
            status: None,
        }
    }
}

impl From<NewDevice> for Device {
    fn from(new: NewDevice) -> Self {
        Self {
            id: new.id,
            cert: new.cert,
            status: new.status,
            last_seen: None,
        }
    }
}

/// Outcome of policy evaluation for a processed alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub actions: Vec<ActionDescriptor>,
}

/// Alert ingestion payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAlert {
    pub source: String,
    pub rule_id: String,
    pub severity: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl NewAlert {
    pub fn new(source: impl Into<String>, rule_id: impl Into<String>, severity: i64) -> Self {
        Self {
            source: source.into(),
            rule_id: rule_id.into(),
            severity,
            data: Map::new(),
        }
    }

    /// Fields the policy matcher looks at
    pub fn facts(&self) -> AlertFacts<'_> {
        AlertFacts::new(&self.source, &self.rule_id, self.severity)
    }
}

/// Stored alert. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub source: String,
    pub rule_id: String,
    pub severity: i64,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub decision: Option<Decision>,
}

impl Alert {
    /// A freshly received alert: unprocessed, no decision
    pub fn received(new: NewAlert) -> Self {
        Self::build(new, None)
    }

    /// A processed alert carrying the evaluator's actions
    pub fn processed(new: NewAlert, actions: Vec<ActionDescriptor>) -> Self {
        Self::build(new, Some(Decision { actions }))
    }

    fn build(new: NewAlert, decision: Option<Decision>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: new.source,
            rule_id: new.rule_id,
            severity: new.severity,
            data: new.data,
            created_at: now(),
            processed: decision.is_some(),
            decision,
        }
    }
}
