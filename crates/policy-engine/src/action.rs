//! Action Descriptors and Policy Action Sets

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key naming the action kind (e.g. `notify`, `isolate`)
const TYPE_KEY: &str = "type";
/// Key naming the policy an action came from
const POLICY_KEY: &str = "policy";

/// Open key/value record describing an automated response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionDescriptor(Map<String, Value>);

impl ActionDescriptor {
    /// Wrap a raw mapping
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Action with only a `type` field
    pub fn of_type(kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_KEY.to_string(), Value::String(kind.into()));
        Self(fields)
    }

    /// Add or replace a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The `type` field, when it is a string
    pub fn kind(&self) -> Option<&str> {
        self.0.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// The `policy` field, when it is a string
    pub fn policy(&self) -> Option<&str> {
        self.0.get(POLICY_KEY).and_then(Value::as_str)
    }

    /// Set `policy` unless the action already carries one.
    pub fn tag_policy(&mut self, policy_name: &str) {
        self.0
            .entry(POLICY_KEY)
            .or_insert_with(|| Value::String(policy_name.to_string()));
    }

}

impl From<Map<String, Value>> for ActionDescriptor {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Actions attached to a policy, as submitted.
///
/// The stored shape is kept so that listing a policy returns what was created;
/// [`ActionSet::normalized`] gives the evaluator's view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSet {
    /// `null` or absent
    #[default]
    Empty,
    /// A single mapping, treated as one action
    Single(ActionDescriptor),
    /// A sequence; non-mapping entries are ignored
    Many(Vec<Value>),
}

impl ActionSet {
    /// Independent actions in declaration order
    pub fn normalized(&self) -> Vec<ActionDescriptor> {
        match self {
            ActionSet::Empty => Vec::new(),
            ActionSet::Single(action) => vec![action.clone()],
            ActionSet::Many(entries) => entries
                .iter()
                .filter_map(|entry| entry.as_object().cloned().map(ActionDescriptor::new))
                .collect(),
        }
    }

    /// Number of actions the evaluator would emit for this set
    pub fn len(&self) -> usize {
        match self {
            ActionSet::Empty => 0,
            ActionSet::Single(_) => 1,
            ActionSet::Many(entries) => entries.iter().filter(|e| e.is_object()).count(),
        }
    }

    /// True when no actions would be emitted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
