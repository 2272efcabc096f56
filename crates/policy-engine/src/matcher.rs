//! Policy Condition Matcher

use crate::{AlertFacts, Conditions};

/// Check whether an alert satisfies every condition present in the set.
///
/// Absent conditions always hold. An empty `source_in` / `rule_id_in` list
/// is treated the same as an absent one. Unknown keys are ignored.
pub fn matches(alert: &AlertFacts<'_>, conditions: &Conditions) -> bool {
    if let Some(min) = conditions.severity_gte {
        if alert.severity < min {
            return false;
        }
    }

    if let Some(max) = conditions.severity_lte {
        if alert.severity > max {
            return false;
        }
    }

    if !member_or_unconstrained(alert.source, conditions.source_in.as_deref()) {
        return false;
    }

    member_or_unconstrained(alert.rule_id, conditions.rule_id_in.as_deref())
}

fn member_or_unconstrained(value: &str, allowed: Option<&[String]>) -> bool {
    match allowed {
        Some(set) if !set.is_empty() => set.iter().any(|v| v == value),
        _ => true,
    }
}
