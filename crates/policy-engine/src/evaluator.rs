//! Policy Evaluator

use tracing::{debug, info};

use crate::{matches, ActionDescriptor, AlertFacts, Policy};

/// Evaluate an alert against a set of policies.
///
/// Returns the actions of every enabled, matching policy, concatenated in
/// iteration order. Each action is tagged with its policy's name unless it
/// already names one. Actions are not deduplicated.
pub fn evaluate<'p, I>(alert: &AlertFacts<'_>, policies: I) -> Vec<ActionDescriptor>
where
    I: IntoIterator<Item = &'p Policy>,
{
    let mut actions = Vec::new();
    let mut matched = 0usize;

    for policy in policies {
        if !policy.enabled || !matches(alert, &policy.conditions) {
            continue;
        }

        matched += 1;
        let before = actions.len();
        actions.extend(policy.actions.normalized().into_iter().map(|mut action| {
            action.tag_policy(&policy.name);
            action
        }));
        debug!(
            "Policy '{}' matched rule {} from {} ({} actions)",
            policy.name,
            alert.rule_id,
            alert.source,
            actions.len() - before
        );
    }

    info!(
        "Evaluated alert {}/{} (severity {}): {} policies matched, {} actions",
        alert.source,
        alert.rule_id,
        alert.severity,
        matched,
        actions.len()
    );

    actions
}
