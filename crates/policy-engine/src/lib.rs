//! Policy Engine
//!
//! Typed policy model plus the two pieces of decision logic in the system:
//! the condition matcher and the action evaluator.

mod action;
mod conditions;
mod evaluator;
mod matcher;
mod policy;

pub use action::{ActionDescriptor, ActionSet};
pub use conditions::Conditions;
pub use evaluator::evaluate;
pub use matcher::matches;
pub use policy::{AlertFacts, Policy};
