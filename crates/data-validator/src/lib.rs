//! Payload Validation
//!
//! Checks device, policy, alert, and command payloads before they reach the
//! store.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, Validator, SEVERITY_RANGE};
