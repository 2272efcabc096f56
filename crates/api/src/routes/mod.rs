//! Route Handlers

pub mod actions;
pub mod alerts;
pub mod devices;
pub mod policies;
