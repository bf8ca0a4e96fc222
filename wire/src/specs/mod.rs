//! Shared wire-level specifications for every service in the system.

pub mod queue;
pub mod registry;
pub mod serving;
