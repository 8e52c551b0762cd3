//! Shared provisioning domain primitives.
//!
//! This crate owns the fixed table descriptor, the seeded user record and the
//! store connection settings. It intentionally excludes AWS SDK concerns.

pub mod config;
pub mod record;
pub mod table;
