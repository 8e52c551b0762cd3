//! DynamoDB adapter and provisioning handler for the local environment.
//!
//! This crate owns the store seam, the AWS SDK integration and the
//! `provision_local_env` binary. Domain types live in `provision_core`,
//! re-exported here as [`domain`].

pub mod adapters;
pub mod handlers;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use provision_core as domain;
