//! pr-monitor: track your pull requests across GitHub and Harness
//!
//! Pull requests from every configured provider are collected concurrently
//! and merged into one sorted list. A provider, repository or PR that fails
//! never hides the results of the others; every failure is reported
//! alongside the partial output.

pub mod aggregate;
pub mod collect;
pub mod error;
pub mod output;
pub mod platform;
pub mod store;
pub mod types;

pub use error::{Error, Result};

/// Version of this build
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
