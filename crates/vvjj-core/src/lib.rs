//! # vvjj-core
//!
//! Shared building blocks for the VVJJ flavor-topology selector: the error
//! type used by every library crate and the closed category enums that key
//! histograms by jet and event flavor.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{EventFlavorTopo, JetTopo};

/// Crate version, reported by `vvjj version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
