//! Common library for the threadsafe object workspace.
//!
//! This crate provides shared constants and configuration loading utilities
//! for all workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! tso = { package = "tso_common", path = "../tso_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use tso_common::config::{ConfigLoader, SharedConfig};
//! use tso_common::consts::MAX_FIELDS;
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
