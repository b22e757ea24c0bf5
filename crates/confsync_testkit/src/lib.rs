//! # confsync Testkit
//!
//! Test utilities for confsync.
//!
//! This crate provides:
//! - Manifest and response builders that compute lengths and digests
//! - A scripted agent usable as a `Transport` or as an `HttpClient`
//! - A recording receiver
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use confsync_testkit::prelude::*;
//!
//! #[test]
//! fn applies_one_config() {
//!     let agent = Arc::new(ScriptedAgent::new());
//!     agent.publish(ResponseBuilder::new(1).config(RULES_PATH, b"{}").build());
//!     // ... run a client against the agent
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use agent::*;
pub use fixtures::*;
pub use generators::*;
