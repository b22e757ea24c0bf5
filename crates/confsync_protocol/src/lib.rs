//! # confsync Protocol
//!
//! Remote configuration protocol types and parsers.
//!
//! This crate provides:
//! - `Path` for configuration entry identifiers
//! - `Target` / `TargetMap` for signed manifest metadata
//! - `Content` / `ContentList` for raw configuration payloads
//! - Request and response messages exchanged with the agent
//!
//! This is a pure protocol crate with no I/O operations. Signature
//! verification of the manifest is not performed here.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod content;
mod error;
mod messages;
mod path;
mod target;

pub use content::{ApplyState, Content, ContentList};
pub use error::{ParseError, ParseResult};
pub use messages::{
    CachedHash, CachedTargetFile, ClientInfo, ClientState, ClientTracer, ConfigRequest,
    ConfigResponse, ConfigState, TargetFile,
};
pub use path::{Path, PathSource};
pub use target::{Target, TargetMap};

/// Hash algorithm computed for every parsed content.
pub const SHA256: &str = "sha256";
