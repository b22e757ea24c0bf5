//! CLI command implementations.

pub mod capabilities;
pub mod inspect;
pub mod replay;
