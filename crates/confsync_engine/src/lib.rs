//! # confsync Engine
//!
//! Remote configuration client and background worker.
//!
//! This crate provides:
//! - Capability registration and the agent capability token
//! - Product-routed dispatch of changes to receivers
//! - Transport abstraction (mock and HTTP-framed)
//! - `Client`: one request/reconcile/dispatch round-trip
//! - `Component`: background polling worker with barrier and trigger gates
//!
//! ## Architecture
//!
//! Each cycle follows a **fetch-then-reconcile** model:
//! 1. Report the applied state to the agent
//! 2. Reconcile the response against the applied state in one transaction
//! 3. Dispatch the resulting changes to interested receivers
//!
//! ## Key Invariants
//!
//! - The agent's path list is authoritative: unlisted paths are deleted
//! - A malformed response never changes the applied state
//! - Synchronization failures never escape the worker thread
//! - Protocol errors keep the client; unexpected errors replace it

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capabilities;
mod client;
mod component;
mod config;
mod dispatcher;
mod error;
mod http;
mod reconcile;
mod transport;

pub use capabilities::{products, Capabilities, CapabilitiesBuilder, CapabilityFlags};
pub use client::Client;
pub use component::{BarrierKind, Component, ComponentStats};
pub use config::{
    ClientIdentity, ComponentConfig, DEFAULT_BARRIER_TIMEOUT, DEFAULT_POLL_INTERVAL,
    POLL_INTERVAL_ENV,
};
pub use dispatcher::{Dispatcher, ProductReceiver, Receiver};
pub use error::{
    ClientError, ClientResult, ComponentError, ComponentResult, ReceiverError, SyncError,
    SyncResult, TransportError, TransportResult,
};
pub use http::{decode_agent_body, HttpClient, HttpResponse, HttpTransport, CONFIG_ENDPOINT};
pub use reconcile::reconcile;
pub use transport::{MockTransport, Transport};
