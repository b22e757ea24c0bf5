//! Replay command implementation.

use confsync_core::{Change, ChangeKind, RepositoryState};
use confsync_engine::{
    decode_agent_body, Capabilities, Client, ClientIdentity, Receiver, ReceiverError, Transport,
    TransportError, TransportResult,
};
use confsync_protocol::{ConfigRequest, ConfigResponse};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Serves recorded agent bodies, one per request.
struct RecordedAgent {
    bodies: Mutex<VecDeque<(String, Vec<u8>)>>,
}

impl RecordedAgent {
    fn new(bodies: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            bodies: Mutex::new(bodies.into()),
        }
    }
}

impl Transport for RecordedAgent {
    fn send_config(&self, _request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        let next = self.bodies.lock().pop_front();
        match next {
            Some((name, body)) => {
                tracing::debug!(file = %name, "serving recorded response");
                decode_agent_body(&body)
            }
            None => Err(TransportError::Request("no recorded response left".into())),
        }
    }
}

/// Accepts every product.
struct AnyProduct;

impl Receiver for AnyProduct {
    fn products(&self) -> &[String] {
        &[]
    }

    fn apply(&self, _changes: &[&Change], _state: &RepositoryState) -> Result<(), ReceiverError> {
        Ok(())
    }

    fn matches(&self, _product: &str) -> bool {
        true
    }
}

/// Outcome of one replayed cycle.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    /// File the response was read from.
    pub file: String,
    /// Changes committed by the cycle.
    pub changes: Vec<ChangeReport>,
    /// Error, if the cycle failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Paths applied after the cycle.
    pub applied: Vec<String>,
    /// Targets version after the cycle.
    pub targets_version: u64,
}

/// One committed change.
#[derive(Debug, Serialize)]
pub struct ChangeReport {
    /// `insert`, `update` or `delete`.
    pub kind: &'static str,
    /// Path.
    pub path: String,
    /// Applied config version, absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

fn kind_name(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Insert => "insert",
        ChangeKind::Update => "update",
        ChangeKind::Delete => "delete",
    }
}

/// Runs the replay command.
pub fn run(
    files: &[PathBuf],
    products: &[String],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bodies = Vec::with_capacity(files.len());
    for file in files {
        bodies.push((file.display().to_string(), std::fs::read(file)?));
    }

    let reports = replay(bodies, products);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        _ => {
            print_text_output(&reports);
        }
    }

    Ok(())
}

/// Syncs a fresh client once per recorded body.
pub fn replay(bodies: Vec<(String, Vec<u8>)>, products: &[String]) -> Vec<CycleReport> {
    let names: Vec<String> = bodies.iter().map(|(name, _)| name.clone()).collect();
    let capabilities = products
        .iter()
        .fold(Capabilities::builder(), |builder, product| {
            builder.product(product.clone())
        })
        .receiver(Arc::new(AnyProduct))
        .build();
    let client = Client::new(
        Arc::new(RecordedAgent::new(bodies)),
        Arc::new(capabilities),
        ClientIdentity::new("confsync-replay", "none"),
    );

    names
        .into_iter()
        .map(|file| {
            let (changes, error) = match client.sync() {
                Ok(changes) => (
                    changes
                        .iter()
                        .map(|change| ChangeReport {
                            kind: kind_name(change.kind()),
                            path: change.path().to_string(),
                            version: change.content().map(|c| c.version()),
                        })
                        .collect(),
                    None,
                ),
                Err(e) => (Vec::new(), Some(e.to_string())),
            };
            let state = client.repository().state();
            CycleReport {
                file,
                changes,
                error,
                applied: state.paths().map(ToString::to_string).collect(),
                targets_version: state.targets_version(),
            }
        })
        .collect()
}

fn print_text_output(reports: &[CycleReport]) {
    for (cycle, report) in reports.iter().enumerate() {
        println!("Cycle {} ({}):", cycle + 1, report.file);
        if let Some(error) = &report.error {
            println!("  error: {}", error);
        }
        for change in &report.changes {
            match change.version {
                Some(version) => println!("  {:<6} {} (v{})", change.kind, change.path, version),
                None => println!("  {:<6} {}", change.kind, change.path),
            }
        }
        println!(
            "  applied: {} config(s), targets version {}",
            report.applied.len(),
            report.targets_version
        );
    }
}
