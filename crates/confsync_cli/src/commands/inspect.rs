//! Inspect command implementation.

use confsync_engine::decode_agent_body;
use confsync_protocol::{ConfigResponse, ContentList, Path, TargetMap};
use serde::Serialize;
use std::path::Path as FsPath;

/// Inspection result for one agent response.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Targets manifest version.
    pub targets_version: u64,
    /// Opaque backend state to echo back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opaque_backend_state: Option<String>,
    /// Manifest expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    /// Number of root metadata documents.
    pub roots: usize,
    /// Per-path findings, in listing order.
    pub configs: Vec<ConfigReport>,
    /// Problems that would make a client reject the response.
    pub problems: Vec<String>,
}

/// Findings for one listed path.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    /// Raw path.
    pub path: String,
    /// Product.
    pub product: String,
    /// Config id.
    pub config_id: String,
    /// Config version from the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Expected length from the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// Whether a target file matching the manifest entry was sent.
    pub content: bool,
}

/// Runs the inspect command.
pub fn run(file: &FsPath, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let body = std::fs::read(file)?;
    let response = decode_agent_body(&body)?;
    let result = inspect(&response)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Checks a decoded response the way a client would, without stopping at
/// the first problem.
pub fn inspect(response: &ConfigResponse) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let targets = match &response.targets {
        Some(manifest) => TargetMap::parse(manifest)?,
        None => TargetMap::default(),
    };
    let contents = ContentList::parse(&response.target_files)?;

    let mut result = InspectResult {
        targets_version: targets.version(),
        opaque_backend_state: targets.opaque_backend_state().map(str::to_string),
        expires: targets.expires().map(str::to_string),
        roots: response.roots.len(),
        configs: Vec::new(),
        problems: Vec::new(),
    };

    if response.targets.is_none() && !response.client_configs.is_empty() {
        result
            .problems
            .push("paths are listed but no targets manifest was sent".to_string());
    }

    for raw in &response.client_configs {
        let path = match Path::parse(raw) {
            Ok(path) => path,
            Err(e) => {
                result.problems.push(e.to_string());
                continue;
            }
        };

        let target = targets.get(&path);
        let content = target
            .map(|t| contents.find_content(&path, t).is_some())
            .unwrap_or(false);
        if target.is_none() {
            result.problems.push(format!("no target for path '{}'", path));
        }

        result.configs.push(ConfigReport {
            path: raw.clone(),
            product: path.product().to_string(),
            config_id: path.config_id().to_string(),
            version: target.map(|t| t.version()),
            length: target.map(|t| t.length()),
            content,
        });
    }

    Ok(result)
}

fn print_text_output(result: &InspectResult) {
    println!("Targets version: {}", result.targets_version);
    if let Some(state) = &result.opaque_backend_state {
        println!("Backend state:   {}", state);
    }
    if let Some(expires) = &result.expires {
        println!("Expires:         {}", expires);
    }
    println!("Roots:           {}", result.roots);
    println!();

    println!("Configs ({}):", result.configs.len());
    for config in &result.configs {
        let version = config
            .version
            .map(|v| format!("v{}", v))
            .unwrap_or_else(|| "-".to_string());
        let content = if config.content { "content" } else { "cached" };
        println!("  {:<8} {:<8} {}", version, content, config.path);
    }

    if !result.problems.is_empty() {
        println!();
        println!("Problems ({}):", result.problems.len());
        for problem in &result.problems {
            println!("  {}", problem);
        }
    }
}
