// src/stages/subdomains.rs

//! Subdomain enumeration via subfinder, assetfinder and findomain.

use std::collections::BTreeSet;

use tracing::debug;

use crate::events::JobLogger;
use crate::exec::{CommandSpec, RunMode, Tool};

use super::{Toolkit, normalize_host, pace};

/// DNS name length ceiling.
const MAX_HOST_LEN: usize = 253;

const ENUM_TOOLS: [Tool; 3] = [Tool::Subfinder, Tool::Assetfinder, Tool::Findomain];

fn tool_args(tool: Tool, root: &str) -> Vec<String> {
    match tool {
        Tool::Subfinder => vec!["-d".into(), root.into(), "-silent".into()],
        Tool::Findomain => vec!["-t".into(), root.into(), "-q".into()],
        _ => vec![root.into()],
    }
}

/// Whether `candidate` is a plausible subdomain of `root`.
///
/// Both arguments are compared case-insensitively; the root itself counts.
pub fn is_valid_subdomain(candidate: &str, root: &str) -> bool {
    let host = candidate.to_lowercase();
    let root = root.to_lowercase();

    if host.is_empty() || host.len() > MAX_HOST_LEN || root.is_empty() {
        return false;
    }
    if host.chars().any(char::is_whitespace) {
        return false;
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return false;
    }
    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return false;
    }

    host == root || host.ends_with(&format!(".{root}"))
}

/// Merged output of the enumeration tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Sorted, lowercased, de-duplicated hosts under the root.
    pub hosts: Vec<String>,
    /// Non-empty output lines that were not a valid in-scope host.
    pub rejected: usize,
}

/// Wildcard entries (`*.dev.example.com`) stand for their parent name.
fn strip_wildcard(line: &str) -> &str {
    line.trim().strip_prefix("*.").unwrap_or(line.trim())
}

/// Run every available enumeration tool in sequence and merge the results.
///
/// A missing tool is skipped with a warning. A failing tool (non-zero exit,
/// timeout, oversized output) is logged as a warning and contributes nothing,
/// so an empty result means the caller should fall back to the bare target.
pub async fn enumerate_subdomains(kit: &Toolkit, target: &str, log: &JobLogger) -> Enumeration {
    let root = normalize_host(target);
    let mut found = BTreeSet::new();
    let mut rejected = 0usize;

    for tool in ENUM_TOOLS {
        let Some(program) = kit.locator.find(tool) else {
            log.warn(format!("Tool {} not available; skipping", tool.name()));
            continue;
        };

        pace(kit.config.delays.subdomain).await;

        let spec = CommandSpec::new(program, tool_args(tool, &root), kit.config.timeouts.subdomain_tool);
        match kit.runner.run(&spec, RunMode::Strict, log).await {
            Ok(output) => {
                let before = found.len();
                for line in output.lines().map(strip_wildcard).filter(|l| !l.is_empty()) {
                    if is_valid_subdomain(line, &root) {
                        found.insert(line.to_lowercase());
                    } else {
                        rejected += 1;
                    }
                }
                debug!(tool = tool.name(), new = found.len() - before, rejected, "enumeration tool finished");
            }
            Err(err) => log.warn(format!("Tool {} failed: {err}", tool.name())),
        }
    }

    Enumeration {
        hosts: found.into_iter().collect(),
        rejected,
    }
}
