// src/stages/mod.rs

//! Stage executors.
//!
//! Each executor drives one or more external tools and returns typed
//! results. A missing tool or a tool that produced nothing degrades to an
//! empty result plus a warning line in the job's activity log; executors only
//! return `Err` where the pipeline must treat the failure as fatal.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ReconConfig;
use crate::exec::{CommandRunner, ToolLocator};

pub mod dirfuzz;
pub mod dns;
pub mod http_probe;
pub mod resolve;
pub mod subdomains;
pub mod vuln_hints;

pub use dirfuzz::{DirectoryHit, fuzz_directories, parse_gobuster_line};
pub use dns::{RECORD_TYPES, collect_dns_records};
pub use http_probe::{ProbeResult, Scheme, has_http_prober, parse_httpx_line, probe_hosts};
pub use resolve::{ResolvedHost, resolve_hosts};
pub use subdomains::{Enumeration, enumerate_subdomains, is_valid_subdomain};
pub use vuln_hints::derive_findings;

/// Everything an executor needs to run tools.
#[derive(Debug, Clone)]
pub struct Toolkit {
    pub runner: CommandRunner,
    pub locator: Arc<ToolLocator>,
    pub config: Arc<ReconConfig>,
}

impl Toolkit {
    pub fn new(runner: CommandRunner, locator: Arc<ToolLocator>, config: Arc<ReconConfig>) -> Self {
        Self {
            runner,
            locator,
            config,
        }
    }
}

/// Reduce user input to a bare host: no scheme, path, query, fragment or
/// trailing dot. Case is preserved.
///
/// `https://Example.com/x?y` becomes `Example.com`.
pub fn normalize_target(value: &str) -> String {
    let mut host = value.trim();
    if let Some(idx) = host.find("://") {
        host = &host[idx + 3..];
    }
    let end = host.find(['/', '?', '#']).unwrap_or(host.len());
    host[..end].trim_end_matches('.').to_string()
}

/// [`normalize_target`] plus lowercasing; used for hostnames handed to tools.
pub fn normalize_host(value: &str) -> String {
    normalize_target(value).to_lowercase()
}

/// Deliberate pacing between tool invocations.
pub(crate) async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
