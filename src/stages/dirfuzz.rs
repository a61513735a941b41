// src/stages/dirfuzz.rs

//! Directory brute forcing with gobuster.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::events::JobLogger;
use crate::exec::{CommandSpec, RunMode, Tool};

use super::{Scheme, Toolkit, normalize_host, pace};

static GOBUSTER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S+)\s+\(Status:\s*(\d+)\)").expect("gobuster line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryHit {
    pub host: String,
    pub path: String,
    pub status: u16,
}

/// Parse a line like `/admin (Status: 301) [Size: 0]` into path and status.
pub fn parse_gobuster_line(line: &str) -> Option<(String, u16)> {
    let caps = GOBUSTER_LINE.captures(line)?;
    let status = caps[2].parse().ok()?;
    Some((caps[1].to_string(), status))
}

/// Fuzz up to `[limits].dirfuzz_hosts` hosts, HTTPS first then HTTP.
pub async fn fuzz_directories(kit: &Toolkit, hosts: &[String], log: &JobLogger) -> Vec<DirectoryHit> {
    if hosts.is_empty() {
        return Vec::new();
    }

    let Some(gobuster) = kit.locator.find(Tool::Gobuster) else {
        log.warn("gobuster not found; skipping directory fuzzing");
        return Vec::new();
    };

    let limits = &kit.config.limits;
    let wordlist = kit.config.tools.wordlist.display().to_string();
    let mut hits = Vec::new();

    for raw in hosts.iter().take(limits.dirfuzz_hosts) {
        pace(kit.config.delays.dirfuzz).await;

        let host = normalize_host(raw);
        if host.is_empty() {
            continue;
        }

        for scheme in [Scheme::Https, Scheme::Http] {
            let args = vec![
                "dir".to_string(),
                "-u".to_string(),
                format!("{scheme}://{host}"),
                "-w".to_string(),
                wordlist.clone(),
                "-q".to_string(),
                "-t".to_string(),
                "1".to_string(),
                "--timeout".to_string(),
                "5s".to_string(),
            ];
            let spec = CommandSpec::new(gobuster.clone(), args, kit.config.timeouts.gobuster);

            match kit.runner.run(&spec, RunMode::Strict, log).await {
                Ok(output) => {
                    hits.extend(
                        output
                            .lines()
                            .take(limits.dirfuzz_max_lines)
                            .filter_map(parse_gobuster_line)
                            .map(|(path, status)| DirectoryHit {
                                host: host.clone(),
                                path,
                                status,
                            }),
                    );
                    break;
                }
                Err(err) => {
                    debug!(host = %host, %scheme, error = %err, "gobuster run failed");
                }
            }
        }
    }

    hits
}
