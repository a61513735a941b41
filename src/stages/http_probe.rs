// src/stages/http_probe.rs

//! HTTP liveness probing: httpx first, curl as the fallback.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::events::JobLogger;
use crate::exec::{CommandSpec, RunMode, Tool};

use super::{Toolkit, normalize_host, pace};

static HTTPX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(https?)://\S+(?:\s+\[(\d{1,3})\])?").expect("httpx line pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Https => 443,
            Scheme::Http => 80,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host that answered over HTTP(S).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub host: String,
    pub scheme: Scheme,
    pub status: Option<u16>,
}

/// Parse one httpx output line such as `https://a.example.com [200]`.
pub fn parse_httpx_line(line: &str) -> Option<(Scheme, Option<u16>)> {
    let caps = HTTPX_LINE.captures(line.trim())?;
    let scheme = if caps[1].eq_ignore_ascii_case("https") {
        Scheme::Https
    } else {
        Scheme::Http
    };
    let status = caps.get(2).and_then(|m| m.as_str().parse().ok());
    Some((scheme, status))
}

/// Whether any HTTP probing tool is installed.
pub fn has_http_prober(kit: &Toolkit) -> bool {
    kit.locator.find(Tool::Httpx).is_some() || kit.locator.find(Tool::Curl).is_some()
}

/// Probe up to `[limits].http_probe_hosts` hosts and return the live ones.
pub async fn probe_hosts(kit: &Toolkit, hosts: &[String], log: &JobLogger) -> Vec<ProbeResult> {
    if hosts.is_empty() {
        return Vec::new();
    }

    let httpx = kit.locator.find(Tool::Httpx);
    let curl = kit.locator.find(Tool::Curl);
    if !has_http_prober(kit) {
        log.warn("Neither httpx nor curl found; skipping HTTP probing");
        return Vec::new();
    }

    let cap = kit.config.limits.http_probe_hosts;
    let mut live = Vec::new();

    for raw in hosts.iter().take(cap) {
        pace(kit.config.delays.http).await;

        let host = normalize_host(raw);
        if host.is_empty() {
            continue;
        }

        let mut result = match &httpx {
            Some(program) => probe_with_httpx(kit, program, &host, log).await,
            None => None,
        };
        if result.is_none() {
            if let Some(program) = &curl {
                result = probe_with_curl(kit, program, &host, log).await;
            }
        }

        if let Some(hit) = result {
            live.push(hit);
        }
    }

    live
}

async fn probe_with_httpx(kit: &Toolkit, program: &Path, host: &str, log: &JobLogger) -> Option<ProbeResult> {
    let timeout = kit.config.timeouts.httpx;
    let args = vec![
        "-u".to_string(),
        host.to_string(),
        "-silent".to_string(),
        "-status-code".to_string(),
        "-no-color".to_string(),
        "-no-fallback".to_string(),
        "-timeout".to_string(),
        inner_timeout_secs(timeout).to_string(),
    ];
    let spec = CommandSpec::new(program, args, timeout);

    let output = kit.runner.run(&spec, RunMode::Strict, log).await.ok()?;
    let mut lines = output.lines().peekable();
    lines.peek()?;

    let (scheme, status) = lines
        .find_map(parse_httpx_line)
        .unwrap_or((Scheme::Https, None));

    Some(ProbeResult {
        host: host.to_string(),
        scheme,
        status,
    })
}

async fn probe_with_curl(kit: &Toolkit, program: &Path, host: &str, log: &JobLogger) -> Option<ProbeResult> {
    let timeout = kit.config.timeouts.curl;

    for scheme in [Scheme::Https, Scheme::Http] {
        let args = vec![
            "-s".to_string(),
            "-o".to_string(),
            "/dev/null".to_string(),
            "-w".to_string(),
            "%{http_code}".to_string(),
            "--max-time".to_string(),
            inner_timeout_secs(timeout).to_string(),
            format!("{scheme}://{host}"),
        ];
        let spec = CommandSpec::new(program, args, timeout);

        let Ok(output) = kit.runner.run(&spec, RunMode::Strict, log).await else {
            continue;
        };
        let code = output.stdout.trim();
        if code == "000" {
            continue;
        }
        if let Ok(status) = code.parse::<u16>() {
            if status > 0 {
                return Some(ProbeResult {
                    host: host.to_string(),
                    scheme,
                    status: Some(status),
                });
            }
        }
    }

    None
}

/// Tool-side timeout, one second under the process timeout.
fn inner_timeout_secs(outer: Duration) -> u64 {
    outer.as_secs().saturating_sub(1).max(1)
}
