// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::Stage;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pipeline]
/// subdomain_delay = "2s"
/// http_delay = "1s"
///
/// [limits]
/// http_probe_hosts = 20
///
/// [timeouts]
/// subdomain_tool = "60s"
///
/// [tools]
/// extra_paths = ["/opt/recon/bin"]
///
/// [profile.custom]
/// skip = ["Directories"]
/// ```
///
/// All sections are optional and have defaults matching a stealthy pace.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawReconConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub timeouts: TimeoutsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub profile: ProfileSection,
}

/// `[pipeline]` section: pacing between external requests.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_subdomain_delay")]
    pub subdomain_delay: String,
    #[serde(default = "default_resolve_delay")]
    pub resolve_delay: String,
    #[serde(default = "default_dns_delay")]
    pub dns_delay: String,
    #[serde(default = "default_http_delay")]
    pub http_delay: String,
    #[serde(default = "default_dirfuzz_delay")]
    pub dirfuzz_delay: String,

    /// Use the operating system resolver when `dig` is not installed.
    #[serde(default = "default_true")]
    pub system_resolver_fallback: bool,
}

fn default_subdomain_delay() -> String {
    "2s".to_string()
}

fn default_resolve_delay() -> String {
    "1s".to_string()
}

fn default_dns_delay() -> String {
    "2s".to_string()
}

fn default_http_delay() -> String {
    "1s".to_string()
}

fn default_dirfuzz_delay() -> String {
    "2s".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            subdomain_delay: default_subdomain_delay(),
            resolve_delay: default_resolve_delay(),
            dns_delay: default_dns_delay(),
            http_delay: default_http_delay(),
            dirfuzz_delay: default_dirfuzz_delay(),
            system_resolver_fallback: true,
        }
    }
}

/// `[limits]` section: blast-radius and memory caps.
#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Hosts probed per HTTP probing invocation.
    #[serde(default = "default_http_probe_hosts")]
    pub http_probe_hosts: usize,

    /// Hosts the orchestrator hands to the directory stage.
    #[serde(default = "default_dirfuzz_candidates")]
    pub dirfuzz_candidates: usize,

    /// Hosts the directory executor actually fuzzes.
    #[serde(default = "default_dirfuzz_hosts")]
    pub dirfuzz_hosts: usize,

    /// Output lines parsed per fuzzed host.
    #[serde(default = "default_dirfuzz_max_lines")]
    pub dirfuzz_max_lines: usize,

    /// Hard ceiling on captured stdout/stderr per command, in bytes.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Characters of stdout/stderr copied into the activity log.
    #[serde(default = "default_log_output_chars")]
    pub log_output_chars: usize,
}

fn default_http_probe_hosts() -> usize {
    20
}

fn default_dirfuzz_candidates() -> usize {
    5
}

fn default_dirfuzz_hosts() -> usize {
    3
}

fn default_dirfuzz_max_lines() -> usize {
    50
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_output_chars() -> usize {
    4000
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            http_probe_hosts: default_http_probe_hosts(),
            dirfuzz_candidates: default_dirfuzz_candidates(),
            dirfuzz_hosts: default_dirfuzz_hosts(),
            dirfuzz_max_lines: default_dirfuzz_max_lines(),
            max_output_bytes: default_max_output_bytes(),
            log_output_chars: default_log_output_chars(),
        }
    }
}

/// `[timeouts]` section, one entry per kind of external command.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_subdomain_tool_timeout")]
    pub subdomain_tool: String,
    #[serde(default = "default_resolve_timeout")]
    pub resolve: String,
    #[serde(default = "default_dns_timeout")]
    pub dns: String,
    #[serde(default = "default_httpx_timeout")]
    pub httpx: String,
    #[serde(default = "default_curl_timeout")]
    pub curl: String,
    #[serde(default = "default_gobuster_timeout")]
    pub gobuster: String,
}

fn default_subdomain_tool_timeout() -> String {
    "60s".to_string()
}

fn default_resolve_timeout() -> String {
    "5s".to_string()
}

fn default_dns_timeout() -> String {
    "10s".to_string()
}

fn default_httpx_timeout() -> String {
    "6s".to_string()
}

fn default_curl_timeout() -> String {
    "4s".to_string()
}

fn default_gobuster_timeout() -> String {
    "60s".to_string()
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            subdomain_tool: default_subdomain_tool_timeout(),
            resolve: default_resolve_timeout(),
            dns: default_dns_timeout(),
            httpx: default_httpx_timeout(),
            curl: default_curl_timeout(),
            gobuster: default_gobuster_timeout(),
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// Directories searched after `PATH` and the standard fallbacks.
    #[serde(default)]
    pub extra_paths: Vec<PathBuf>,

    /// Wordlist passed to the directory brute-force tool.
    #[serde(default = "default_wordlist")]
    pub wordlist: PathBuf,
}

fn default_wordlist() -> PathBuf {
    PathBuf::from("/usr/share/wordlists/dirb/common.txt")
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            extra_paths: Vec::new(),
            wordlist: default_wordlist(),
        }
    }
}

/// `[profile]` section. Only the Custom profile is configurable.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileSection {
    #[serde(default)]
    pub custom: CustomProfileSection,
}

/// `[profile.custom]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomProfileSection {
    /// Stage names the Custom profile skips, e.g. `["Directories"]`.
    #[serde(default)]
    pub skip: Vec<String>,
}

/// Parsed pacing delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    pub subdomain: Duration,
    pub resolve: Duration,
    pub dns: Duration,
    pub http: Duration,
    pub dirfuzz: Duration,
}

impl Delays {
    /// No pacing at all; used by tests and local runs.
    pub fn none() -> Self {
        Self {
            subdomain: Duration::ZERO,
            resolve: Duration::ZERO,
            dns: Duration::ZERO,
            http: Duration::ZERO,
            dirfuzz: Duration::ZERO,
        }
    }
}

/// Parsed command timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub subdomain_tool: Duration,
    pub resolve: Duration,
    pub dns: Duration,
    pub httpx: Duration,
    pub curl: Duration,
    pub gobuster: Duration,
}

/// Validated configuration used by the rest of the crate.
///
/// Built from [`RawReconConfig`] via `TryFrom` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ReconConfig {
    pub delays: Delays,
    pub system_resolver_fallback: bool,
    pub limits: Limits,
    pub timeouts: Timeouts,
    pub tools: ToolsSection,
    /// Stages skipped by the Custom profile.
    pub custom_skip: Vec<Stage>,
}

impl ReconConfig {
    pub(crate) fn new_unchecked(
        delays: Delays,
        system_resolver_fallback: bool,
        limits: Limits,
        timeouts: Timeouts,
        tools: ToolsSection,
        custom_skip: Vec<Stage>,
    ) -> Self {
        Self {
            delays,
            system_resolver_fallback,
            limits,
            timeouts,
            tools,
            custom_skip,
        }
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            delays: Delays {
                subdomain: Duration::from_secs(2),
                resolve: Duration::from_secs(1),
                dns: Duration::from_secs(2),
                http: Duration::from_secs(1),
                dirfuzz: Duration::from_secs(2),
            },
            system_resolver_fallback: true,
            limits: Limits::default(),
            timeouts: Timeouts {
                subdomain_tool: Duration::from_secs(60),
                resolve: Duration::from_secs(5),
                dns: Duration::from_secs(10),
                httpx: Duration::from_secs(6),
                curl: Duration::from_secs(4),
                gobuster: Duration::from_secs(60),
            },
            tools: ToolsSection::default(),
            custom_skip: Vec::new(),
        }
    }
}
