// src/types.rs

//! Shared domain enums.
//!
//! Every enum here has a stable string form (`as_str`) which is what gets
//! written to the store and to the event stream, and a lenient `FromStr`
//! used when reading user input or persisted rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! display_via_as_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

/// Kind of scope entry a target represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "ip")]
    Ip,
    #[serde(rename = "cidr")]
    Cidr,
    #[serde(rename = "org")]
    OrgName,
}

impl TargetType {
    pub const ALL: [TargetType; 4] = [
        TargetType::Domain,
        TargetType::Ip,
        TargetType::Cidr,
        TargetType::OrgName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Domain => "domain",
            TargetType::Ip => "ip",
            TargetType::Cidr => "cidr",
            TargetType::OrgName => "org",
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "domain" => Ok(TargetType::Domain),
            "ip" | "ipv4" | "ipv6" => Ok(TargetType::Ip),
            "cidr" => Ok(TargetType::Cidr),
            other if other.contains("org") => Ok(TargetType::OrgName),
            other => Err(format!(
                "invalid target type: {other} (expected domain, ip, cidr or org)"
            )),
        }
    }
}

/// Named policy bundle controlling which stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Profile {
    #[default]
    #[serde(rename = "Standard external")]
    StandardExternal,
    #[serde(rename = "OSINT-heavy")]
    OsintHeavy,
    #[serde(rename = "Stealth")]
    Stealth,
    #[serde(rename = "Custom")]
    Custom,
}

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::StandardExternal,
        Profile::OsintHeavy,
        Profile::Stealth,
        Profile::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::StandardExternal => "Standard external",
            Profile::OsintHeavy => "OSINT-heavy",
            Profile::Stealth => "Stealth",
            Profile::Custom => "Custom",
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    /// Accepts the display form as well as kebab/snake/camel variants,
    /// e.g. `"Standard external"`, `"standard-external"`, `"osint_heavy"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "" | "standard" | "standardexternal" => Ok(Profile::StandardExternal),
            "osint" | "osintheavy" => Ok(Profile::OsintHeavy),
            "stealth" => Ok(Profile::Stealth),
            "custom" => Ok(Profile::Custom),
            _ => Err(format!(
                "invalid profile: {} (expected standard-external, osint-heavy, stealth or custom)",
                s.trim()
            )),
        }
    }
}

/// Lifecycle of a target as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "Pending",
            TargetStatus::Running => "Running",
            TargetStatus::Completed => "Completed",
            TargetStatus::Failed => "Failed",
        }
    }
}

impl FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TargetStatus::Pending),
            "running" => Ok(TargetStatus::Running),
            "completed" => Ok(TargetStatus::Completed),
            "failed" => Ok(TargetStatus::Failed),
            other => Err(format!("invalid target status: {other}")),
        }
    }
}

/// Job status. `Paused` only ever appears in persisted rows; the live job
/// keeps `Running` and carries a separate paused flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "stopped" => Ok(JobStatus::Stopped),
            other => Err(format!("invalid job status: {other}")),
        }
    }
}

/// One named phase of the recon pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Subdomains")]
    Subdomains,
    #[serde(rename = "DNS records")]
    DnsRecords,
    #[serde(rename = "Live hosts")]
    LiveHosts,
    #[serde(rename = "HTTP probing")]
    HttpProbing,
    #[serde(rename = "Directories")]
    Directories,
    #[serde(rename = "Vulnerability hints")]
    VulnHints,
}

impl Stage {
    /// Fixed pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Subdomains,
        Stage::DnsRecords,
        Stage::LiveHosts,
        Stage::HttpProbing,
        Stage::Directories,
        Stage::VulnHints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Subdomains => "Subdomains",
            Stage::DnsRecords => "DNS records",
            Stage::LiveHosts => "Live hosts",
            Stage::HttpProbing => "HTTP probing",
            Stage::Directories => "Directories",
            Stage::VulnHints => "Vulnerability hints",
        }
    }

    /// Position in [`Stage::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "subdomains" => Ok(Stage::Subdomains),
            "dns" | "dnsrecords" => Ok(Stage::DnsRecords),
            "livehosts" => Ok(Stage::LiveHosts),
            "http" | "httpprobing" => Ok(Stage::HttpProbing),
            "directories" => Ok(Stage::Directories),
            "vulnhints" | "vulnerabilityhints" => Ok(Stage::VulnHints),
            _ => Err(format!("unknown stage: {}", s.trim())),
        }
    }
}

/// Per-stage status inside a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Queued,
    Running,
    Done,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Queued => "queued",
            StageStatus::Running => "running",
            StageStatus::Done => "done",
            StageStatus::Skipped => "skipped",
        }
    }

    /// Finished stages are never redone on resume.
    pub fn is_finished(&self) -> bool {
        matches!(self, StageStatus::Done | StageStatus::Skipped)
    }
}

/// Level of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Info => "info",
            ActivityLevel::Warning => "warning",
            ActivityLevel::Error => "error",
            ActivityLevel::Success => "success",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(ActivityLevel::Info),
            "warn" | "warning" => Ok(ActivityLevel::Warning),
            "error" => Ok(ActivityLevel::Error),
            "success" => Ok(ActivityLevel::Success),
            other => Err(format!("invalid activity level: {other}")),
        }
    }
}

/// Liveness of a discovered host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostStatus {
    Unknown,
    Live,
    Dead,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Unknown => "UNKNOWN",
            HostStatus::Live => "LIVE",
            HostStatus::Dead => "DEAD",
        }
    }
}

impl FromStr for HostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UNKNOWN" => Ok(HostStatus::Unknown),
            "LIVE" => Ok(HostStatus::Live),
            "DEAD" => Ok(HostStatus::Dead),
            other => Err(format!("invalid host status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            other => Err(format!("invalid severity: {other}")),
        }
    }
}

/// Triage state of a finding. Only the external CRUD layer changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FindingStatus {
    #[default]
    Open,
    Confirmed,
    #[serde(rename = "False Positive")]
    FalsePositive,
    #[serde(rename = "Needs Review")]
    NeedsReview,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Open => "Open",
            FindingStatus::Confirmed => "Confirmed",
            FindingStatus::FalsePositive => "False Positive",
            FindingStatus::NeedsReview => "Needs Review",
        }
    }
}

impl FromStr for FindingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "open" => Ok(FindingStatus::Open),
            "confirmed" => Ok(FindingStatus::Confirmed),
            "falsepositive" => Ok(FindingStatus::FalsePositive),
            "needsreview" => Ok(FindingStatus::NeedsReview),
            _ => Err(format!("invalid finding status: {}", s.trim())),
        }
    }
}

display_via_as_str!(
    TargetType,
    Stage,
    Profile,
    TargetStatus,
    JobStatus,
    StageStatus,
    ActivityLevel,
    HostStatus,
    Severity,
    FindingStatus,
);
