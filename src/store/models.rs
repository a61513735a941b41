// src/store/models.rs

//! Row types read from and written to the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    ActivityLevel, FindingStatus, HostStatus, JobStatus, Profile, Severity, TargetStatus, TargetType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTarget {
    /// Display name; the raw value is used when absent.
    pub name: Option<String>,
    pub value: String,
    pub target_type: TargetType,
    pub profile: Profile,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub target_type: TargetType,
    pub profile: Profile,
    pub status: TargetStatus,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
}

/// Persisted summary of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub target_id: i64,
    pub profile: Profile,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subdomain {
    pub id: i64,
    pub target_id: i64,
    pub job_id: String,
    pub hostname: String,
    pub ip: Option<String>,
    pub status: HostStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub id: i64,
    pub target_id: i64,
    pub job_id: String,
    pub record: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub target_id: i64,
    pub job_id: String,
    pub host: String,
    pub ip: String,
    pub port: u16,
    pub protocol: String,
    pub service_name: Option<String>,
    pub http_status: Option<u16>,
    pub technology: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: i64,
    pub target_id: i64,
    pub job_id: String,
    pub host: String,
    pub ip: String,
    pub port: u16,
    pub protocol: String,
    pub service_name: Option<String>,
    pub http_status: Option<u16>,
    pub technology: Option<String>,
    pub notes: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDirectory {
    pub target_id: i64,
    pub job_id: String,
    pub host: String,
    pub path: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub id: i64,
    pub target_id: i64,
    pub job_id: String,
    pub host: String,
    pub path: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFinding {
    pub target_id: i64,
    pub job_id: String,
    pub severity: Severity,
    pub finding_type: String,
    pub title: String,
    pub host: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub id: i64,
    pub target_id: i64,
    pub job_id: String,
    pub severity: Severity,
    pub finding_type: String,
    pub title: String,
    pub host: Option<String>,
    pub description: Option<String>,
    pub status: FindingStatus,
    pub first_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub job_id: String,
    pub level: ActivityLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
