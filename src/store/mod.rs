// src/store/mod.rs

//! Persistence for targets, jobs, discovered assets and the activity log.
//!
//! The pipeline only depends on the [`Store`] trait; [`SqliteStore`] is the
//! production implementation. All calls are short, synchronous statements.

mod models;
mod sqlite;

pub use models::{
    ActivityEntry, Directory, DnsRecord, Finding, JobRecord, NewDirectory, NewFinding, NewService,
    NewTarget, Service, Subdomain, Target,
};
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::types::{FindingStatus, HostStatus, JobStatus, TargetStatus};

pub trait Store: Send + Sync {
    // targets
    fn insert_target(&self, target: &NewTarget) -> Result<Target>;
    fn get_target(&self, id: i64) -> Result<Option<Target>>;
    fn find_target_by_value(&self, value: &str) -> Result<Option<Target>>;
    /// Update status; `last_run` is set when given.
    fn set_target_status(&self, id: i64, status: TargetStatus, last_run: Option<DateTime<Utc>>) -> Result<()>;

    // jobs
    fn insert_job(&self, job: &JobRecord) -> Result<()>;
    fn set_job_status(&self, job_id: &str, status: JobStatus, completed_at: Option<DateTime<Utc>>) -> Result<()>;
    fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>>;

    // subdomains
    /// Insert or refresh a subdomain. Returns `true` when the row is new.
    ///
    /// On conflict the IP is updated only when a new one is known.
    fn upsert_subdomain(&self, target_id: i64, job_id: &str, hostname: &str, ip: Option<&str>) -> Result<bool>;
    fn list_subdomains(&self, target_id: i64) -> Result<Vec<Subdomain>>;
    fn set_subdomain_status(&self, target_id: i64, hostname: &str, status: HostStatus) -> Result<()>;

    // dns records
    fn insert_dns_record(&self, target_id: i64, job_id: &str, record: &str) -> Result<()>;
    fn list_dns_records(&self, job_id: &str) -> Result<Vec<DnsRecord>>;

    // services
    fn insert_service(&self, service: &NewService) -> Result<()>;
    fn list_services(&self, target_id: i64) -> Result<Vec<Service>>;

    // directories
    fn insert_directory(&self, dir: &NewDirectory) -> Result<()>;
    fn list_directories(&self, job_id: &str) -> Result<Vec<Directory>>;

    // findings
    /// Insert unless a finding with the same target, type, host and title
    /// exists. Returns `true` when inserted.
    fn insert_finding_if_absent(&self, finding: &NewFinding) -> Result<bool>;
    fn list_findings(&self, target_id: i64) -> Result<Vec<Finding>>;
    fn set_finding_status(&self, id: i64, status: FindingStatus) -> Result<()>;

    // activity
    fn append_activity(&self, entry: &ActivityEntry) -> Result<()>;
    fn list_activity(&self, job_id: &str) -> Result<Vec<ActivityEntry>>;
}
