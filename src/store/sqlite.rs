// src/store/sqlite.rs

//! SQLite-backed [`Store`].

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::errors::{ReconError, Result};
use crate::types::{FindingStatus, HostStatus, JobStatus, TargetStatus};

use super::Store;
use super::models::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    target TEXT NOT NULL UNIQUE,
    type TEXT NOT NULL,
    profile TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Pending',
    tags TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    last_run TEXT
);

CREATE TABLE IF NOT EXISTS recon_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL UNIQUE,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    profile TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'running',
    started_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS subdomains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    job_id TEXT NOT NULL,
    subdomain TEXT NOT NULL,
    ip TEXT,
    status TEXT NOT NULL DEFAULT 'UNKNOWN',
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    UNIQUE(target_id, subdomain)
);

CREATE TABLE IF NOT EXISTS dns_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    job_id TEXT NOT NULL,
    record TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    job_id TEXT NOT NULL,
    host TEXT NOT NULL,
    ip TEXT NOT NULL,
    port INTEGER NOT NULL,
    protocol TEXT NOT NULL,
    service_name TEXT,
    http_status INTEGER,
    technology TEXT,
    notes TEXT,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS directories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    job_id TEXT NOT NULL,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    status INTEGER NOT NULL,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    job_id TEXT NOT NULL,
    severity TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    host TEXT,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Open',
    first_seen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    message TEXT NOT NULL,
    level TEXT NOT NULL DEFAULT 'info',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subdomains_target ON subdomains(target_id);
CREATE INDEX IF NOT EXISTS idx_services_target ON services(target_id);
CREATE INDEX IF NOT EXISTS idx_findings_target ON findings(target_id);
CREATE INDEX IF NOT EXISTS idx_dns_job ON dns_records(job_id);
CREATE INDEX IF NOT EXISTS idx_directories_job ON directories(job_id);
CREATE INDEX IF NOT EXISTS idx_activity_job ON activity_logs(job_id);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => parse_time(row, idx).map(Some),
    }
}

const TARGET_COLUMNS: &str = "id, name, target, type, profile, status, tags, notes, created_at, last_run";

/// Tags are stored as one comma-separated column.
fn join_tags(tags: &[String]) -> Option<String> {
    let joined = split_tags(&tags.join(",")).join(",");
    (!joined.is_empty()).then_some(joined)
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn target_from_row(row: &Row<'_>) -> rusqlite::Result<Target> {
    Ok(Target {
        id: row.get(0)?,
        name: row.get(1)?,
        value: row.get(2)?,
        target_type: parse_enum(row, 3)?,
        profile: parse_enum(row, 4)?,
        status: parse_enum(row, 5)?,
        tags: row
            .get::<_, Option<String>>(6)?
            .map(|raw| split_tags(&raw))
            .unwrap_or_default(),
        notes: row.get(7)?,
        created_at: parse_time(row, 8)?,
        last_run: parse_opt_time(row, 9)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        job_id: row.get(0)?,
        target_id: row.get(1)?,
        profile: parse_enum(row, 2)?,
        status: parse_enum(row, 3)?,
        started_at: parse_time(row, 4)?,
        completed_at: parse_opt_time(row, 5)?,
    })
}

impl Store for SqliteStore {
    fn insert_target(&self, target: &NewTarget) -> Result<Target> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO targets (name, target, type, profile, status, tags, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                target.name.as_deref().unwrap_or(target.value.as_str()),
                target.value,
                target.target_type.as_str(),
                target.profile.as_str(),
                TargetStatus::Pending.as_str(),
                join_tags(&target.tags),
                target.notes,
                now(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        let row = conn.query_row(
            &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"),
            params![id],
            target_from_row,
        )?;
        Ok(row)
    }

    fn get_target(&self, id: i64) -> Result<Option<Target>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"),
                params![id],
                target_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn find_target_by_value(&self, value: &str) -> Result<Option<Target>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE target = ?1"),
                params![value],
                target_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn set_target_status(&self, id: i64, status: TargetStatus, last_run: Option<DateTime<Utc>>) -> Result<()> {
        let conn = self.conn();
        let changed = match last_run {
            Some(at) => conn.execute(
                "UPDATE targets SET status = ?1, last_run = ?2 WHERE id = ?3",
                params![status.as_str(), at.to_rfc3339(), id],
            )?,
            None => conn.execute(
                "UPDATE targets SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?,
        };
        if changed == 0 {
            return Err(ReconError::TargetNotFound(id));
        }
        Ok(())
    }

    fn insert_job(&self, job: &JobRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO recon_jobs (job_id, target_id, profile, status, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job.job_id,
                job.target_id,
                job.profile.as_str(),
                job.status.as_str(),
                job.started_at.to_rfc3339(),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn set_job_status(&self, job_id: &str, status: JobStatus, completed_at: Option<DateTime<Utc>>) -> Result<()> {
        self.conn().execute(
            "UPDATE recon_jobs SET status = ?1, completed_at = COALESCE(?2, completed_at) WHERE job_id = ?3",
            params![status.as_str(), completed_at.map(|t| t.to_rfc3339()), job_id],
        )?;
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT job_id, target_id, profile, status, started_at, completed_at
                 FROM recon_jobs WHERE job_id = ?1",
                params![job_id],
                job_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn upsert_subdomain(&self, target_id: i64, job_id: &str, hostname: &str, ip: Option<&str>) -> Result<bool> {
        let conn = self.conn();
        let stamp = now();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM subdomains WHERE target_id = ?1 AND subdomain = ?2",
                params![target_id, hostname],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE subdomains SET ip = COALESCE(?1, ip), job_id = ?2, last_seen = ?3 WHERE id = ?4",
                    params![ip, job_id, stamp, id],
                )?;
                Ok(false)
            }
            None => {
                conn.execute(
                    "INSERT INTO subdomains (target_id, job_id, subdomain, ip, status, first_seen, last_seen)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![target_id, job_id, hostname, ip, HostStatus::Unknown.as_str(), stamp],
                )?;
                Ok(true)
            }
        }
    }

    fn list_subdomains(&self, target_id: i64) -> Result<Vec<Subdomain>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, job_id, subdomain, ip, status, first_seen, last_seen
             FROM subdomains WHERE target_id = ?1 ORDER BY subdomain",
        )?;
        let rows = stmt
            .query_map(params![target_id], |row| {
                Ok(Subdomain {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    job_id: row.get(2)?,
                    hostname: row.get(3)?,
                    ip: row.get(4)?,
                    status: parse_enum(row, 5)?,
                    first_seen: parse_time(row, 6)?,
                    last_seen: parse_time(row, 7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn set_subdomain_status(&self, target_id: i64, hostname: &str, status: HostStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE subdomains SET status = ?1, last_seen = ?2 WHERE target_id = ?3 AND subdomain = ?4",
            params![status.as_str(), now(), target_id, hostname],
        )?;
        Ok(())
    }

    fn insert_dns_record(&self, target_id: i64, job_id: &str, record: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO dns_records (target_id, job_id, record, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![target_id, job_id, record, now()],
        )?;
        Ok(())
    }

    fn list_dns_records(&self, job_id: &str) -> Result<Vec<DnsRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, job_id, record FROM dns_records WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok(DnsRecord {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    job_id: row.get(2)?,
                    record: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_service(&self, service: &NewService) -> Result<()> {
        self.conn().execute(
            "INSERT INTO services
                 (target_id, job_id, host, ip, port, protocol, service_name, http_status, technology, notes, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                service.target_id,
                service.job_id,
                service.host,
                service.ip,
                service.port,
                service.protocol,
                service.service_name,
                service.http_status,
                service.technology,
                service.notes,
                now(),
            ],
        )?;
        Ok(())
    }

    fn list_services(&self, target_id: i64) -> Result<Vec<Service>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, job_id, host, ip, port, protocol, service_name, http_status,
                    technology, notes, discovered_at
             FROM services WHERE target_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![target_id], |row| {
                Ok(Service {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    job_id: row.get(2)?,
                    host: row.get(3)?,
                    ip: row.get(4)?,
                    port: row.get(5)?,
                    protocol: row.get(6)?,
                    service_name: row.get(7)?,
                    http_status: row.get(8)?,
                    technology: row.get(9)?,
                    notes: row.get(10)?,
                    discovered_at: parse_time(row, 11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_directory(&self, dir: &NewDirectory) -> Result<()> {
        self.conn().execute(
            "INSERT INTO directories (target_id, job_id, host, path, status, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![dir.target_id, dir.job_id, dir.host, dir.path, dir.status, now()],
        )?;
        Ok(())
    }

    fn list_directories(&self, job_id: &str) -> Result<Vec<Directory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, job_id, host, path, status FROM directories WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok(Directory {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    job_id: row.get(2)?,
                    host: row.get(3)?,
                    path: row.get(4)?,
                    status: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_finding_if_absent(&self, finding: &NewFinding) -> Result<bool> {
        let conn = self.conn();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM findings
                 WHERE target_id = ?1 AND type = ?2 AND title = ?3 AND host IS ?4",
                params![finding.target_id, finding.finding_type, finding.title, finding.host],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO findings (target_id, job_id, severity, type, title, host, description, status, first_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                finding.target_id,
                finding.job_id,
                finding.severity.as_str(),
                finding.finding_type,
                finding.title,
                finding.host,
                finding.description,
                FindingStatus::Open.as_str(),
                now(),
            ],
        )?;
        Ok(true)
    }

    fn list_findings(&self, target_id: i64) -> Result<Vec<Finding>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, job_id, severity, type, title, host, description, status, first_seen
             FROM findings WHERE target_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![target_id], |row| {
                Ok(Finding {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    job_id: row.get(2)?,
                    severity: parse_enum(row, 3)?,
                    finding_type: row.get(4)?,
                    title: row.get(5)?,
                    host: row.get(6)?,
                    description: row.get(7)?,
                    status: parse_enum(row, 8)?,
                    first_seen: parse_time(row, 9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn set_finding_status(&self, id: i64, status: FindingStatus) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE findings SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(ReconError::InvalidInput(format!("finding {id} does not exist")));
        }
        Ok(())
    }

    fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO activity_logs (job_id, message, level, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![entry.job_id, entry.message, entry.level.as_str(), entry.timestamp.to_rfc3339()],
        )?;
        Ok(())
    }

    fn list_activity(&self, job_id: &str) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT job_id, level, message, created_at FROM activity_logs WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok(ActivityEntry {
                    job_id: row.get(0)?,
                    level: parse_enum(row, 1)?,
                    message: row.get(2)?,
                    timestamp: parse_time(row, 3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
