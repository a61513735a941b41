use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use reconpipe::errors::Result;
use reconpipe::store::{
    ActivityEntry, Directory, DnsRecord, Finding, JobRecord, NewDirectory, NewFinding, NewService,
    NewTarget, Service, SqliteStore, Store, Subdomain, Target,
};
use reconpipe::types::{FindingStatus, HostStatus, JobStatus, TargetStatus};

/// Called with the store method name before every delegated call. An `Err`
/// is returned to the caller instead of running the call.
pub type StoreHook = Box<dyn FnMut(&'static str) -> Result<()> + Send>;

/// A [`Store`] over [`SqliteStore`] that lets a test interleave work with,
/// or inject failures into, the pipeline's storage calls.
pub struct HookedStore {
    inner: Arc<SqliteStore>,
    hook: Mutex<Option<StoreHook>>,
}

impl HookedStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
        }
    }

    pub fn set_hook(&self, hook: impl FnMut(&'static str) -> Result<()> + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// The hook is taken out while it runs so it may call back into the store.
    fn before(&self, op: &'static str) -> Result<()> {
        let taken = self.hook.lock().unwrap().take();
        let Some(mut hook) = taken else {
            return Ok(());
        };
        let result = hook(op);
        let mut slot = self.hook.lock().unwrap();
        if slot.is_none() {
            *slot = Some(hook);
        }
        result
    }
}

impl Store for HookedStore {
    fn insert_target(&self, target: &NewTarget) -> Result<Target> {
        self.before("insert_target")?;
        self.inner.insert_target(target)
    }

    fn get_target(&self, id: i64) -> Result<Option<Target>> {
        self.before("get_target")?;
        self.inner.get_target(id)
    }

    fn find_target_by_value(&self, value: &str) -> Result<Option<Target>> {
        self.before("find_target_by_value")?;
        self.inner.find_target_by_value(value)
    }

    fn set_target_status(&self, id: i64, status: TargetStatus, last_run: Option<DateTime<Utc>>) -> Result<()> {
        self.before("set_target_status")?;
        self.inner.set_target_status(id, status, last_run)
    }

    fn insert_job(&self, job: &JobRecord) -> Result<()> {
        self.before("insert_job")?;
        self.inner.insert_job(job)
    }

    fn set_job_status(&self, job_id: &str, status: JobStatus, completed_at: Option<DateTime<Utc>>) -> Result<()> {
        self.before("set_job_status")?;
        self.inner.set_job_status(job_id, status, completed_at)
    }

    fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.before("get_job")?;
        self.inner.get_job(job_id)
    }

    fn upsert_subdomain(&self, target_id: i64, job_id: &str, hostname: &str, ip: Option<&str>) -> Result<bool> {
        self.before("upsert_subdomain")?;
        self.inner.upsert_subdomain(target_id, job_id, hostname, ip)
    }

    fn list_subdomains(&self, target_id: i64) -> Result<Vec<Subdomain>> {
        self.before("list_subdomains")?;
        self.inner.list_subdomains(target_id)
    }

    fn set_subdomain_status(&self, target_id: i64, hostname: &str, status: HostStatus) -> Result<()> {
        self.before("set_subdomain_status")?;
        self.inner.set_subdomain_status(target_id, hostname, status)
    }

    fn insert_dns_record(&self, target_id: i64, job_id: &str, record: &str) -> Result<()> {
        self.before("insert_dns_record")?;
        self.inner.insert_dns_record(target_id, job_id, record)
    }

    fn list_dns_records(&self, job_id: &str) -> Result<Vec<DnsRecord>> {
        self.before("list_dns_records")?;
        self.inner.list_dns_records(job_id)
    }

    fn insert_service(&self, service: &NewService) -> Result<()> {
        self.before("insert_service")?;
        self.inner.insert_service(service)
    }

    fn list_services(&self, target_id: i64) -> Result<Vec<Service>> {
        self.before("list_services")?;
        self.inner.list_services(target_id)
    }

    fn insert_directory(&self, dir: &NewDirectory) -> Result<()> {
        self.before("insert_directory")?;
        self.inner.insert_directory(dir)
    }

    fn list_directories(&self, job_id: &str) -> Result<Vec<Directory>> {
        self.before("list_directories")?;
        self.inner.list_directories(job_id)
    }

    fn insert_finding_if_absent(&self, finding: &NewFinding) -> Result<bool> {
        self.before("insert_finding_if_absent")?;
        self.inner.insert_finding_if_absent(finding)
    }

    fn list_findings(&self, target_id: i64) -> Result<Vec<Finding>> {
        self.before("list_findings")?;
        self.inner.list_findings(target_id)
    }

    fn set_finding_status(&self, id: i64, status: FindingStatus) -> Result<()> {
        self.before("set_finding_status")?;
        self.inner.set_finding_status(id, status)
    }

    // Activity writes bypass the hook so a failing hook cannot hide the log.
    fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.inner.append_activity(entry)
    }

    fn list_activity(&self, job_id: &str) -> Result<Vec<ActivityEntry>> {
        self.inner.list_activity(job_id)
    }
}
