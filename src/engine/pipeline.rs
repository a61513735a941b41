// src/engine/pipeline.rs

//! The per-job worker: walks the stages in order around a [`JobState`].
//!
//! State transitions and the events that announce them happen together under
//! the job lock; executors, pacing sleeps and activity logging run outside
//! it. A stage's results are persisted before its `done` event is published.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{ReconError, Result};
use crate::events::{EventSink, ReconEvent};
use crate::stages::{
    DirectoryHit, Enumeration, ProbeResult, ResolvedHost, Toolkit, collect_dns_records, derive_findings,
    enumerate_subdomains, fuzz_directories, has_http_prober, normalize_host, probe_hosts, resolve_hosts,
};
use crate::store::{NewDirectory, NewFinding, NewService, Store};
use crate::types::{HostStatus, JobStatus, Stage, StageStatus, TargetStatus, TargetType};

use super::job::{Boundary, LiveJob};
use super::policy::{Applicability, SkipReason, StagePolicy};
use super::registry::JobRegistry;

/// Ports treated as web services when picking hosts to probe.
const WEB_PORTS: [u16; 4] = [80, 443, 8080, 8443];
/// Ports whose hosts are fuzz candidates.
const FUZZ_PORTS: [u16; 2] = [80, 443];

/// How a worker run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished,
    Halted,
}

/// Typed output of one stage, before persistence.
#[derive(Debug)]
enum StageResults {
    Subdomains {
        hosts: Vec<ResolvedHost>,
        rejected: usize,
    },
    DnsRecords(Vec<String>),
    LiveHosts {
        probed: Vec<String>,
        live: Vec<ProbeResult>,
        not_probed: usize,
    },
    HttpServices(Vec<ProbeResult>),
    Directories(Vec<DirectoryHit>),
    Findings(Vec<NewFinding>),
}

/// Row count for the `done` event plus an optional warning line.
#[derive(Debug, Default)]
struct StageSummary {
    count: usize,
    warning: Option<String>,
}

/// Shared, job-independent dependencies of every worker.
pub(crate) struct Pipeline {
    pub(crate) kit: Toolkit,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) policy: StagePolicy,
}

impl Pipeline {
    /// Spawn a worker for `job` on the current Tokio runtime.
    pub(crate) fn spawn(self: &Arc<Self>, job: Arc<LiveJob>) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(job).await })
    }

    async fn run(&self, job: Arc<LiveJob>) {
        let job_id = job.job_id().to_string();
        debug!(job_id = %job_id, "pipeline worker started");

        match self.drive(&job).await {
            Ok(Outcome::Finished) => self.complete(&job),
            Ok(Outcome::Halted) => debug!(job_id = %job_id, "pipeline worker halted at boundary"),
            Err(err) => self.fail(&job, err),
        }
    }

    async fn drive(&self, job: &LiveJob) -> Result<Outcome> {
        let target = job.target();
        let profile = job.with(|s| s.profile());

        for stage in Stage::ALL {
            if job.with(|s| s.enter_boundary()) == Boundary::Halt {
                return Ok(Outcome::Halted);
            }
            if job.with(|s| s.stage_status(stage).is_finished()) {
                continue;
            }

            match self.policy.applicability(stage, target.target_type, profile) {
                Applicability::Skip(reason) => {
                    if !self.skip_stage(job, stage, reason)? {
                        return Ok(Outcome::Halted);
                    }
                }
                Applicability::Run => {
                    if !self.run_stage(job, stage).await? {
                        return Ok(Outcome::Halted);
                    }
                }
            }
        }

        Ok(Outcome::Finished)
    }

    fn publish_stage(&self, job: &LiveJob, stage: Stage, status: StageStatus, count: Option<usize>) {
        self.events.publish(ReconEvent::StageUpdate {
            job_id: job.job_id().to_string(),
            stage,
            status,
            count,
        });
    }

    fn skip_stage(&self, job: &LiveJob, stage: Stage, reason: SkipReason) -> Result<bool> {
        let target = job.target();

        // An IP target is its own (and only) host.
        if stage == Stage::Subdomains && target.target_type == TargetType::Ip {
            let host = normalize_host(&target.value);
            self.store.upsert_subdomain(target.id, job.job_id(), &host, Some(&host))?;
        }

        let skipped = job.with(|s| {
            if !s.mark_skipped(stage) {
                return false;
            }
            self.publish_stage(job, stage, StageStatus::Skipped, Some(0));
            true
        });

        if skipped {
            job.log().info(format!("Skipping {stage}: {reason}"));
        }
        Ok(skipped)
    }

    async fn run_stage(&self, job: &LiveJob, stage: Stage) -> Result<bool> {
        let started = job.with(|s| {
            if !s.mark_running(stage) {
                return false;
            }
            self.publish_stage(job, stage, StageStatus::Running, None);
            true
        });
        if !started {
            return Ok(false);
        }

        job.log().info(format!("Starting stage: {stage}"));
        info!(job_id = job.job_id(), stage = %stage, "stage started");

        let results = self.collect(job, stage).await?;
        let summary = self.persist(job, results)?;

        let done = job.with(|s| {
            if !s.mark_done(stage, summary.count) {
                return false;
            }
            self.publish_stage(job, stage, StageStatus::Done, Some(summary.count));
            true
        });
        if !done {
            debug!(job_id = job.job_id(), stage = %stage, "job left running during stage");
            return Ok(false);
        }

        job.log().info(format!("{stage} completed: {} result(s)", summary.count));
        if let Some(warning) = summary.warning {
            job.log().warn(warning);
        }
        info!(job_id = job.job_id(), stage = %stage, count = summary.count, "stage done");
        Ok(true)
    }

    async fn collect(&self, job: &LiveJob, stage: Stage) -> Result<StageResults> {
        let kit = &self.kit;
        let target = job.target();
        let log = job.log();

        let results = match stage {
            Stage::Subdomains => {
                let Enumeration { mut hosts, rejected } = enumerate_subdomains(kit, &target.value, log).await;
                if hosts.is_empty() {
                    let seed = normalize_host(&target.value);
                    log.warn(format!("No subdomains discovered; using {seed} as the only host"));
                    hosts.push(seed);
                }
                StageResults::Subdomains {
                    hosts: resolve_hosts(kit, &hosts, log).await,
                    rejected,
                }
            }
            Stage::DnsRecords => StageResults::DnsRecords(collect_dns_records(kit, &target.value, log).await),
            Stage::LiveHosts => {
                let hosts = self.live_host_candidates(job)?;
                let cap = kit.config.limits.http_probe_hosts;
                let probed: Vec<String> = hosts.iter().take(cap).cloned().collect();
                let live = probe_hosts(kit, &probed, log).await;
                let not_probed = hosts.len() - probed.len();
                // Without a prober nothing was checked; statuses stay as they are.
                let probed = if has_http_prober(kit) { probed } else { Vec::new() };
                StageResults::LiveHosts {
                    probed,
                    live,
                    not_probed,
                }
            }
            Stage::HttpProbing => {
                let hosts = self.http_candidates(target.id)?;
                StageResults::HttpServices(probe_hosts(kit, &hosts, log).await)
            }
            Stage::Directories => {
                let hosts = self.fuzz_candidates(target.id)?;
                StageResults::Directories(fuzz_directories(kit, &hosts, log).await)
            }
            Stage::VulnHints => {
                let subdomains = self.store.list_subdomains(target.id)?;
                let services = self.store.list_services(target.id)?;
                StageResults::Findings(derive_findings(target.id, job.job_id(), &subdomains, &services))
            }
        };

        Ok(results)
    }

    fn persist(&self, job: &LiveJob, results: StageResults) -> Result<StageSummary> {
        let store = &self.store;
        let target_id = job.target().id;
        let job_id = job.job_id();

        let summary = match results {
            StageResults::Subdomains { hosts, rejected } => {
                for host in &hosts {
                    store.upsert_subdomain(target_id, job_id, &host.hostname, host.ip.as_deref())?;
                }
                let unresolved = hosts.iter().filter(|h| h.ip.is_none()).count();
                let mut notes = Vec::new();
                if rejected > 0 {
                    notes.push(format!("{rejected} candidate line(s) were invalid or out of scope"));
                }
                if unresolved > 0 {
                    notes.push(format!("{unresolved} of {} hosts could not be resolved", hosts.len()));
                }
                StageSummary {
                    count: hosts.len(),
                    warning: (!notes.is_empty()).then(|| notes.join("; ")),
                }
            }
            StageResults::DnsRecords(records) => {
                for record in &records {
                    store.insert_dns_record(target_id, job_id, record)?;
                }
                StageSummary {
                    count: records.len(),
                    warning: None,
                }
            }
            StageResults::LiveHosts {
                probed,
                live,
                not_probed,
            } => {
                let live_hosts: HashSet<&str> = live.iter().map(|p| p.host.as_str()).collect();
                for host in &probed {
                    let status = if live_hosts.contains(normalize_host(host).as_str()) {
                        HostStatus::Live
                    } else {
                        HostStatus::Dead
                    };
                    store.set_subdomain_status(target_id, host, status)?;
                }
                StageSummary {
                    count: live_hosts.len(),
                    warning: (not_probed > 0).then(|| {
                        format!(
                            "{not_probed} hosts were not probed (limit {})",
                            self.kit.config.limits.http_probe_hosts
                        )
                    }),
                }
            }
            StageResults::HttpServices(probes) => {
                let ips: HashMap<String, Option<String>> = store
                    .list_subdomains(target_id)?
                    .into_iter()
                    .map(|s| (s.hostname, s.ip))
                    .collect();
                for probe in &probes {
                    let ip = ips
                        .get(&probe.host)
                        .cloned()
                        .flatten()
                        .unwrap_or_else(|| probe.host.clone());
                    store.insert_service(&NewService {
                        target_id,
                        job_id: job_id.to_string(),
                        host: probe.host.clone(),
                        ip,
                        port: probe.scheme.default_port(),
                        protocol: probe.scheme.as_str().to_string(),
                        service_name: Some(probe.scheme.as_str().to_string()),
                        http_status: probe.status,
                        technology: None,
                        notes: None,
                    })?;
                }
                StageSummary {
                    count: probes.len(),
                    warning: None,
                }
            }
            StageResults::Directories(hits) => {
                for hit in &hits {
                    store.insert_directory(&NewDirectory {
                        target_id,
                        job_id: job_id.to_string(),
                        host: hit.host.clone(),
                        path: hit.path.clone(),
                        status: hit.status,
                    })?;
                }
                StageSummary {
                    count: hits.len(),
                    warning: None,
                }
            }
            StageResults::Findings(findings) => {
                let mut inserted = 0;
                for finding in &findings {
                    if store.insert_finding_if_absent(finding)? {
                        inserted += 1;
                    }
                }
                if inserted < findings.len() {
                    debug!(job_id, skipped = findings.len() - inserted, "findings already recorded");
                }
                StageSummary {
                    count: inserted,
                    warning: None,
                }
            }
        };

        Ok(summary)
    }

    /// Hosts for the Live hosts stage: the bare target for IP targets,
    /// otherwise every recorded subdomain.
    fn live_host_candidates(&self, job: &LiveJob) -> Result<Vec<String>> {
        let target = job.target();
        if target.target_type == TargetType::Ip {
            let host = normalize_host(&target.value);
            self.store.upsert_subdomain(target.id, job.job_id(), &host, Some(&host))?;
            return Ok(vec![host]);
        }
        Ok(self
            .store
            .list_subdomains(target.id)?
            .into_iter()
            .map(|s| s.hostname)
            .collect())
    }

    fn live_subdomains(&self, target_id: i64) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_subdomains(target_id)?
            .into_iter()
            .filter(|s| s.status == HostStatus::Live)
            .map(|s| s.hostname)
            .collect())
    }

    /// Hosts of known web services, falling back to live hosts.
    fn http_candidates(&self, target_id: i64) -> Result<Vec<String>> {
        let hosts = self.service_hosts(target_id, &WEB_PORTS)?;
        if !hosts.is_empty() {
            return Ok(hosts);
        }
        self.live_subdomains(target_id)
    }

    fn fuzz_candidates(&self, target_id: i64) -> Result<Vec<String>> {
        let limit = self.kit.config.limits.dirfuzz_candidates;
        let mut hosts = self.service_hosts(target_id, &FUZZ_PORTS)?;
        if hosts.is_empty() {
            hosts = self.live_subdomains(target_id)?;
        }
        hosts.truncate(limit);
        Ok(hosts)
    }

    /// Distinct service hosts on `ports`, in discovery order.
    fn service_hosts(&self, target_id: i64, ports: &[u16]) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        Ok(self
            .store
            .list_services(target_id)?
            .into_iter()
            .filter(|s| ports.contains(&s.port))
            .filter(|s| seen.insert(s.host.clone()))
            .map(|s| s.host)
            .collect())
    }

    fn complete(&self, job: &LiveJob) {
        if !job.with(|s| s.complete()) {
            return;
        }
        let job_id = job.job_id();
        let target = job.target();

        let persisted = self
            .store
            .set_job_status(job_id, JobStatus::Completed, Some(Utc::now()))
            .and_then(|()| self.store.set_target_status(target.id, TargetStatus::Completed, None));
        if let Err(err) = persisted {
            warn!(job_id, error = %err, "failed to persist job completion");
        }

        job.log().success("Reconnaissance job completed successfully");
        self.registry.unregister(job_id);
        self.events.publish(ReconEvent::JobComplete {
            job_id: job_id.to_string(),
        });
        info!(job_id, "job completed");
    }

    fn fail(&self, job: &LiveJob, err: ReconError) {
        if !job.with(|s| s.fail()) {
            debug!(job_id = job.job_id(), error = %err, "error after job already ended");
            return;
        }
        let job_id = job.job_id();
        let target = job.target();
        let message = err.to_string();

        let persisted = self
            .store
            .set_job_status(job_id, JobStatus::Failed, Some(Utc::now()))
            .and_then(|()| self.store.set_target_status(target.id, TargetStatus::Failed, None));
        if let Err(store_err) = persisted {
            warn!(job_id, error = %store_err, "failed to persist job failure");
        }

        job.log().error(format!("Error: {message}"));
        self.registry.unregister(job_id);
        self.events.publish(ReconEvent::JobError {
            job_id: job_id.to_string(),
            error: message,
        });
        warn!(job_id, "job failed");
    }
}
