// src/stages/vuln_hints.rs

//! Heuristic findings derived from persisted subdomains and services.
//!
//! No external process runs here; the output depends only on the rows passed
//! in.

use std::collections::HashSet;

use crate::store::{NewFinding, Service, Subdomain};
use crate::types::{HostStatus, Severity};

const PANEL_HOST_MARKERS: [&str; 3] = ["admin", "panel", "dashboard"];
const PANEL_PORTS: [u16; 3] = [8080, 8443, 9090];

pub const TAKEOVER: &str = "takeover";
pub const EXPOSED_PANEL: &str = "exposed-panel";

/// Dead subdomains become HIGH takeover hints; services on admin-looking
/// hosts or alternate admin ports become MEDIUM exposed-panel hints.
pub fn derive_findings(
    target_id: i64,
    job_id: &str,
    subdomains: &[Subdomain],
    services: &[Service],
) -> Vec<NewFinding> {
    let mut titles = HashSet::new();
    let mut findings = Vec::new();

    for sub in subdomains.iter().filter(|s| s.status == HostStatus::Dead) {
        let title = format!("Potential subdomain takeover: {}", sub.hostname);
        if titles.insert(title.clone()) {
            findings.push(NewFinding {
                target_id,
                job_id: job_id.to_string(),
                severity: Severity::High,
                finding_type: TAKEOVER.to_string(),
                title,
                host: Some(sub.hostname.clone()),
                description: "Subdomain appears to be dead and may be vulnerable to takeover".to_string(),
            });
        }
    }

    for svc in services.iter().filter(|s| looks_like_panel(s)) {
        let title = format!("Potential admin panel: {}:{}", svc.host, svc.port);
        if titles.insert(title.clone()) {
            findings.push(NewFinding {
                target_id,
                job_id: job_id.to_string(),
                severity: Severity::Medium,
                finding_type: EXPOSED_PANEL.to_string(),
                title,
                host: Some(svc.host.clone()),
                description: "Possible administrative interface exposed".to_string(),
            });
        }
    }

    findings
}

fn looks_like_panel(svc: &Service) -> bool {
    let host = svc.host.to_lowercase();
    PANEL_HOST_MARKERS.iter().any(|m| host.contains(m)) || PANEL_PORTS.contains(&svc.port)
}
