// src/stages/resolve.rs

//! Forward resolution of discovered hostnames.

use std::net::{IpAddr, Ipv4Addr};

use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::debug;

use crate::events::JobLogger;
use crate::exec::{CommandSpec, RunMode, Tool};

use super::{Toolkit, normalize_host, pace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub hostname: String,
    pub ip: Option<String>,
}

/// Resolve each host to at most one address.
///
/// Literal addresses map to themselves. Every other host gets a single
/// `dig +short` lookup, or a system resolver lookup when `dig` is absent and
/// the fallback is enabled. Failures yield `ip: None`; hosts are never
/// dropped.
pub async fn resolve_hosts(kit: &Toolkit, hosts: &[String], log: &JobLogger) -> Vec<ResolvedHost> {
    let dig = kit.locator.find(Tool::Dig);
    if dig.is_none() && !hosts.is_empty() {
        if kit.config.system_resolver_fallback {
            log.warn("dig not found; using the system resolver for IP resolution");
        } else {
            log.warn("dig not found; skipping IP resolution");
        }
    }

    let mut out = Vec::with_capacity(hosts.len());
    for raw in hosts {
        let host = normalize_host(raw);

        if host.parse::<IpAddr>().is_ok() {
            out.push(ResolvedHost {
                hostname: host.clone(),
                ip: Some(host),
            });
            continue;
        }

        pace(kit.config.delays.resolve).await;

        let ip = match &dig {
            Some(program) => {
                let spec = CommandSpec::new(program.clone(), ["+short".to_string(), host.clone()], kit.config.timeouts.resolve);
                match kit.runner.run(&spec, RunMode::Strict, log).await {
                    Ok(output) => output
                        .lines()
                        .find(|line| line.parse::<Ipv4Addr>().is_ok())
                        .map(str::to_string),
                    Err(err) => {
                        debug!(host = %host, error = %err, "dig lookup failed");
                        None
                    }
                }
            }
            None if kit.config.system_resolver_fallback => system_lookup(&host, kit).await,
            None => None,
        };

        out.push(ResolvedHost { hostname: host, ip });
    }

    out
}

async fn system_lookup(host: &str, kit: &Toolkit) -> Option<String> {
    match timeout(kit.config.timeouts.resolve, lookup_host((host, 0))).await {
        Ok(Ok(mut addrs)) => addrs.next().map(|a| a.ip().to_string()),
        Ok(Err(e)) => {
            debug!(host, error = %e, "system resolver lookup failed");
            None
        }
        Err(_) => {
            debug!(host, "system resolver lookup timed out");
            None
        }
    }
}
