// src/config/validate.rs

use std::str::FromStr;
use std::time::Duration;

use crate::config::model::{Delays, RawReconConfig, ReconConfig, Timeouts};
use crate::errors::{ReconError, Result};
use crate::types::Stage;

impl TryFrom<RawReconConfig> for ReconConfig {
    type Error = ReconError;

    fn try_from(raw: RawReconConfig) -> std::result::Result<Self, Self::Error> {
        validate_limits(&raw)?;
        let delays = parse_delays(&raw)?;
        let timeouts = parse_timeouts(&raw)?;
        let custom_skip = parse_custom_skip(&raw)?;

        Ok(ReconConfig::new_unchecked(
            delays,
            raw.pipeline.system_resolver_fallback,
            raw.limits,
            timeouts,
            raw.tools,
            custom_skip,
        ))
    }
}

fn validate_limits(cfg: &RawReconConfig) -> Result<()> {
    let limits = &cfg.limits;
    let counts = [
        ("http_probe_hosts", limits.http_probe_hosts),
        ("dirfuzz_candidates", limits.dirfuzz_candidates),
        ("dirfuzz_hosts", limits.dirfuzz_hosts),
        ("dirfuzz_max_lines", limits.dirfuzz_max_lines),
        ("log_output_chars", limits.log_output_chars),
    ];
    for (name, value) in counts {
        if value == 0 {
            return Err(ReconError::Config(format!(
                "[limits].{name} must be >= 1 (got 0)"
            )));
        }
    }

    if limits.max_output_bytes < 1024 {
        return Err(ReconError::Config(format!(
            "[limits].max_output_bytes must be >= 1024 (got {})",
            limits.max_output_bytes
        )));
    }

    Ok(())
}

fn parse_delays(cfg: &RawReconConfig) -> Result<Delays> {
    let p = &cfg.pipeline;
    Ok(Delays {
        subdomain: field_duration("pipeline", "subdomain_delay", &p.subdomain_delay)?,
        resolve: field_duration("pipeline", "resolve_delay", &p.resolve_delay)?,
        dns: field_duration("pipeline", "dns_delay", &p.dns_delay)?,
        http: field_duration("pipeline", "http_delay", &p.http_delay)?,
        dirfuzz: field_duration("pipeline", "dirfuzz_delay", &p.dirfuzz_delay)?,
    })
}

fn parse_timeouts(cfg: &RawReconConfig) -> Result<Timeouts> {
    let t = &cfg.timeouts;
    let timeouts = Timeouts {
        subdomain_tool: field_duration("timeouts", "subdomain_tool", &t.subdomain_tool)?,
        resolve: field_duration("timeouts", "resolve", &t.resolve)?,
        dns: field_duration("timeouts", "dns", &t.dns)?,
        httpx: field_duration("timeouts", "httpx", &t.httpx)?,
        curl: field_duration("timeouts", "curl", &t.curl)?,
        gobuster: field_duration("timeouts", "gobuster", &t.gobuster)?,
    };

    let all = [
        ("subdomain_tool", timeouts.subdomain_tool),
        ("resolve", timeouts.resolve),
        ("dns", timeouts.dns),
        ("httpx", timeouts.httpx),
        ("curl", timeouts.curl),
        ("gobuster", timeouts.gobuster),
    ];
    for (name, value) in all {
        if value.is_zero() {
            return Err(ReconError::Config(format!(
                "[timeouts].{name} must be greater than zero"
            )));
        }
    }

    Ok(timeouts)
}

fn parse_custom_skip(cfg: &RawReconConfig) -> Result<Vec<Stage>> {
    let mut stages = Vec::new();
    for name in cfg.profile.custom.skip.iter() {
        let stage = Stage::from_str(name).map_err(|e| {
            ReconError::Config(format!("[profile.custom].skip: {e}"))
        })?;
        if stage == Stage::VulnHints {
            return Err(ReconError::Config(
                "[profile.custom].skip: the Vulnerability hints stage always runs".to_string(),
            ));
        }
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    Ok(stages)
}

fn field_duration(section: &str, field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| ReconError::Config(format!("[{section}].{field}: {e}")))
}

/// Parse a duration like `"500ms"`, `"2s"`, `"1m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
