// src/stages/dns.rs

//! Raw DNS record collection with `dig`.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::events::JobLogger;
use crate::exec::{CommandSpec, RunMode, Tool};

use super::{Toolkit, normalize_host, pace};

/// Types queried one by one when `ANY` comes back empty.
pub const RECORD_TYPES: [&str; 6] = ["A", "AAAA", "MX", "NS", "TXT", "SOA"];

/// Collect answer lines for `target`.
///
/// An IPv4 target only gets a reverse lookup. Otherwise an `ANY` query is
/// tried first and, if it yields nothing, each of [`RECORD_TYPES`]. All
/// queries run in allow-failure mode. The result keeps first-seen order with
/// duplicates removed.
pub async fn collect_dns_records(kit: &Toolkit, target: &str, log: &JobLogger) -> Vec<String> {
    let Some(dig) = kit.locator.find(Tool::Dig) else {
        log.warn("dig not found; skipping DNS record collection");
        return Vec::new();
    };

    pace(kit.config.delays.dns).await;

    let target = normalize_host(target);
    let mut answers = Answers::default();

    if target.parse::<Ipv4Addr>().is_ok() {
        answers.query(kit, &dig, answer_args(["-x", target.as_str()]), log).await;
        return answers.records;
    }

    answers.query(kit, &dig, answer_args([target.as_str(), "ANY"]), log).await;

    if answers.records.is_empty() {
        for record_type in RECORD_TYPES {
            answers.query(kit, &dig, answer_args([target.as_str(), record_type]), log).await;
        }
    }

    answers.records
}

/// Answer lines in first-seen order.
#[derive(Default)]
struct Answers {
    records: Vec<String>,
    seen: HashSet<String>,
}

impl Answers {
    async fn query(&mut self, kit: &Toolkit, dig: &Path, args: Vec<String>, log: &JobLogger) {
        let spec = CommandSpec::new(dig, args, kit.config.timeouts.dns);
        // Allow-failure never returns Err.
        if let Ok(output) = kit.runner.run(&spec, RunMode::AllowFailure, log).await {
            for line in output.lines() {
                if self.seen.insert(line.to_string()) {
                    self.records.push(line.to_string());
                }
            }
        }
    }
}

fn answer_args<'a>(head: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    head.into_iter()
        .chain(["+noall", "+answer"])
        .map(str::to_string)
        .collect()
}
