#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use reconpipe::config::{Delays, Limits, ReconConfig, Timeouts};
use reconpipe::store::NewTarget;
use reconpipe::types::{Profile, Stage, TargetType};

/// Builder for `ReconConfig` tuned for fast tests: no pacing delays and no
/// system resolver fallback.
pub struct ConfigBuilder {
    config: ReconConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = ReconConfig::default();
        config.delays = Delays::none();
        config.system_resolver_fallback = false;
        Self { config }
    }

    pub fn limits(mut self, f: impl FnOnce(&mut Limits)) -> Self {
        f(&mut self.config.limits);
        self
    }

    pub fn timeouts(mut self, f: impl FnOnce(&mut Timeouts)) -> Self {
        f(&mut self.config.timeouts);
        self
    }

    pub fn all_timeouts(mut self, d: Duration) -> Self {
        self.config.timeouts = Timeouts {
            subdomain_tool: d,
            resolve: d,
            dns: d,
            httpx: d,
            curl: d,
            gobuster: d,
        };
        self
    }

    pub fn wordlist(mut self, path: &str) -> Self {
        self.config.tools.wordlist = PathBuf::from(path);
        self
    }

    pub fn custom_skip(mut self, stages: &[Stage]) -> Self {
        self.config.custom_skip = stages.to_vec();
        self
    }

    pub fn build(self) -> ReconConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NewTarget`.
pub struct TargetBuilder {
    target: NewTarget,
}

impl TargetBuilder {
    pub fn domain(value: &str) -> Self {
        Self::new(value, TargetType::Domain)
    }

    pub fn ip(value: &str) -> Self {
        Self::new(value, TargetType::Ip)
    }

    pub fn new(value: &str, target_type: TargetType) -> Self {
        Self {
            target: NewTarget {
                name: None,
                value: value.to_string(),
                target_type,
                profile: Profile::StandardExternal,
                tags: Vec::new(),
                notes: None,
            },
        }
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.target.profile = profile;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.target.name = Some(name.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.target.tags.push(tag.to_string());
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.target.notes = Some(notes.to_string());
        self
    }

    pub fn build(self) -> NewTarget {
        self.target
    }
}
