// src/engine/policy.rs

//! Stage applicability: which stages run for a target type and profile.
//!
//! Pure and synchronous; the pipeline consults it at every stage boundary.

use std::fmt;

use crate::types::{Profile, Stage, TargetType};

/// Why a stage is not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TargetType(TargetType),
    Profile(Profile),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TargetType(t) => write!(f, "not applicable to {t} targets"),
            SkipReason::Profile(p) => write!(f, "disabled by the {p} profile"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Run,
    Skip(SkipReason),
}

impl Applicability {
    pub fn runs(&self) -> bool {
        matches!(self, Applicability::Run)
    }
}

/// Applicability table plus the stages the Custom profile turns off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagePolicy {
    custom_skip: Vec<Stage>,
}

impl StagePolicy {
    pub fn new(custom_skip: Vec<Stage>) -> Self {
        Self { custom_skip }
    }

    pub fn applicability(&self, stage: Stage, target_type: TargetType, profile: Profile) -> Applicability {
        use Applicability::{Run, Skip};

        if stage == Stage::VulnHints {
            return Run;
        }

        match (target_type, stage) {
            (TargetType::Cidr | TargetType::OrgName, _) => {
                return Skip(SkipReason::TargetType(target_type));
            }
            (TargetType::Ip, Stage::Subdomains | Stage::DnsRecords) => {
                return Skip(SkipReason::TargetType(target_type));
            }
            _ => {}
        }

        match profile {
            Profile::Stealth | Profile::OsintHeavy if stage == Stage::Directories => {
                Skip(SkipReason::Profile(profile))
            }
            Profile::Custom if self.custom_skip.contains(&stage) => Skip(SkipReason::Profile(profile)),
            _ => Run,
        }
    }

    /// Dry run over every stage in pipeline order.
    pub fn plan(&self, target_type: TargetType, profile: Profile) -> Vec<(Stage, Applicability)> {
        Stage::ALL
            .iter()
            .map(|stage| (*stage, self.applicability(*stage, target_type, profile)))
            .collect()
    }
}
