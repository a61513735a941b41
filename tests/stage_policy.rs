// tests/stage_policy.rs

use proptest::prelude::*;
use reconpipe::engine::{Applicability, SkipReason, StagePolicy};
use reconpipe::types::{Profile, Stage, TargetType};

fn runs(policy: &StagePolicy, stage: Stage, tt: TargetType, profile: Profile) -> bool {
    policy.applicability(stage, tt, profile).runs()
}

#[test]
fn domain_standard_runs_everything() {
    let policy = StagePolicy::default();
    for stage in Stage::ALL {
        assert!(
            runs(&policy, stage, TargetType::Domain, Profile::StandardExternal),
            "{stage} should run"
        );
    }
}

#[test]
fn ip_targets_skip_enumeration_and_dns() {
    let policy = StagePolicy::default();
    let plan = policy.plan(TargetType::Ip, Profile::StandardExternal);

    let skipped: Vec<Stage> = plan
        .iter()
        .filter(|(_, a)| !a.runs())
        .map(|(s, _)| *s)
        .collect();
    assert_eq!(skipped, vec![Stage::Subdomains, Stage::DnsRecords]);
    assert_eq!(
        plan[0].1,
        Applicability::Skip(SkipReason::TargetType(TargetType::Ip))
    );
}

#[test]
fn stealth_and_osint_skip_directories() {
    let policy = StagePolicy::default();
    for profile in [Profile::Stealth, Profile::OsintHeavy] {
        assert_eq!(
            policy.applicability(Stage::Directories, TargetType::Domain, profile),
            Applicability::Skip(SkipReason::Profile(profile))
        );
        assert!(runs(&policy, Stage::HttpProbing, TargetType::Domain, profile));
    }
}

#[test]
fn custom_profile_uses_configured_skips() {
    let policy = StagePolicy::new(vec![Stage::DnsRecords, Stage::Directories]);

    assert!(!runs(&policy, Stage::DnsRecords, TargetType::Domain, Profile::Custom));
    assert!(!runs(&policy, Stage::Directories, TargetType::Domain, Profile::Custom));
    assert!(runs(&policy, Stage::Subdomains, TargetType::Domain, Profile::Custom));

    // The list only applies to the Custom profile.
    assert!(runs(&policy, Stage::DnsRecords, TargetType::Domain, Profile::StandardExternal));
}

#[test]
fn target_type_reason_wins_over_profile() {
    let policy = StagePolicy::new(vec![Stage::Subdomains]);
    assert_eq!(
        policy.applicability(Stage::Subdomains, TargetType::Ip, Profile::Custom),
        Applicability::Skip(SkipReason::TargetType(TargetType::Ip))
    );
}

#[test]
fn skip_reasons_render_for_the_activity_log() {
    assert_eq!(
        SkipReason::TargetType(TargetType::Cidr).to_string(),
        "not applicable to cidr targets"
    );
    assert_eq!(
        SkipReason::Profile(Profile::Stealth).to_string(),
        "disabled by the Stealth profile"
    );
}

fn target_type() -> impl Strategy<Value = TargetType> {
    prop::sample::select(TargetType::ALL.to_vec())
}

fn profile() -> impl Strategy<Value = Profile> {
    prop::sample::select(Profile::ALL.to_vec())
}

fn custom_skip() -> impl Strategy<Value = Vec<Stage>> {
    prop::sample::subsequence(Stage::ALL[..5].to_vec(), 0..=5)
}

proptest! {
    #[test]
    fn vuln_hints_always_runs(tt in target_type(), p in profile(), skip in custom_skip()) {
        let policy = StagePolicy::new(skip);
        prop_assert!(runs(&policy, Stage::VulnHints, tt, p));
    }

    #[test]
    fn cidr_and_org_run_only_vuln_hints(p in profile(), skip in custom_skip()) {
        let policy = StagePolicy::new(skip);
        for tt in [TargetType::Cidr, TargetType::OrgName] {
            let running: Vec<Stage> = policy
                .plan(tt, p)
                .into_iter()
                .filter(|(_, a)| a.runs())
                .map(|(s, _)| s)
                .collect();
            prop_assert_eq!(running, vec![Stage::VulnHints]);
        }
    }

    #[test]
    fn plan_is_in_pipeline_order(tt in target_type(), p in profile()) {
        let stages: Vec<Stage> = StagePolicy::default().plan(tt, p).into_iter().map(|(s, _)| s).collect();
        prop_assert_eq!(stages, Stage::ALL.to_vec());
    }
}
