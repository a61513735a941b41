// tests/host_validation.rs

use proptest::prelude::*;
use reconpipe::stages::{is_valid_subdomain, normalize_host, normalize_target};
use reconpipe::stages::{parse_gobuster_line, parse_httpx_line, Scheme};

#[test]
fn accepts_root_and_children() {
    assert!(is_valid_subdomain("example.com", "example.com"));
    assert!(is_valid_subdomain("a.example.com", "example.com"));
    assert!(is_valid_subdomain("deep.er.example.com", "example.com"));
    assert!(is_valid_subdomain("_dmarc.example.com", "example.com"));
    assert!(is_valid_subdomain("API.Example.COM", "example.com"));
}

#[test]
fn rejects_lookalikes_and_garbage() {
    assert!(!is_valid_subdomain("badexample.com", "example.com"));
    assert!(!is_valid_subdomain("example.com.evil.net", "example.com"));
    assert!(!is_valid_subdomain("", "example.com"));
    assert!(!is_valid_subdomain("a..example.com", "example.com"));
    assert!(!is_valid_subdomain(".example.com", "example.com"));
    assert!(!is_valid_subdomain("a.example.com.", "example.com"));
    assert!(!is_valid_subdomain("a example.com", "example.com"));
    assert!(!is_valid_subdomain("a/b.example.com", "example.com"));
    assert!(!is_valid_subdomain("*.example.com", "example.com"));
    assert!(!is_valid_subdomain("a.*.example.com", "example.com"));
    assert!(!is_valid_subdomain("[INF] Loading provider config", "example.com"));
}

#[test]
fn rejects_names_over_253_characters() {
    let label = "a".repeat(60);
    let long = format!("{label}.{label}.{label}.{label}.example.com");
    assert!(long.len() > 253);
    assert!(!is_valid_subdomain(&long, "example.com"));
}

#[test]
fn normalize_strips_scheme_path_and_trailing_dot() {
    assert_eq!(normalize_target("https://Example.com/login?x=1"), "Example.com");
    assert_eq!(normalize_target("http://example.com#top"), "example.com");
    assert_eq!(normalize_target("  example.com.  "), "example.com");
    assert_eq!(normalize_target("10.0.0.1"), "10.0.0.1");
    assert_eq!(normalize_host("HTTPS://WWW.Example.com/"), "www.example.com");
}

#[test]
fn httpx_lines() {
    assert_eq!(
        parse_httpx_line("https://a.example.com [200]"),
        Some((Scheme::Https, Some(200)))
    );
    assert_eq!(
        parse_httpx_line("http://a.example.com [301] [Moved]"),
        Some((Scheme::Http, Some(301)))
    );
    assert_eq!(parse_httpx_line("https://a.example.com"), Some((Scheme::Https, None)));
    assert_eq!(parse_httpx_line("a.example.com [200]"), None);
}

#[test]
fn gobuster_lines() {
    assert_eq!(
        parse_gobuster_line("/admin                (Status: 301) [Size: 0]"),
        Some(("/admin".to_string(), 301))
    );
    assert_eq!(
        parse_gobuster_line("/index.html (Status:200)"),
        Some(("/index.html".to_string(), 200))
    );
    assert_eq!(parse_gobuster_line("Progress: 100 / 4614"), None);
}

fn label() -> impl Strategy<Value = String> {
    "[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?"
}

proptest! {
    #[test]
    fn generated_children_are_valid(labels in prop::collection::vec(label(), 1..4)) {
        let host = format!("{}.example.com", labels.join("."));
        prop_assert!(is_valid_subdomain(&host, "example.com"));
    }

    #[test]
    fn other_roots_are_never_valid(l in label(), tld in "(net|org|io)") {
        let host = format!("{l}.example.{tld}");
        prop_assert!(!is_valid_subdomain(&host, "example.com"));
    }

    #[test]
    fn normalize_host_is_idempotent(host in "[A-Za-z0-9.-]{1,30}") {
        let once = normalize_host(&host);
        prop_assert_eq!(normalize_host(&once), once);
    }
}
