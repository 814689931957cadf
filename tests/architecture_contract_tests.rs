//! Architecture contract tests.

mod support;

use support::architecture::{find_lines_containing, find_non_export_lines_in_mod_files};

#[test]
fn domain_has_no_framework_or_outer_layer_imports() {
    let hits = find_lines_containing(
        "src/domain",
        &[
            "crate::adapter",
            "crate::infrastructure",
            "crate::app",
            "tokio::",
            "reqwest::",
        ],
    );
    assert!(hits.is_empty(), "found forbidden imports in domain layer: {hits:#?}");
}

#[test]
fn ports_depend_only_on_domain() {
    let hits = find_lines_containing(
        "src/port",
        &["crate::adapter", "crate::infrastructure", "crate::app", "reqwest::"],
    );
    assert!(hits.is_empty(), "ports should not import outer layers: {hits:#?}");
}

#[test]
fn pools_never_touch_concrete_adapters() {
    let hits = find_lines_containing(
        "src/infrastructure/pool",
        &["crate::adapter", "TcpStream", "reqwest::"],
    );
    assert!(hits.is_empty(), "pools must go through ports: {hits:#?}");
}

#[test]
fn mod_rs_is_export_only() {
    let violations: Vec<_> = ["src/domain", "src/port", "src/infrastructure", "src/adapter", "src/app"]
        .into_iter()
        .flat_map(find_non_export_lines_in_mod_files)
        .collect();
    assert!(
        violations.is_empty(),
        "found non-export content in mod.rs files: {violations:#?}"
    );
}
