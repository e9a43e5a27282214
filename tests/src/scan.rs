//! End-to-end engine tests: a full pipeline run against the scripted
//! protocol client, checking output lines and completion behavior.

use std::sync::Arc;
use std::time::Duration;

use snmpr_common::config::{ScanConfig, SnmpVersion};
use snmpr_common::network::range::parse_cidr;
use snmpr_core::scanner::{self, ScanSummary};
use snmpr_protocols::snmp::Binding;

use crate::stub::{StubClient, VecSink};

fn config(concurrency: usize, verbose: bool) -> ScanConfig {
    ScanConfig::new(SnmpVersion::V2c, "public", 1, 2, concurrency, verbose)
}

/// Scans never stall; anything over a few seconds on a stub is a hang.
async fn run(
    cfg: ScanConfig,
    cidr: &str,
    client: StubClient,
    sink: &mut VecSink,
) -> ScanSummary {
    let range = parse_cidr(cidr).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        scanner::run_scan(cfg, range, Arc::new(client), sink),
    )
    .await
    .expect("scan did not complete")
    .expect("scan failed")
}

#[tokio::test]
async fn slash_30_verbose_reports_every_host() {
    let client = StubClient::new()
        .query_error("10.0.0.0", "request timeout after 2 attempts")
        .value("10.0.0.1", "X")
        .value("10.0.0.2", "X")
        .query_error("10.0.0.3", "request timeout after 2 attempts");

    let mut sink = VecSink::default();
    let summary = run(config(100, true), "10.0.0.0/30", client, &mut sink).await;

    assert_eq!(summary.addresses, 4);
    assert_eq!(summary.reported, 4);

    let mut lines = sink.0.clone();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "#10.0.0.0;query failed: request timeout after 2 attempts",
            "#10.0.0.3;query failed: request timeout after 2 attempts",
            "10.0.0.1;X",
            "10.0.0.2;X",
        ]
    );
}

#[tokio::test]
async fn failures_are_silent_without_verbose() {
    let client = StubClient::new()
        .query_error("10.0.0.0", "request timeout after 2 attempts")
        .value("10.0.0.1", "X")
        .value("10.0.0.2", "X")
        .connect_error("10.0.0.3", "network unreachable");

    let mut sink = VecSink::default();
    let summary = run(config(100, false), "10.0.0.0/30", client, &mut sink).await;

    assert_eq!(summary.addresses, 4);
    assert_eq!(summary.reported, 2);
    assert!(sink.0.iter().all(|line| !line.starts_with('#')));
}

#[tokio::test]
async fn verbose_failure_lines_carry_prefix_and_address() {
    let client = StubClient::new().connect_error("192.168.7.9", "no route to host");

    let mut sink = VecSink::default();
    run(config(4, true), "192.168.7.9/32", client, &mut sink).await;

    assert_eq!(sink.0.len(), 1);
    let line = &sink.0[0];
    assert!(line.starts_with('#'));
    assert!(line.contains("192.168.7.9"));
    assert!(line.contains("connect failed: no route to host"));
}

#[tokio::test]
async fn one_result_per_address_with_single_worker() {
    let client = StubClient::new()
        .value("10.1.0.2", "a")
        .value("10.1.0.9", "b");

    let mut sink = VecSink::default();
    // /28 enumerates 16 addresses; 14 of them refuse the connection.
    let summary = run(config(1, false), "10.1.0.0/28", client, &mut sink).await;

    assert_eq!(summary.addresses, 16);
    assert_eq!(summary.reported, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_result_per_address_with_more_workers_than_addresses() {
    let client = StubClient::new()
        .value("10.1.0.2", "a")
        .value("10.1.0.9", "b");

    let mut sink = VecSink::default();
    let summary = run(config(64, false), "10.1.0.0/28", client, &mut sink).await;

    assert_eq!(summary.addresses, 16);
    assert_eq!(summary.reported, 2);
}

#[tokio::test]
async fn zero_concurrency_is_clamped_and_completes() {
    let client = StubClient::new().value("10.0.0.1", "up");

    let cfg = config(0, false);
    assert_eq!(cfg.concurrency, 1);

    let mut sink = VecSink::default();
    let summary = run(cfg, "10.0.0.0/30", client, &mut sink).await;

    assert_eq!(summary.addresses, 4);
    assert_eq!(sink.0, vec!["10.0.0.1;up"]);
}

#[tokio::test]
async fn multiline_values_render_as_one_line() {
    let client = StubClient::new().value("10.0.0.4", "Linux gw\r\n6.1.0-amd64");

    let mut sink = VecSink::default();
    run(config(2, false), "10.0.0.4/32", client, &mut sink).await;

    assert_eq!(sink.0, vec!["10.0.0.4;Linux gw 6.1.0-amd64"]);
}

#[tokio::test]
async fn last_binding_wins() {
    let client = StubClient::new().bindings(
        "10.0.0.4",
        vec![
            Binding {
                oid: ".1.3.6.1.2.1.1.5.0".to_string(),
                value: "first".to_string(),
            },
            Binding {
                oid: ".1.3.6.1.2.1.1.1.0".to_string(),
                value: "last".to_string(),
            },
        ],
    );

    let mut sink = VecSink::default();
    run(config(2, false), "10.0.0.4/32", client, &mut sink).await;

    assert_eq!(sink.0, vec!["10.0.0.4;last"]);
}

#[tokio::test]
async fn empty_binding_list_reports_empty_value() {
    let client = StubClient::new().bindings("10.0.0.4", Vec::new());

    let mut sink = VecSink::default();
    run(config(2, false), "10.0.0.4/32", client, &mut sink).await;

    assert_eq!(sink.0, vec!["10.0.0.4;"]);
}

#[tokio::test]
async fn every_address_is_attempted_exactly_once() {
    let client = StubClient::new();
    let mut sink = VecSink::default();

    let range = parse_cidr("172.16.0.0/27").unwrap();
    let client = Arc::new(client);
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        scanner::run_scan(config(8, false), range, client.clone(), &mut sink),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(summary.addresses, 32);
    assert_eq!(
        client.connect_calls.load(std::sync::atomic::Ordering::Relaxed),
        32
    );
}

#[test]
fn invalid_cidr_fails_before_any_scan() {
    assert!(parse_cidr("not-a-cidr").is_err());
    assert!(parse_cidr("10.0.0.0/33").is_err());
}
