//! Contract Test: Reconcile Cycle
//!
//! Verifies the diff-and-upsert behaviour of one polling cycle.
//!
//! Constraints verified:
//! - Hosts already at the current IP are never written
//! - Hosts needing work in a zone go out as one batch, in configured order
//! - Records of other types are ignored
//! - A second cycle with nothing changed writes nothing
//! - Records changed out of band are repaired on the next cycle
//! - A dry-run provider's accepted batches are not counted as updates
//! - Listed records are visible at debug level

mod common;

use common::*;
use ddns_core::traits::RecordType;
use std::io;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tokio_test::assert_ok;
use tracing_subscriber::fmt::MakeWriter;

const OLD_IP: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 4);
const NEW_IP: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

#[tokio::test]
async fn stale_and_missing_hosts_are_upserted_in_one_batch() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();
    provider.insert_a("example.com.", "home.example.com.", OLD_IP);

    let mut reconciler = reconciler(
        &resolver,
        &provider,
        config_for(&["home.example.com", "vpn.example.com"]),
    );

    let result = assert_ok!(reconciler.reconcile_once().await);

    let batches = provider.batches();
    assert_eq!(batches.len(), 1, "expected a single upsert batch");

    let (zone, records) = &batches[0];
    assert_eq!(zone, "example.com.");
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["home.example.com.", "vpn.example.com."]);
    for record in records {
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.value, "5.6.7.8");
        assert_eq!(record.ttl, TTL);
    }

    assert_eq!(result.ip, NEW_IP);
    assert_eq!(result.zones_processed, 1);
    assert_eq!(result.hosts_updated, 2);
    assert!(result.failed_zones.is_empty());
    assert_eq!(result.consecutive_failures, 0);
}

#[tokio::test]
async fn host_already_at_current_ip_is_never_in_a_batch() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();
    provider.insert_a("example.com.", "home.example.com.", NEW_IP);
    provider.insert_a("example.com.", "vpn.example.com.", OLD_IP);

    let mut reconciler = reconciler(
        &resolver,
        &provider,
        config_for(&["home.example.com", "vpn.example.com"]),
    );
    assert_ok!(reconciler.reconcile_once().await);

    let batches = provider.batches();
    assert_eq!(batches.len(), 1);
    assert!(
        batches[0].1.iter().all(|r| r.name != "home.example.com."),
        "up-to-date host must not be rewritten"
    );
    assert_eq!(batches[0].1.len(), 1);
}

#[tokio::test]
async fn second_cycle_without_changes_writes_nothing() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();

    let mut reconciler = reconciler(
        &resolver,
        &provider,
        config_for(&["home.example.com", "vpn.example.com", "nas.example.org"]),
    );

    let first = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(first.hosts_updated, 3);
    assert_eq!(provider.write_count(), 2, "one batch per zone");

    let second = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(second.hosts_updated, 0);
    assert_eq!(second.zones_processed, 2);
    assert_eq!(provider.write_count(), 2, "idempotent cycle must not write");
}

#[tokio::test]
async fn non_address_records_are_ignored() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();
    provider.insert("example.com.", txt("home.example.com.", "5.6.7.8"));
    provider.insert("example.com.", txt("example.com.", "v=spf1 -all"));

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));
    assert_ok!(reconciler.reconcile_once().await);

    let batches = provider.batches();
    assert_eq!(batches.len(), 1, "TXT record must not count as published");
    assert_eq!(batches[0].1[0].name, "home.example.com.");

    // The TXT records are left alone.
    let records = provider.records("example.com.");
    assert_eq!(
        records
            .iter()
            .filter(|r| r.record_type != RecordType::A)
            .count(),
        2
    );
}

#[tokio::test]
async fn ip_change_triggers_update_on_next_cycle() {
    let resolver = MockResolver::new(OLD_IP);
    let provider = MockProvider::new();

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));
    assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(provider.write_count(), 1);

    resolver.set_ip(NEW_IP);
    let result = assert_ok!(reconciler.reconcile_once().await);

    assert_eq!(result.hosts_updated, 1);
    assert_eq!(provider.write_count(), 2);
    let records = provider.records("example.com.");
    assert_eq!(records.len(), 1, "upsert replaces, never duplicates");
    assert_eq!(records[0].value, "5.6.7.8");
}

#[tokio::test]
async fn out_of_band_edit_is_repaired_even_when_ip_is_unchanged() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));
    assert_ok!(reconciler.reconcile_once().await);

    // Someone points the record elsewhere by hand.
    provider.insert_a("example.com.", "home.example.com.", OLD_IP);

    let result = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(result.hosts_updated, 1);
    assert_eq!(provider.records("example.com.")[0].value, "5.6.7.8");
    assert_eq!(resolver.call_count(), 2, "IP is resolved every cycle");
}

#[tokio::test]
async fn zones_are_written_independently() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();
    provider.insert_a("example.com.", "home.example.com.", NEW_IP);

    let mut reconciler = reconciler(
        &resolver,
        &provider,
        config_for(&["home.example.com", "nas.example.org", "www.example.org"]),
    );
    let result = assert_ok!(reconciler.reconcile_once().await);

    let batches = provider.batches();
    assert_eq!(batches.len(), 1, "only the stale zone is written");
    assert_eq!(batches[0].0, "example.org.");
    assert_eq!(batches[0].1.len(), 2);
    assert_eq!(result.zones_processed, 2);
    assert_eq!(result.hosts_updated, 2);
}

#[tokio::test]
async fn dry_run_batches_are_not_counted_as_updates() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new().with_dry_run();
    provider.insert_a("example.com.", "home.example.com.", OLD_IP);

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));

    let result = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(result.hosts_updated, 0);
    assert_eq!(result.hosts_skipped, 1);
    assert_eq!(result.consecutive_failures, 0);
    assert!(provider.records("example.com.")[0].is_a_record_for("home.example.com.", OLD_IP));

    // Nothing changed, so the next cycle offers the same batch again.
    let result = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(result.hosts_skipped, 1);
    assert_eq!(provider.write_count(), 2);
}

#[tokio::test]
async fn live_writes_are_not_counted_as_skipped() {
    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));

    let result = assert_ok!(reconciler.reconcile_once().await);
    assert_eq!(result.hosts_updated, 1);
    assert_eq!(result.hosts_skipped, 0);
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn listed_records_are_logged_at_debug_level() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let resolver = MockResolver::new(NEW_IP);
    let provider = MockProvider::new();
    provider.insert_a("example.com.", "home.example.com.", NEW_IP);
    provider.insert("example.com.", txt("example.com.", "v=spf1 -all"));

    let mut reconciler = reconciler(&resolver, &provider, config_for(&["home.example.com"]));
    assert_ok!(reconciler.reconcile_once().await);

    let output = logs.contents();
    assert!(output.contains("home.example.com. A 5.6.7.8"), "logs: {output}");
    assert!(output.contains("example.com. TXT v=spf1 -all"), "logs: {output}");
}
