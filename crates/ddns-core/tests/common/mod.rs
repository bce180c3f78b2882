//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles are cheap to clone and share their state, so a test can box
//! one copy into the reconciler and keep another to inspect calls.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, DnsRecord, IpResolver, PageCursor, RecordPage, RecordType};
use ddns_core::{ReconcileConfig, Reconciler, Zone, ZoneMap};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const TTL: Duration = Duration::from_secs(300);

/// An IpResolver returning whatever the test last set
#[derive(Clone)]
pub struct MockResolver {
    answer: Arc<Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
    call_times: Arc<Mutex<Vec<Instant>>>,
}

impl MockResolver {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Some(ip))),
            call_count: Arc::new(AtomicUsize::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A resolver whose every lookup fails
    pub fn failing() -> Self {
        Self {
            answer: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_ip(&self, ip: Ipv4Addr) {
        *self.answer.lock().unwrap() = Some(ip);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// When each lookup happened, on the tokio clock
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IpResolver for MockResolver {
    async fn current_ip(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        self.answer
            .lock()
            .unwrap()
            .ok_or_else(|| Error::provider("mock", "connection refused"))
    }

    fn resolver_name(&self) -> &'static str {
        "mock"
    }
}

/// An in-memory hosted-zone provider with paging and scripted failures
#[derive(Clone, Default)]
pub struct MockProvider {
    zones: Arc<Mutex<HashMap<String, Vec<DnsRecord>>>>,
    batches: Arc<Mutex<Vec<(String, Vec<DnsRecord>)>>>,
    cursors: Arc<Mutex<Vec<Option<PageCursor>>>>,
    page_size: Arc<AtomicUsize>,
    failing_writes: Arc<AtomicUsize>,
    failing_lists: Arc<AtomicUsize>,
    dry_run: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        provider.page_size.store(usize::MAX, Ordering::SeqCst);
        provider
    }

    /// Split listings into pages of `size` records
    pub fn with_page_size(self, size: usize) -> Self {
        self.page_size.store(size, Ordering::SeqCst);
        self
    }

    /// Accept upserts without applying them
    pub fn with_dry_run(self) -> Self {
        self.dry_run.store(true, Ordering::SeqCst);
        self
    }

    /// Seed a record, as if created out of band
    pub fn insert(&self, zone: &str, record: DnsRecord) {
        let mut zones = self.zones.lock().unwrap();
        let records = zones.entry(zone.to_string()).or_default();
        records.retain(|r| !(r.name == record.name && r.record_type == record.record_type));
        records.push(record);
    }

    /// Seed an `A` record
    pub fn insert_a(&self, zone: &str, name: &str, ip: Ipv4Addr) {
        self.insert(zone, DnsRecord::a(name, ip, TTL));
    }

    /// Make the next `n` upserts fail
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Make every upsert fail from now on
    pub fn fail_all_writes(&self) {
        self.failing_writes.store(usize::MAX, Ordering::SeqCst);
    }

    /// Make the next `n` page requests fail
    pub fn fail_next_lists(&self, n: usize) {
        self.failing_lists.store(n, Ordering::SeqCst);
    }

    /// Every upsert batch received, successful or not
    pub fn batches(&self) -> Vec<(String, Vec<DnsRecord>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Cursors received by `list_page`, in call order
    pub fn cursors(&self) -> Vec<Option<PageCursor>> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn records(&self, zone: &str) -> Vec<DnsRecord> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockProvider {
    async fn list_page(&self, zone: &Zone, cursor: Option<&PageCursor>) -> Result<RecordPage> {
        self.cursors.lock().unwrap().push(cursor.cloned());

        if Self::take_failure(&self.failing_lists) {
            return Err(Error::provider("mock", "listing throttled"));
        }

        let records = self.records(zone.as_str());
        let start = match cursor {
            None => 0,
            Some(cursor) => records
                .iter()
                .position(|r| r.name == cursor.name && r.record_type == cursor.record_type)
                .ok_or_else(|| Error::not_found(format!("cursor {}", cursor.name)))?,
        };

        let page_size = self.page_size.load(Ordering::SeqCst);
        let end = start.saturating_add(page_size).min(records.len());
        let next = records.get(end).map(|r| PageCursor {
            name: r.name.clone(),
            record_type: r.record_type.clone(),
            identifier: None,
        });

        Ok(RecordPage {
            records: records[start..end].to_vec(),
            next,
        })
    }

    async fn upsert_records(&self, zone: &Zone, records: &[DnsRecord]) -> Result<()> {
        self.batches
            .lock()
            .unwrap()
            .push((zone.to_string(), records.to_vec()));

        if Self::take_failure(&self.failing_writes) {
            return Err(Error::provider("mock", "rate exceeded"));
        }

        if self.is_dry_run() {
            return Ok(());
        }

        for record in records {
            self.insert(zone.as_str(), record.clone());
        }
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A record of a type the reconciler must ignore
pub fn txt(name: &str, value: &str) -> DnsRecord {
    DnsRecord {
        name: name.to_string(),
        record_type: RecordType::Other("TXT".to_string()),
        value: value.to_string(),
        ttl: TTL,
    }
}

/// Helper to create a configuration for the given hosts
pub fn config_for(hosts: &[&str]) -> ReconcileConfig {
    ReconcileConfig::new(ZoneMap::from_hosts(hosts).expect("valid hosts")).with_ttl(TTL)
}

/// Helper to build a reconciler around clones of the doubles
pub fn reconciler(
    resolver: &MockResolver,
    provider: &MockProvider,
    config: ReconcileConfig,
) -> Reconciler {
    Reconciler::new(Box::new(resolver.clone()), Box::new(provider.clone()), config)
        .expect("reconciler construction succeeds")
}
