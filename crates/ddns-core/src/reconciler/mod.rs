//! Core DDNS reconciler
//!
//! The Reconciler is responsible for:
//! - Resolving the current public IP via IpResolver
//! - Listing the existing records of every configured zone
//! - Upserting only the hosts whose `A` record does not match
//! - Counting consecutive write failures and escalating past the limit
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ IpResolver  │─── current IP ──────┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  Reconciler  │◀── ReconcileConfig (zones, ttl)
//!                            └──────────────┘
//!                                     │
//!                 ┌───────────────────┴───────────────────┐
//!                 │                                       │
//!                 ▼                                       ▼
//!        ┌──────────────┐                        ┌──────────────┐
//!        │ DnsProvider  │                        │ReconcileState│
//!        │ (list/upsert)│                        │  (failures)  │
//!        └──────────────┘                        └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve the public IP (failure is fatal)
//! 2. For each zone, list every record (failure is fatal)
//! 3. Collect the hosts without an `A` record at the current IP
//! 4. Upsert them as one batch; count the outcome
//! 5. Return a [`RunResult`] for the scheduler to report
//!
//! Every cycle re-reads every zone, even when the IP is unchanged, so records
//! edited out of band are put back.

use crate::config::ReconcileConfig;
use crate::error::{Error, Result};
use crate::host::{HostTarget, Zone};
use crate::traits::{DnsProvider, DnsRecord, IpResolver};
use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn};

/// Consecutive write-failure bookkeeping
///
/// Lives for the process lifetime only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileState {
    consecutive_failures: u32,
}

impl ReconcileState {
    /// Current number of write failures in a row
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }
}

/// Outcome of one reconcile cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Public IP the cycle aligned records to
    pub ip: Ipv4Addr,
    /// Zones whose records were listed and compared
    pub zones_processed: usize,
    /// Hosts written successfully
    pub hosts_updated: usize,
    /// Hosts a dry-run provider accepted without writing
    pub hosts_skipped: usize,
    /// Zones whose upsert batch failed (retried next cycle)
    pub failed_zones: Vec<Zone>,
    /// Failure counter after the cycle
    pub consecutive_failures: u32,
}

impl RunResult {
    fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            zones_processed: 0,
            hosts_updated: 0,
            hosts_skipped: 0,
            failed_zones: Vec::new(),
            consecutive_failures: 0,
        }
    }
}

/// Core DDNS reconciler
///
/// Owns the collaborators, the immutable configuration and the failure
/// counter. Cycles run one at a time through `&mut self`.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::reconcile_once()`] per polling cycle, usually via
///    the [`Scheduler`](crate::Scheduler)
/// 3. Stop on the first `Err`; every error it returns is fatal
pub struct Reconciler {
    /// Resolver for the current public IP
    resolver: Box<dyn IpResolver>,

    /// DNS provider holding the zones
    provider: Box<dyn DnsProvider>,

    /// Zones, hosts, TTL and failure limit
    config: ReconcileConfig,

    /// Consecutive write failures
    state: ReconcileState,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `resolver`: Public IP resolver
    /// - `provider`: DNS provider
    /// - `config`: Reconciler configuration, validated here
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        config: ReconcileConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            resolver,
            provider,
            config,
            state: ReconcileState::default(),
        })
    }

    /// The configuration this reconciler was built with
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// The current failure bookkeeping
    pub fn state(&self) -> &ReconcileState {
        &self.state
    }

    /// Run one polling cycle
    ///
    /// # Returns
    ///
    /// - `Ok(RunResult)`: Cycle completed; some zone writes may have failed
    ///   without crossing the failure limit
    /// - `Err(Error)`: Fatal. IP resolution or listing failed, or write
    ///   failures went past `max_consecutive_failures`
    pub async fn reconcile_once(&mut self) -> Result<RunResult> {
        let ip = self
            .resolver
            .current_ip()
            .await
            .map_err(|e| Error::IpResolution {
                resolver: self.resolver.resolver_name().to_string(),
                message: e.to_string(),
            })?;
        debug!("Current ip: {}", ip);

        let ttl = self.config.ttl;
        let limit = self.config.max_consecutive_failures;
        let mut result = RunResult::new(ip);

        for (zone, hosts) in self.config.zones.iter() {
            let records = self
                .provider
                .list_records(zone)
                .await
                .map_err(|e| Error::ProviderList {
                    zone: zone.to_string(),
                    message: e.to_string(),
                })?;
            debug!("Zone {}: {} record(s) listed", zone, records.len());
            for record in &records {
                debug!("  {}", record);
            }
            result.zones_processed += 1;

            let updates = pending_updates(hosts, &records, ip);
            if updates.is_empty() {
                debug!("Zone {}: all {} host(s) already at {}", zone, hosts.len(), ip);
                self.state.record_success();
                continue;
            }

            let batch: Vec<DnsRecord> = updates
                .iter()
                .map(|host| DnsRecord::a(host.fqdn(), ip, ttl))
                .collect();

            match self.provider.upsert_records(zone, &batch).await {
                Ok(()) if self.provider.is_dry_run() => {
                    self.state.record_success();
                    for host in &updates {
                        info!("[DRY-RUN] Would set {} to {} for {:?}", host, ip, ttl);
                    }
                    result.hosts_skipped += updates.len();
                }
                Ok(()) => {
                    self.state.record_success();
                    for host in &updates {
                        info!("Set {} to {} for {:?}", host, ip, ttl);
                    }
                    result.hosts_updated += updates.len();
                }
                Err(e) => {
                    let err = Error::ProviderWrite {
                        zone: zone.to_string(),
                        message: e.to_string(),
                    };
                    let failures = self.state.record_failure();

                    if failures > limit {
                        error!(
                            "{} ({} consecutive failures, limit {})",
                            err, failures, limit
                        );
                        return Err(Error::WriteFailuresExceeded {
                            zone: zone.to_string(),
                            failures,
                            limit,
                            source: Box::new(err),
                        });
                    }

                    warn!(
                        "{} ({}/{} consecutive failures), retrying next cycle",
                        err, failures, limit
                    );
                    result.failed_zones.push(zone.clone());
                }
            }
        }

        result.consecutive_failures = self.state.consecutive_failures();
        Ok(result)
    }
}

/// Hosts lacking an `A` record at `ip`, in configuration order
fn pending_updates<'a>(
    hosts: &'a [HostTarget],
    records: &[DnsRecord],
    ip: Ipv4Addr,
) -> Vec<&'a HostTarget> {
    hosts
        .iter()
        .filter(|host| {
            !records
                .iter()
                .any(|record| record.is_a_record_for(host.fqdn(), ip))
        })
        .collect()
}
