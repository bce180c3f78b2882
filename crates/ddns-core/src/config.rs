//! Configuration types for the DDNS system
//!
//! The daemon builds one [`ReconcileConfig`] at startup and hands it to the
//! [`Reconciler`](crate::Reconciler). Nothing in it changes afterwards.

use crate::error::{Error, Result};
use crate::host::{HostTarget, Zone, parse_host};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default polling interval and record TTL (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default number of tolerated consecutive write failures
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Hostnames grouped by the zone that holds them
///
/// Zones iterate in name order. Hosts keep the order they were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMap {
    zones: BTreeMap<Zone, Vec<HostTarget>>,
}

impl ZoneMap {
    /// Parse every hostname argument and group the results by zone
    ///
    /// Fails on the first argument that is not a valid hostname. A hostname
    /// given twice is kept once.
    pub fn from_hosts<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let host = parse_host(arg)?;
            debug!("{} -> host: {} zone: {}", arg, host.fqdn(), host.zone());
            map.insert(host);
        }
        Ok(map)
    }

    /// Add a host to its zone
    pub fn insert(&mut self, host: HostTarget) {
        let hosts = self.zones.entry(host.zone().clone()).or_default();
        if hosts.contains(&host) {
            warn!("Host {} listed more than once, ignoring duplicate", host);
            return;
        }
        hosts.push(host);
    }

    /// Iterate zones with their hosts
    pub fn iter(&self) -> impl Iterator<Item = (&Zone, &[HostTarget])> {
        self.zones
            .iter()
            .map(|(zone, hosts)| (zone, hosts.as_slice()))
    }

    /// Number of zones
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Number of hosts across all zones
    pub fn host_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    /// Whether no hosts are configured
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Hosts to keep pointed at the public IP, grouped by zone
    pub zones: ZoneMap,

    /// TTL written on every record, also the pause between cycles
    #[serde(default = "default_ttl")]
    pub ttl: Duration,

    /// Consecutive write failures tolerated before giving up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

impl ReconcileConfig {
    /// Create a configuration with the default TTL and failure limit
    pub fn new(zones: ZoneMap) -> Self {
        Self {
            zones,
            ttl: DEFAULT_TTL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    /// Set the TTL / polling interval
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the tolerated number of consecutive write failures
    pub fn with_max_consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(Error::config("At least one host must be specified"));
        }

        if self.ttl.is_zero() {
            return Err(Error::config("TTL must be greater than zero"));
        }

        // DNS TTLs are whole seconds.
        if self.ttl.subsec_nanos() != 0 {
            return Err(Error::config(format!(
                "TTL must be a whole number of seconds, got {:?}",
                self.ttl
            )));
        }

        if self.ttl.as_secs() > u64::from(u32::MAX) {
            return Err(Error::config(format!(
                "TTL of {}s is out of range",
                self.ttl.as_secs()
            )));
        }

        if self.max_consecutive_failures == 0 {
            return Err(Error::config(
                "Maximum consecutive write failures must be at least 1",
            ));
        }

        Ok(())
    }
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

fn default_max_consecutive_failures() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}
