//! Command-line interface

use crate::duration::parse_duration;
use clap::Parser;
use ddns_core::config::DEFAULT_MAX_CONSECUTIVE_FAILURES;
use ddns_core::{ReconcileConfig, ZoneMap};
use std::time::Duration;

/// Keep Route 53 `A` records pointed at this machine's public IPv4 address
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Hostnames to keep up to date, e.g. home.example.com
    #[arg(required = true, value_name = "HOST")]
    pub hosts: Vec<String>,

    /// AWS shared-config profile to load credentials from
    #[arg(long, env = "DDNS_AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS region
    #[arg(long, env = "DDNS_AWS_REGION")]
    pub region: Option<String>,

    /// Record TTL and polling interval (e.g. 90s, 5m, 1h30m)
    #[arg(long, env = "DDNS_TTL", default_value = "5m", value_parser = parse_duration)]
    pub ttl: Duration,

    /// Log at debug level
    #[arg(short, long, env = "DDNS_VERBOSE")]
    pub verbose: bool,

    /// Look up records but never change them
    #[arg(long, env = "DDNS_DRY_RUN")]
    pub dry_run: bool,

    /// Public IP echo service, tried in the order given (may be repeated)
    #[arg(long = "ip-url", value_name = "URL", env = "DDNS_IP_URLS", value_delimiter = ',')]
    pub ip_urls: Vec<String>,

    /// Consecutive failed record writes tolerated before giving up
    #[arg(
        long,
        env = "DDNS_MAX_WRITE_FAILURES",
        default_value_t = DEFAULT_MAX_CONSECUTIVE_FAILURES,
        value_parser = clap::value_parser!(u32).range(1..=10)
    )]
    pub max_write_failures: u32,
}

impl Args {
    /// Build the reconciler configuration from the parsed arguments
    pub fn reconcile_config(&self) -> ddns_core::Result<ReconcileConfig> {
        let zones = ZoneMap::from_hosts(&self.hosts)?;
        let config = ReconcileConfig::new(zones)
            .with_ttl(self.ttl)
            .with_max_consecutive_failures(self.max_write_failures);
        config.validate()?;
        Ok(config)
    }
}
