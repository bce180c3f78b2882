//! Hostname parsing
//!
//! Turns a hostname argument into its canonical fully-qualified form and the
//! zone that holds it. The zone is the last three components of the name
//! after a trailing dot has been ensured, i.e. the two rightmost labels plus
//! the root: `home.example.com` lives in `example.com.`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of `.`-separated components (root included) that make up a zone
const ZONE_COMPONENTS: usize = 3;

/// A DNS hosted zone name, always ending in `.`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Zone(String);

impl Zone {
    /// The zone name, e.g. `example.com.`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-qualified hostname whose `A` record is kept up to date
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostTarget {
    fqdn: String,
    zone: Zone,
}

impl HostTarget {
    /// The normalized name, e.g. `home.example.com.`
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// The zone this host belongs to
    pub fn zone(&self) -> &Zone {
        &self.zone
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn)
    }
}

/// Parse a hostname argument into a [`HostTarget`]
///
/// The name is trimmed, lowercased and given a trailing dot. Names with
/// fewer than three components (counting the root) or with an empty label
/// are rejected with [`Error::InvalidHostname`].
///
/// ```
/// use ddns_core::host::parse_host;
///
/// let host = parse_host("Home.Example.com").unwrap();
/// assert_eq!(host.fqdn(), "home.example.com.");
/// assert_eq!(host.zone().as_str(), "example.com.");
/// ```
pub fn parse_host(arg: &str) -> Result<HostTarget> {
    let mut fqdn = arg.trim().to_ascii_lowercase();
    if !fqdn.ends_with('.') {
        fqdn.push('.');
    }

    let parts: Vec<&str> = fqdn.split('.').collect();
    if parts.len() < ZONE_COMPONENTS {
        return Err(Error::invalid_hostname(
            arg,
            "expected a fully qualified domain name",
        ));
    }

    // The last component is the root after the trailing dot.
    if parts[..parts.len() - 1].iter().any(|label| label.is_empty()) {
        return Err(Error::invalid_hostname(arg, "hostname has an empty label"));
    }

    let zone = Zone(parts[parts.len() - ZONE_COMPONENTS..].join("."));
    Ok(HostTarget { fqdn, zone })
}
