// # DNS Provider Trait
//
// Defines the interface for reading and writing address records in a
// provider's hosted zones.
//
// ## Implementations
//
// - Amazon Route 53: `ddns-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let zone = ddns_core::host::parse_host("home.example.com")?.zone().clone();
//
//     // Every record in the zone, all pages
//     let records = provider.list_records(&zone).await?;
//
//     // Insert-or-replace
//     provider.upsert_records(&zone, &[DnsRecord::a("home.example.com.", ip, ttl)]).await?;
//
//     Ok(())
// }
// ```

use crate::host::Zone;
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// DNS record type
///
/// Only [`RecordType::A`] is ever written. Listings may contain anything;
/// other types are carried through verbatim so they can be ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Any other record type, by its wire name
    Other(String),
}

impl RecordType {
    /// The record type name, e.g. `"A"` or `"TXT"`
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Other(name) => name,
        }
    }
}

impl From<&str> for RecordType {
    fn from(name: &str) -> Self {
        if name.eq_ignore_ascii_case("A") {
            RecordType::A
        } else {
            RecordType::Other(name.to_string())
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single DNS record value as listed from or sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully-qualified record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record value (an address for `A` records)
    pub value: String,
    /// Time-to-live
    pub ttl: Duration,
}

impl DnsRecord {
    /// Build an `A` record
    pub fn a(name: impl Into<String>, ip: Ipv4Addr, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            value: ip.to_string(),
            ttl,
        }
    }

    /// Whether this is an `A` record for `name` pointing at `ip`
    pub fn is_a_record_for(&self, name: &str, ip: Ipv4Addr) -> bool {
        self.record_type == RecordType::A
            && self.name.eq_ignore_ascii_case(name)
            && self.value.trim().parse::<Ipv4Addr>().ok() == Some(ip)
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (ttl {}s)",
            self.name,
            self.record_type,
            self.value,
            self.ttl.as_secs()
        )
    }
}

/// Where the next page of a listing starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// First record name of the next page
    pub name: String,
    /// First record type of the next page
    pub record_type: RecordType,
    /// Set identifier, for providers with weighted/latency record sets
    pub identifier: Option<String>,
}

/// One page of a record listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    /// Records on this page
    pub records: Vec<DnsRecord>,
    /// Cursor for the following page, `None` on the last page
    pub next: Option<PageCursor>,
}

/// Trait for DNS provider implementations
///
/// This trait defines the interface for listing and upserting records.
/// Implementations must handle the specifics of each provider's API.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// Providers execute API calls and report success or failure. They do not:
/// - decide which records need writing (owned by the `Reconciler`)
/// - retry failed writes (the `Reconciler` counts failures and the next
///   cycle retries)
/// - cache record listings between calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch one page of the records in `zone`
    ///
    /// `cursor` is `None` for the first page and the previous page's
    /// [`RecordPage::next`] afterwards.
    async fn list_page(
        &self,
        zone: &Zone,
        cursor: Option<&PageCursor>,
    ) -> Result<RecordPage, crate::Error>;

    /// List every record in `zone`, following pagination to the end
    async fn list_records(&self, zone: &Zone) -> Result<Vec<DnsRecord>, crate::Error> {
        record_pages(self, zone).try_concat().await
    }

    /// Insert or replace `records` in `zone`, keyed by name and type
    ///
    /// # Idempotency
    ///
    /// Writing the same batch twice must leave the zone as after the first
    /// write. Records must never be deleted and recreated.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: every record was applied
    /// - `Err(Error)`: at least one record failed; the batch counts as failed
    async fn upsert_records(
        &self,
        zone: &Zone,
        records: &[DnsRecord],
    ) -> Result<(), crate::Error>;

    /// Whether `upsert_records` only reports what it would write
    ///
    /// A dry-run provider still lists for real and returns `Ok(())` from
    /// `upsert_records` without changing the zone.
    fn is_dry_run(&self) -> bool {
        false
    }

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "route53")
    fn provider_name(&self) -> &'static str;
}

/// Lazily page through every record in `zone`
///
/// Each item is one page. The stream ends after the page without a
/// continuation cursor, or after the first error.
pub fn record_pages<'a, P>(
    provider: &'a P,
    zone: &'a Zone,
) -> impl Stream<Item = Result<Vec<DnsRecord>, crate::Error>> + Send + 'a
where
    P: DnsProvider + ?Sized,
{
    // `None` once the last page has been read.
    let start: Option<Option<PageCursor>> = Some(None);

    stream::try_unfold(start, move |state| async move {
        let Some(cursor) = state else {
            return Ok::<_, crate::Error>(None);
        };

        let page = provider.list_page(zone, cursor.as_ref()).await?;
        Ok(Some((page.records, page.next.map(Some))))
    })
}
