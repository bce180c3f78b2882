// # Route 53 DNS Provider
//
// This crate provides an Amazon Route 53 DNS provider for the DDNS system.
//
// ## Behaviour
//
// - Zone names are mapped to hosted zone ids with `ListHostedZonesByName`;
//   ids are remembered for the life of the provider
// - Listing follows `IsTruncated` / `NextRecordName` / `NextRecordType` /
//   `NextRecordIdentifier`, one page per `list_page` call
// - Writes are a single `ChangeResourceRecordSets` batch of `UPSERT`
//   changes, applied atomically by Route 53
// - Dry-run mode lists for real but only logs the change batch
//
// ## Responsibilities
//
// The provider executes API calls and reports the outcome. It does not
// retry, back off, decide what to write, or cache records. All of that is
// owned by the reconciler.
//
// ## Credentials
//
// Credentials and region come from the AWS default provider chain
// (environment, shared profile, instance metadata). The process environment
// is never modified; profile and region are passed to the config loader.
//
// ## API Reference
//
// - ListHostedZonesByName: GET `/2013-04-01/hostedzonesbyname?dnsname=...`
// - ListResourceRecordSets: GET `/2013-04-01/hostedzone/{Id}/rrset`
// - ChangeResourceRecordSets: POST `/2013-04-01/hostedzone/{Id}/rrset/`

use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::config::{BehaviorVersion, Region};
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use ddns_core::traits::{DnsProvider, DnsRecord, PageCursor, RecordPage, RecordType};
use ddns_core::{Error, Result, Zone};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Provider name used in errors and logs
const PROVIDER: &str = "route53";

/// Prefix Route 53 puts on hosted zone ids
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Records requested per listing page
const LIST_PAGE_SIZE: i32 = 100;

/// Comment attached to every change batch
const CHANGE_COMMENT: &str = "ddnsd dynamic address update";

/// Route 53 DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all read requests (zone lookup, record listing)
/// - Log the intended change batch
/// - **NOT** actually modify DNS records
pub struct Route53Provider {
    /// Route 53 API client
    client: Client,

    /// Hosted zone ids by zone name
    zone_ids: RwLock<HashMap<String, String>>,

    /// Dry-run mode: if true, perform reads but skip writes
    dry_run: bool,
}

impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zones = self
            .zone_ids
            .read()
            .map(|ids| ids.len())
            .unwrap_or_default();

        f.debug_struct("Route53Provider")
            .field("client", &"<route53>")
            .field("known_zones", &zones)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Provider {
    /// Create a provider around an existing Route 53 client
    pub fn new(client: Client, dry_run: bool) -> Self {
        Self {
            client,
            zone_ids: RwLock::new(HashMap::new()),
            dry_run,
        }
    }

    /// Create a provider from the AWS default configuration chain
    ///
    /// # Parameters
    ///
    /// - `profile`: Shared-config profile to load credentials from
    /// - `region`: Region override
    /// - `dry_run`: If true, perform reads but skip writes
    pub async fn from_env(profile: Option<&str>, region: Option<&str>, dry_run: bool) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let config = loader.load().await;
        Self::new(Client::new(&config), dry_run)
    }

    /// Pre-configure the hosted zone id for a zone, skipping the lookup
    pub fn with_zone_id(self, zone: impl Into<String>, zone_id: impl AsRef<str>) -> Self {
        if let Ok(mut ids) = self.zone_ids.write() {
            ids.insert(zone.into(), strip_zone_prefix(zone_id.as_ref()).to_string());
        }
        self
    }

    /// Get the hosted zone id for a zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzonesbyname?dnsname=example.com.&maxitems=1
    /// ```
    async fn get_zone_id(&self, zone: &Zone) -> Result<String> {
        if let Some(id) = self
            .zone_ids
            .read()
            .ok()
            .and_then(|ids| ids.get(zone.as_str()).cloned())
        {
            return Ok(id);
        }

        tracing::debug!("Looking up hosted zone id for {}", zone);

        let output = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(zone.as_str())
            .max_items(1)
            .send()
            .await
            .map_err(|e| sdk_error("hosted zone lookup", e))?;

        // Results start at the requested name; anything else means no match.
        let hosted_zone = output
            .hosted_zones()
            .first()
            .filter(|z| z.name().eq_ignore_ascii_case(zone.as_str()))
            .ok_or_else(|| Error::not_found(format!("No hosted zone found for {}", zone)))?;

        let id = strip_zone_prefix(hosted_zone.id()).to_string();
        tracing::debug!("Found hosted zone id {} for {}", id, zone);

        if let Ok(mut ids) = self.zone_ids.write() {
            ids.insert(zone.to_string(), id.clone());
        }
        Ok(id)
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzone/{Id}/rrset?name=...&type=...&identifier=...
    /// ```
    async fn list_page(&self, zone: &Zone, cursor: Option<&PageCursor>) -> Result<RecordPage> {
        let zone_id = self.get_zone_id(zone).await?;

        let mut request = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .max_items(LIST_PAGE_SIZE);
        if let Some(cursor) = cursor {
            request = request
                .start_record_name(&cursor.name)
                .start_record_type(RrType::from(cursor.record_type.as_str()))
                .set_start_record_identifier(cursor.identifier.clone());
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("record listing", e))?;

        let records: Vec<DnsRecord> = output
            .resource_record_sets()
            .iter()
            .flat_map(records_from_set)
            .collect();

        let next = next_cursor(
            output.is_truncated(),
            output.next_record_name(),
            output.next_record_type(),
            output.next_record_identifier(),
        )?;

        tracing::debug!(
            "Listed {} record(s) in {}{}",
            records.len(),
            zone,
            if next.is_some() { ", more pages follow" } else { "" }
        );

        Ok(RecordPage { records, next })
    }

    /// # API Call
    ///
    /// ```http
    /// POST /2013-04-01/hostedzone/{Id}/rrset/
    /// <ChangeBatch> UPSERT ... </ChangeBatch>
    /// ```
    async fn upsert_records(&self, zone: &Zone, records: &[DnsRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let zone_id = self.get_zone_id(zone).await?;

        if self.dry_run {
            let payload: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "Action": "UPSERT",
                        "Name": r.name,
                        "Type": r.record_type.as_str(),
                        "TTL": r.ttl.as_secs(),
                        "Value": r.value,
                    })
                })
                .collect();
            tracing::info!(
                "[DRY-RUN] Would change hosted zone {} ({}): {}",
                zone_id,
                zone,
                serde_json::Value::Array(payload)
            );
            return Ok(());
        }

        let changes = records
            .iter()
            .map(change_for)
            .collect::<Result<Vec<_>>>()?;

        let batch = ChangeBatch::builder()
            .comment(CHANGE_COMMENT)
            .set_changes(Some(changes))
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("Invalid change batch: {}", e)))?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| sdk_error("record upsert", e))?;

        tracing::debug!("Change batch of {} record(s) accepted for {}", records.len(), zone);
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Hosted zone id without its `/hostedzone/` prefix
fn strip_zone_prefix(id: &str) -> &str {
    id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(id)
}

/// One [`DnsRecord`] per value of a record set
///
/// Alias record sets have no values and yield nothing.
fn records_from_set(set: &ResourceRecordSet) -> Vec<DnsRecord> {
    let record_type = RecordType::from(set.r#type().as_str());
    let ttl = Duration::from_secs(set.ttl().and_then(|t| u64::try_from(t).ok()).unwrap_or(0));

    set.resource_records()
        .iter()
        .map(|rr| DnsRecord {
            name: set.name().to_string(),
            record_type: record_type.clone(),
            value: rr.value().to_string(),
            ttl,
        })
        .collect()
}

/// Continuation cursor of a listing page
fn next_cursor(
    is_truncated: bool,
    name: Option<&str>,
    record_type: Option<&RrType>,
    identifier: Option<&str>,
) -> Result<Option<PageCursor>> {
    if !is_truncated {
        return Ok(None);
    }

    match (name, record_type) {
        (Some(name), Some(record_type)) => Ok(Some(PageCursor {
            name: name.to_string(),
            record_type: RecordType::from(record_type.as_str()),
            identifier: identifier.map(str::to_string),
        })),
        _ => Err(Error::provider(
            PROVIDER,
            "Truncated listing without a continuation record",
        )),
    }
}

/// Build the `UPSERT` change for an address record
fn change_for(record: &DnsRecord) -> Result<Change> {
    let set = record_set_for(record)?;

    Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(set)
        .build()
        .map_err(|e| Error::provider(PROVIDER, format!("Invalid change for {}: {}", record.name, e)))
}

/// Single-value record set for an address record
fn record_set_for(record: &DnsRecord) -> Result<ResourceRecordSet> {
    if record.record_type != RecordType::A {
        return Err(Error::provider(
            PROVIDER,
            format!("Refusing to write {} record {}", record.record_type, record.name),
        ));
    }

    let ttl = i64::try_from(record.ttl.as_secs())
        .map_err(|_| Error::provider(PROVIDER, format!("TTL out of range for {}", record.name)))?;

    let invalid = |e: aws_sdk_route53::error::BuildError| {
        Error::provider(PROVIDER, format!("Invalid change for {}: {}", record.name, e))
    };

    let value = ResourceRecord::builder()
        .value(&record.value)
        .build()
        .map_err(invalid)?;

    ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(RrType::A)
        .ttl(ttl)
        .resource_records(value)
        .build()
        .map_err(invalid)
}

/// Map an SDK failure to a provider error
fn sdk_error<E>(operation: &str, err: E) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();

    match err.code() {
        Some("NoSuchHostedZone") => Error::not_found(format!("{}: {}", operation, detail)),
        Some("Throttling" | "PriorRequestNotComplete") => Error::provider(
            PROVIDER,
            format!("Rate limit exceeded during {}. Please retry later: {}", operation, detail),
        ),
        Some("AccessDenied" | "InvalidClientTokenId" | "SignatureDoesNotMatch" | "ExpiredToken") => {
            Error::provider(
                PROVIDER,
                format!(
                    "Authentication failed during {}: Invalid credentials or insufficient permissions: {}",
                    operation, detail
                ),
            )
        }
        _ => Error::provider(PROVIDER, format!("{} failed: {}", operation, detail)),
    }
}
