//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: List and upsert records via provider APIs

pub mod dns_provider;
pub mod ip_resolver;

pub use dns_provider::{DnsProvider, DnsRecord, PageCursor, RecordPage, RecordType, record_pages};
pub use ip_resolver::IpResolver;
