// # ddns-core
//
// Core library for the polling DDNS reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **host**: Hostname → (fully-qualified name, zone) parsing
// - **IpResolver**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for listing and upserting records via provider APIs
// - **Reconciler**: One polling cycle: resolve, list, diff, upsert
// - **Scheduler**: Runs the reconciler once per TTL
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Library-First**: All core functionality can be used as a library
// 3. **Idempotency**: Only records that differ from the current IP are written
// 4. **Immutable Configuration**: Built once at startup, never mutated

pub mod config;
pub mod error;
pub mod host;
pub mod reconciler;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{ReconcileConfig, ZoneMap};
pub use error::{Error, Result};
pub use host::{HostTarget, Zone, parse_host};
pub use reconciler::{ReconcileState, Reconciler, RunResult};
pub use scheduler::Scheduler;
pub use traits::{DnsProvider, DnsRecord, IpResolver, PageCursor, RecordPage, RecordType};
