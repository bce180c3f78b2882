// # IP Resolver Trait
//
// Defines the interface for discovering the caller's public IPv4 address.
//
// ## Implementations
//
// - HTTP echo services (ipify and friends): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.current_ip().await?;
//     println!("public ip: {ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolver implementations
///
/// The reconciler calls [`current_ip`](IpResolver::current_ip) once at the
/// start of every cycle. Implementations enforce their own timeouts; the
/// reconciler treats the call as blocking.
///
/// # Failure Policy
///
/// A returned error aborts the cycle and stops the daemon. Resolvers may
/// fall back between endpoints internally, but must not sleep and retry:
/// pacing belongs to the scheduler.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The address as seen from the internet
    /// - `Err(Error)`: If no endpoint produced a usable answer
    async fn current_ip(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
