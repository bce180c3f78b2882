// # HTTP IP Resolver
//
// This crate provides an HTTP-based public IP resolver for the DDNS system.
//
// ## Architecture
//
// Asks "what is my IP" echo services (api.ipify.org, ifconfig.me,
// icanhazip.com) for the caller's address. Services are tried in order and
// the first usable IPv4 answer wins.
//
// Each request has its own timeout. There is no sleeping or retrying here:
// if every service fails, the error goes back to the reconciler.

use ddns_core::traits::IpResolver;
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default IP check services, tried in order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",  // returns plain text IP
    "https://ifconfig.me/ip", // No rate limit documented
    "https://icanhazip.com",  // No rate limit documented
];

/// Default timeout for one request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IPv4 resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URLs to fetch the IP from, in order of preference
    urls: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver that tries `urls` in order
    ///
    /// An empty list falls back to [`DEFAULT_IP_SERVICES`].
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_timeout(urls, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create with a custom per-request timeout
    pub fn with_timeout(urls: Vec<String>, timeout: Duration) -> Self {
        let urls = if urls.is_empty() {
            DEFAULT_IP_SERVICES.iter().map(|u| u.to_string()).collect()
        } else {
            urls
        };

        Self {
            urls,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The URLs this resolver asks, in order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Fetch the IP from a single service
    async fn fetch_ip(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::provider("http", format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                "http",
                format!("HTTP error from {}: {}", url, response.status()),
            ));
        }

        let ip_text = response.text().await.map_err(|e| {
            Error::provider("http", format!("Failed to read response from {}: {}", url, e))
        })?;

        parse_ipv4(ip_text.trim())
    }
}

impl Default for HttpIpResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Parse an echo-service answer, accepting only IPv4
fn parse_ipv4(ip_text: &str) -> Result<Ipv4Addr> {
    let ip: IpAddr = ip_text
        .parse()
        .map_err(|_| Error::provider("http", format!("Invalid IP address: {:?}", ip_text)))?;

    match ip {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(ip) => Err(Error::provider(
            "http",
            format!("Expected IPv4, got: {}", ip),
        )),
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn current_ip(&self) -> Result<Ipv4Addr> {
        let mut last_error = None;

        for url in &self.urls {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::debug!("{} reports public ip {}", url, ip);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("IP lookup via {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::config("No IP services configured")))
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
