// # ddnsd - DDNS Daemon
//
// Thin integration layer: parses the command line, wires the HTTP IP
// resolver and the Route 53 provider into a reconciler, and runs the
// polling scheduler until a signal or a fatal error. All reconciliation
// logic lives in ddns-core.
//
// ## Configuration
//
// Every option can also be given through the environment:
//
// - `DDNS_AWS_PROFILE`: AWS credential profile
// - `DDNS_AWS_REGION`: AWS region
// - `DDNS_TTL`: Record TTL and polling interval (default `5m`)
// - `DDNS_VERBOSE`: Debug logging
// - `DDNS_DRY_RUN`: Never change records
// - `DDNS_IP_URLS`: Comma-separated IP echo services
// - `DDNS_MAX_WRITE_FAILURES`: Tolerated consecutive write failures (default 3)
//
// ## Example
//
// ```bash
// ddnsd --profile home --ttl 5m home.example.com vpn.example.com
// ```

mod cli;
mod duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use ddns_core::{ReconcileConfig, Reconciler, Scheduler};
use ddns_ip_http::HttpIpResolver;
use ddns_provider_route53::Route53Provider;
use std::future::Future;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                DdnsExitCode::ConfigError.into()
            } else {
                DdnsExitCode::CleanShutdown.into()
            };
        }
    };

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd (pid {})", std::process::id());

    let config = match args.reconcile_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!(
        "Managing {} host(s) in {} zone(s), ttl {}s",
        config.zones.host_count(),
        config.zones.zone_count(),
        config.ttl.as_secs()
    );
    if args.dry_run {
        info!("Dry-run mode: records will not be changed");
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(args, config).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(args: Args, config: ReconcileConfig) -> Result<()> {
    let shutdown = shutdown_signal()?;

    let provider = Route53Provider::from_env(
        args.profile.as_deref(),
        args.region.as_deref(),
        args.dry_run,
    )
    .await;
    debug!("Provider: {:?}", provider);

    let resolver = HttpIpResolver::new(args.ip_urls);
    debug!("IP services: {:?}", resolver.urls());

    let reconciler = Reconciler::new(Box::new(resolver), Box::new(provider), config)
        .context("Failed to create reconciler")?;
    let mut scheduler = Scheduler::new(reconciler);

    scheduler
        .run_until(async {
            let name = shutdown.await;
            info!("Received shutdown signal: {}", name);
        })
        .await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Install handlers for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// A future resolving to the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install a handler for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}
