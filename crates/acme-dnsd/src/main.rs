// # acme-dnsd - ACME dns-01 Challenge Bridge Daemon
//
// The acme-dnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering and selecting the DNS provider
// 4. Running the challenge dispatcher over line-delimited JSON on
//    stdin/stdout until SIGTERM/SIGINT or end of input
//
// All challenge logic lives in acme-dns-core; this binary only wires it up.
//
// ## Configuration
//
// ### DNS Provider
// - `ACME_DNS_PROVIDER`: Provider type (cloudflare, manual). Default: cloudflare
// - `CF_API_TOKEN`: Cloudflare API token (required for cloudflare)
// - `CF_API_BASE`: Cloudflare API base URL (optional)
// - `CF_HTTP_TIMEOUT_SECS`: Per-request HTTP timeout. Default: 30
//
// ### Dispatcher
// - `CF_DEFAULT_TTL`: TTL for records whose request carries none. Default: 120
// - `MANAGED_DOMAINS`: Comma-separated domains this instance handles (empty = all)
// - `ACME_DEBUG_DNS_VERIFICATION`: After each add, re-read provider records and
//   resolve the name via 1.1.1.1, 8.8.8.8 and the system resolver (true/false)
//
// ### Logging
// - `ACME_DNS_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=your_token
// export MANAGED_DOMAINS=example.com,example.net
//
// message-bus-consumer | acme-dnsd | message-bus-producer
// ```

mod transport;

use acme_dns_core::traits::ProviderClient;
use acme_dns_core::propagation::DEFAULT_SETTLE_DELAY;
use acme_dns_core::{
    BridgeConfig, ChallengeDispatcher, DispatcherConfig, PropagationChecker, ProviderConfig,
    ProviderRegistry,
};
use anyhow::Result;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use transport::StdioTransport;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BridgeExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BridgeExitCode> for ExitCode {
    fn from(code: BridgeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    provider_type: String,
    api_token: Option<String>,
    api_base: Option<String>,
    http_timeout_secs: u64,
    default_ttl: u32,
    managed_domains: Vec<String>,
    verify_records: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout_secs = match var("CF_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                anyhow::anyhow!("CF_HTTP_TIMEOUT_SECS must be a whole number of seconds. Got: {}", raw)
            })?,
            None => 30,
        };

        let default_ttl = match var("CF_DEFAULT_TTL") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("CF_DEFAULT_TTL must be a whole number of seconds. Got: {}", raw))?,
            None => 120,
        };

        let verify_records = match var("ACME_DEBUG_DNS_VERIFICATION") {
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => anyhow::bail!("ACME_DEBUG_DNS_VERIFICATION must be true or false. Got: {}", raw),
            },
            None => false,
        };

        Ok(Self {
            provider_type: var("ACME_DNS_PROVIDER")
                .map(|p| p.to_lowercase())
                .unwrap_or_else(|| "cloudflare".to_string()),
            api_token: var("CF_API_TOKEN"),
            api_base: var("CF_API_BASE"),
            http_timeout_secs,
            default_ttl,
            managed_domains: var("MANAGED_DOMAINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            verify_records,
            log_level: var("ACME_DNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "cloudflare" => {
                if self.api_token.is_none() {
                    anyhow::bail!(
                        "CF_API_TOKEN is required for the cloudflare provider. \
                        Set it via: export CF_API_TOKEN=your_token"
                    );
                }
            }
            "manual" => {}
            other => anyhow::bail!(
                "ACME_DNS_PROVIDER '{}' is not supported. \
                Supported providers: cloudflare, manual",
                other
            ),
        }

        if let Some(ref url) = self.api_base
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!("CF_API_BASE must use HTTP or HTTPS scheme. Got: {}", url);
        }

        if !(1..=86400).contains(&self.default_ttl) {
            anyhow::bail!(
                "CF_DEFAULT_TTL must be between 1 and 86400 seconds. Got: {}",
                self.default_ttl
            );
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "CF_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        for domain in &self.managed_domains {
            validate_domain_name(domain)?;
        }

        log_level(&self.log_level)?;

        Ok(())
    }

    /// Core configuration for the selected provider
    fn bridge_config(&self) -> BridgeConfig {
        let provider = match self.provider_type.as_str() {
            "manual" => ProviderConfig::Manual,
            _ => ProviderConfig::Cloudflare {
                api_token: self.api_token.clone().unwrap_or_default(),
                api_base: self.api_base.clone(),
                timeout_secs: Some(self.http_timeout_secs),
            },
        };

        BridgeConfig {
            provider,
            dispatcher: DispatcherConfig {
                default_ttl: self.default_ttl,
                managed_domains: self.managed_domains.clone(),
                verify_records: self.verify_records,
                ..DispatcherConfig::default()
            },
        }
    }
}

/// Parse a log level name
fn log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "ACME_DNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Validate a managed domain name
///
/// Basic RFC 1035 label checks; catches typos in MANAGED_DOMAINS.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return BridgeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return BridgeExitCode::ConfigError.into();
    }

    // Logs go to stderr; stdout carries acknowledgments
    let level = log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BridgeExitCode::ConfigError.into();
    }

    info!("Starting acme-dnsd daemon");
    info!(
        "Configuration loaded: provider={}, default_ttl={}s",
        config.provider_type, config.default_ttl
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BridgeExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => BridgeExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                BridgeExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        acme_dns_provider_cloudflare::register(&registry);
    }

    let bridge = config.bridge_config();
    bridge.validate()?;

    info!("Available providers: {}", registry.list_providers().join(", "));
    let provider: Arc<dyn ProviderClient> = Arc::from(registry.create_provider(&bridge.provider)?);
    info!("Using provider: {}", provider.provider_name());

    let verify_records = bridge.dispatcher.verify_records;
    let (mut dispatcher, mut events) = ChallengeDispatcher::new(provider, bridge.dispatcher)?;

    if verify_records {
        match PropagationChecker::public_resolvers(DEFAULT_SETTLE_DELAY) {
            Ok(checker) => {
                info!("DNS verification enabled (debug mode)");
                dispatcher = dispatcher.with_propagation_checker(checker);
            }
            Err(e) => warn!("DNS resolution checks disabled: {}", e),
        }
    }

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Dispatch event: {:?}", event);
        }
    });

    let shutdown = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    let transport = StdioTransport::stdio();
    info!("Ready to process challenge requests");
    dispatcher
        .run_with_shutdown(&transport, &transport, Some(shutdown_rx))
        .await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Install SIGTERM/SIGINT handlers
///
/// Handlers are registered before returning so startup fails early if the
/// signals cannot be captured. The returned future resolves with the name
/// of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
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

/// Fallback implementation for non-Unix platforms (SIGINT only)
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}
