//! Request dispatcher
//!
//! The ChallengeDispatcher is responsible for:
//! - Validating inbound challenge requests
//! - Dropping requests for domains this instance does not manage
//! - Resolving the owning zone and reconciling the TXT record
//! - Producing exactly one acknowledgment per handled request
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ RequestSource │─── payload ───┐
//! └───────────────┘               │
//!                                 ▼
//!                      ┌────────────────────┐
//!                      │ ChallengeDispatcher │
//!                      └────────────────────┘
//!                                 │
//!       ┌──────────────┬──────────┴─────────┬──────────────┐
//!       ▼              ▼                    ▼              ▼
//! ┌────────────┐ ┌──────────────┐ ┌──────────────────┐ ┌─────────┐
//! │ DomainMatch│ │ ZoneResolver │ │ RecordReconciler │ │ AckSink │
//! │ (filter)   │ │ (zone)       │ │ (add / remove)   │ │ (reply) │
//! └────────────┘ └──────────────┘ └──────────────────┘ └─────────┘
//! ```
//!
//! ## Request Flow
//!
//! 1. Parse and validate; malformed requests are always acknowledged
//! 2. Apply the domain filter; unmanaged requests are dropped silently
//!    and left for the instance that manages them
//! 3. Resolve the zone from the record name
//! 4. Add or remove the record and acknowledge the outcome
//!
//! Requests are processed one at a time. Failures are reported, never
//! retried here.

use crate::config::DispatcherConfig;
use crate::domain::DomainMatcher;
use crate::error::{ErrorKind, Result};
use crate::propagation::PropagationChecker;
use crate::reconciler::RecordReconciler;
use crate::request::{AckStatus, Acknowledgment, Action, RawChallengeRequest};
use crate::traits::{AckSink, ProviderClient, RequestSource, Zone};
use crate::zone::ZoneResolver;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the ChallengeDispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A parseable request arrived
    Received {
        action: Option<String>,
        name: Option<String>,
    },

    /// Request dropped by the domain filter
    Skipped { domain: Option<String> },

    /// Acknowledgment produced
    Acknowledged {
        id: Option<Value>,
        status: AckStatus,
        error: Option<ErrorKind>,
    },

    /// Dispatch loop stopped
    Stopped { reason: String },
}

/// Core request dispatcher
///
/// ## Lifecycle
///
/// 1. Create with [`ChallengeDispatcher::new()`]
/// 2. Start with [`ChallengeDispatcher::run()`], or feed payloads directly
///    through [`ChallengeDispatcher::handle_payload()`]
/// 3. The loop runs until a shutdown signal is received or the source ends
///
/// ## Shutdown
///
/// The shutdown signal is only observed between requests. A request that
/// has started is always carried through to its acknowledgment.
pub struct ChallengeDispatcher {
    /// Provider client, for logging
    provider: Arc<dyn ProviderClient>,

    /// Managed-domain filter
    matcher: DomainMatcher,

    /// Zone lookup
    resolver: ZoneResolver,

    /// Record add/remove
    reconciler: RecordReconciler,

    /// TTL applied when a request carries none
    default_ttl: u32,

    /// Re-read records after add (diagnostic)
    verify_records: bool,

    /// DNS resolution check after add, when verification is on
    propagation: Option<PropagationChecker>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<DispatchEvent>,
}

impl ChallengeDispatcher {
    /// Create a new dispatcher
    ///
    /// # Returns
    ///
    /// A tuple of (dispatcher, event_receiver) where event_receiver yields
    /// dispatch events
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        config: DispatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<DispatchEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let matcher = DomainMatcher::new(&config.managed_domains);
        if matcher.handles_all() {
            info!("This instance manages ALL domains (no domain filtering)");
        } else {
            info!(
                "This instance manages domains: {}",
                matcher.managed_domains().join(", ")
            );
        }

        let dispatcher = Self {
            resolver: ZoneResolver::new(Arc::clone(&provider)),
            reconciler: RecordReconciler::new(Arc::clone(&provider)),
            provider,
            matcher,
            default_ttl: config.default_ttl,
            verify_records: config.verify_records,
            propagation: None,
            event_tx: tx,
        };

        Ok((dispatcher, rx))
    }

    /// Resolve added records through `checker` when verification is enabled
    pub fn with_propagation_checker(mut self, checker: PropagationChecker) -> Self {
        self.propagation = Some(checker);
        self
    }

    /// Run the dispatch loop until Ctrl-C or the source ends
    pub async fn run(&self, source: &dyn RequestSource, sink: &dyn AckSink) -> Result<()> {
        self.run_with_shutdown(source, sink, None).await
    }

    /// Run the dispatch loop with an explicit shutdown signal
    ///
    /// # Parameters
    ///
    /// - `shutdown_rx`: Oneshot receiver that stops the loop. When `None`,
    ///   Ctrl-C is used instead. Dropping the sender also stops the loop.
    pub async fn run_with_shutdown(
        &self,
        source: &dyn RequestSource,
        sink: &dyn AckSink,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut requests = source.requests();
        info!(
            "Dispatcher started (provider: {})",
            self.provider.provider_name()
        );

        let reason = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break "Shutdown signal";
                }

                next = requests.next() => {
                    let Some(payload) = next else {
                        info!("Request source closed");
                        break "Request source closed";
                    };

                    if let Some(ack) = self.handle_payload(&payload).await
                        && let Err(e) = sink.publish(&ack).await
                    {
                        // Continue with the next request
                        error!("Failed to publish acknowledgment: {}", e);
                    }
                }
            }
        };

        self.emit_event(DispatchEvent::Stopped {
            reason: reason.to_string(),
        });
        info!("Dispatcher stopped");

        Ok(())
    }

    /// Handle one raw payload
    ///
    /// # Returns
    ///
    /// - `Some(Acknowledgment)`: to be published to the requester
    /// - `None`: the request belongs to another instance
    pub async fn handle_payload(&self, payload: &[u8]) -> Option<Acknowledgment> {
        let ack = match RawChallengeRequest::from_slice(payload) {
            Ok(raw) => self.handle_request(raw).await?,
            Err((id, e)) => {
                warn!("Rejecting malformed payload: {}", e);
                Acknowledgment::rejected(id, &e)
            }
        };

        info!(
            "Acknowledging {} {}: {:?}",
            ack.action.as_deref().unwrap_or("-"),
            ack.name.as_deref().unwrap_or("-"),
            ack.status
        );
        self.emit_event(DispatchEvent::Acknowledged {
            id: ack.id.clone(),
            status: ack.status,
            error: ack.error_kind(),
        });

        Some(ack)
    }

    /// Handle one parsed request
    pub async fn handle_request(&self, raw: RawChallengeRequest) -> Option<Acknowledgment> {
        info!(
            "Received message: {} for {} (domain: {})",
            raw.action.as_deref().unwrap_or("-"),
            raw.name.as_deref().unwrap_or("-"),
            raw.domain.as_deref().unwrap_or("-")
        );
        self.emit_event(DispatchEvent::Received {
            action: raw.echoed_action(),
            name: raw.name.clone(),
        });

        // Validation comes before filtering: malformed requests are always reported
        let request = match raw.clone().validate(self.default_ttl) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request: {}", e);
                return Some(Acknowledgment::error(&raw, None, &e));
            }
        };

        // A request without a domain hint is only handled by unfiltered instances
        let domain_hint = request.domain.as_deref().unwrap_or_default();
        if !self.matcher.should_handle(domain_hint) {
            info!(
                "Skipping message for domain '{}' - not managed by this instance",
                domain_hint
            );
            self.emit_event(DispatchEvent::Skipped {
                domain: request.domain.clone(),
            });
            return None;
        }

        let zone = match self.resolver.resolve_zone(&request.name).await {
            Ok(zone) => zone,
            Err(e) => {
                warn!("{}", e);
                return Some(Acknowledgment::error(&raw, None, &e));
            }
        };

        info!(
            "{} challenge: {} in zone {} (ID: {})",
            request.action.as_str().to_uppercase(),
            request.name,
            zone.name,
            zone.id
        );

        let ack = match request.action {
            Action::Add => {
                match self
                    .reconciler
                    .add_record(&zone, &request.name, &request.value, request.ttl)
                    .await
                {
                    Ok(record) => {
                        if self.verify_records {
                            self.verify_added(&zone, &request.name, &request.value).await;
                        }
                        Acknowledgment::ok(&raw, &zone.id, Some(record.id))
                    }
                    Err(e) => {
                        error!("{}", e);
                        Acknowledgment::error(&raw, Some(&zone.id), &e)
                    }
                }
            }
            Action::Remove => {
                match self
                    .reconciler
                    .remove_record(&zone, &request.name, &request.value)
                    .await
                {
                    Ok(removed) => Acknowledgment::ok(&raw, &zone.id, removed.into_iter().next()),
                    Err(e) => {
                        error!("{}", e);
                        Acknowledgment::error(&raw, Some(&zone.id), &e)
                    }
                }
            }
        };

        Some(ack)
    }

    /// Log diagnostics for a freshly added record
    ///
    /// Never affects the acknowledgment.
    async fn verify_added(&self, zone: &Zone, name: &str, value: &str) {
        info!("Running DNS verification check for {}", name);

        let diagnostics = self.reconciler.verify_record(zone, name, value).await;
        let propagation = match &self.propagation {
            Some(checker) => checker.check(name, value).await,
            None => Default::default(),
        };

        if diagnostics.is_clean() && propagation.is_clean() {
            info!("DNS verification passed for {}", name);
        } else {
            debug!(
                "DNS verification of {} found {} issue(s)",
                name,
                diagnostics.issues.len() + propagation.issues.len()
            );
        }
    }

    /// Emit a dispatch event
    fn emit_event(&self, event: DispatchEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
