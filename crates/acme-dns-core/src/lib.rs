// # acme-dns-core
//
// Core library for the ACME dns-01 challenge bridge.
//
// ## Architecture Overview
//
// This library turns "add/remove this TXT record" requests into DNS
// provider API calls:
// - **DomainMatcher**: Decides whether this instance manages a domain
// - **ZoneResolver**: Finds the provider zone owning a record name
// - **RecordReconciler**: Idempotent, exact-match add/remove of TXT records
// - **PropagationChecker**: Optional post-add DNS resolution diagnostics
// - **ProviderClient**: Trait for provider APIs (Cloudflare, manual)
// - **ChallengeDispatcher**: Validates, filters, routes and acknowledges requests
// - **ProviderRegistry**: Selects a provider client from configuration
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and transport implementations
// 2. **Stateless**: The provider is the source of truth; nothing is cached between requests
// 3. **Idempotency**: Repeated add/remove requests converge to the same DNS state
// 4. **Minimal Mutation**: Only records whose content matches exactly are ever touched
// 5. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod propagation;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod request;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{BridgeConfig, DispatcherConfig, ProviderConfig};
pub use dispatcher::{ChallengeDispatcher, DispatchEvent};
pub use domain::DomainMatcher;
pub use error::{Error, ErrorKind, Result};
pub use propagation::{PropagationChecker, PropagationReport, TxtLookup};
pub use provider::ManualProvider;
pub use reconciler::{RecordDiagnostics, RecordReconciler};
pub use registry::ProviderRegistry;
pub use request::{AckStatus, Acknowledgment, Action, ChallengeRequest, RawChallengeRequest};
pub use traits::{AckSink, CredentialSource, ProviderClient, RequestSource, StaticCredential, TxtRecord, Zone};
pub use zone::ZoneResolver;
