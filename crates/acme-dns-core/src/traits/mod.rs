//! Core traits for the ACME DNS bridge
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ProviderClient`]: Read and mutate TXT records via provider APIs
//! - [`CredentialSource`]: Current provider credential
//! - [`RequestSource`] / [`AckSink`]: Message transport seam

pub mod credential;
pub mod provider_client;
pub mod transport;

pub use credential::{CredentialSource, StaticCredential};
pub use provider_client::{ProviderClient, ProviderClientFactory, TxtRecord, Zone};
pub use transport::{AckSink, RequestSource};
