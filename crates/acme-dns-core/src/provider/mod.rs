//! Built-in provider clients
//!
//! - [`ManualProvider`]: log-only provider for dry runs and local testing

mod manual;

pub use manual::{ManualProvider, ManualProviderFactory};
