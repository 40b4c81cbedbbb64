// # Message Transport Traits
//
// The bridge does not implement a message bus. These traits are the seam
// where one is plugged in: a [`RequestSource`] yields raw challenge request
// payloads and an [`AckSink`] publishes acknowledgments.
//
// ## Usage
//
// ```rust,ignore
// use tokio_stream::StreamExt;
//
// let mut requests = source.requests();
// while let Some(payload) = requests.next().await {
//     if let Some(ack) = dispatcher.handle_payload(&payload).await {
//         sink.publish(&ack).await?;
//     }
// }
// ```

use crate::request::Acknowledgment;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Source of inbound challenge requests
///
/// Each stream item is one message payload, expected to hold a JSON object.
/// Payloads are not parsed here: malformed payloads are reported back to
/// the requester by the dispatcher.
pub trait RequestSource: Send + Sync {
    /// Stream of raw request payloads
    ///
    /// The stream ends when the source is exhausted or closed. Dropping the
    /// stream must release the underlying subscription.
    fn requests(&self) -> Pin<Box<dyn Stream<Item = Vec<u8>> + Send + 'static>>;
}

/// Destination for acknowledgments
#[async_trait]
pub trait AckSink: Send + Sync {
    /// Publish one acknowledgment
    async fn publish(&self, ack: &Acknowledgment) -> Result<(), crate::Error>;
}
