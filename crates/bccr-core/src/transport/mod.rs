pub mod memory;

pub use memory::MemoryTransport;

use crate::errors::TransportError;
use crate::models::{ChannelMetadataUpdate, Item};

/// Outbound boundary to the wire protocol. Implementations may block; the
/// dispatcher worker thread owns the only call sites, so the registry lock is
/// never held across a transport call.
///
/// Live pushes are out of band: the transport's receive side feeds
/// `ChannelEvent`s into the runtime directly.
pub trait PubSubTransport: Send + Sync {
    /// The addresses of the user's subscribed channels.
    fn subscriptions(&self) -> Result<Vec<String>, TransportError>;

    /// All items of a channel, in server order.
    fn fetch_items(&self, jid: &str) -> Result<Vec<Item>, TransportError>;

    /// Publish a new root post; the ack carries the item as published.
    fn send_post(&self, jid: &str, body: &str) -> Result<Item, TransportError>;

    /// Publish a reply; the ack carries the item as published.
    fn send_reply(&self, jid: &str, parent: &str, body: &str) -> Result<Item, TransportError>;

    fn send_retraction(&self, jid: &str, id: &str) -> Result<(), TransportError>;

    fn send_metadata_update(
        &self,
        jid: &str,
        update: &ChannelMetadataUpdate,
    ) -> Result<(), TransportError>;
}
