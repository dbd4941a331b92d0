use crate::models::{ChannelMetadataUpdate, Item};

/// Inbound state changes. Every mutation of the registry arrives as one of
/// these, whether it came from a live push, a fetch result, or the ack of a
/// local action — one code path for all of them.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Result of an on-demand fetch. `generation` is the fetch generation the
    /// request was issued under; stale results are dropped. `subscription`
    /// marks fetches that establish a subscription.
    ItemsFetched {
        jid: String,
        items: Vec<Item>,
        generation: u64,
        subscription: bool,
    },
    /// A live push of a new or updated item.
    ItemPushed { jid: String, item: Item },
    /// A live push retracting an item.
    ItemRetracted { jid: String, id: String },
    /// Title/status/description change.
    MetadataChanged {
        jid: String,
        update: ChannelMetadataUpdate,
    },
    /// Force reload: discard the channel's item set and replace it with a
    /// fresh fetch result.
    ChannelReset {
        jid: String,
        items: Vec<Item>,
        generation: u64,
    },
}

impl ChannelEvent {
    /// Address of the channel the event targets.
    pub fn jid(&self) -> &str {
        match self {
            ChannelEvent::ItemsFetched { jid, .. }
            | ChannelEvent::ItemPushed { jid, .. }
            | ChannelEvent::ItemRetracted { jid, .. }
            | ChannelEvent::MetadataChanged { jid, .. }
            | ChannelEvent::ChannelReset { jid, .. } => jid,
        }
    }
}
