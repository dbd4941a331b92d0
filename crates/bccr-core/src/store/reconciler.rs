use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::errors::TransportError;
use crate::events::ChannelEvent;
use crate::store::ChannelRegistry;

/// The single writer. Every inbound state change — fetch results, live
/// pushes, retractions, metadata changes, local action acks — is applied here
/// under one write lock, so readers always see a channel's thread index,
/// activity and unread state move together.
///
/// Malformed or out-of-sequence events are logged and dropped; they never
/// corrupt registry invariants or escape as errors.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<RwLock<ChannelRegistry>>,
}

impl Reconciler {
    pub fn new(registry: Arc<RwLock<ChannelRegistry>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<RwLock<ChannelRegistry>> {
        self.registry.clone()
    }

    /// Switch the active channel, clearing its unread count.
    pub fn set_active(&self, jid: &str) -> bool {
        self.registry.write().set_active(jid)
    }

    /// Register the target of an upcoming fetch (stub channel on first
    /// reference) and obtain the generation the result must carry.
    pub fn begin_fetch(&self, jid: &str) -> Result<u64, TransportError> {
        self.registry.write().begin_fetch(jid)
    }

    pub fn apply(&self, event: ChannelEvent) {
        let mut registry = self.registry.write();
        match event {
            ChannelEvent::ItemsFetched {
                jid,
                items,
                generation,
                subscription,
            } => {
                let Some(channel) = registry.channel_mut(&jid) else {
                    warn!(channel = %jid, "dropping fetch result for unknown channel");
                    return;
                };
                if generation != channel.fetch_generation() {
                    debug!(channel = %jid, generation,
                           current = channel.fetch_generation(),
                           "dropping superseded fetch result");
                    return;
                }
                if subscription {
                    channel.subscribed = true;
                }
                // Initial load is not "new": activity is recorded, unread is
                // left alone.
                for item in items {
                    let published = item.published;
                    if channel.apply_item(item).applied() {
                        channel.record_activity(published);
                    }
                }
            }

            ChannelEvent::ItemPushed { jid, item } => {
                let is_active = registry.active_jid() == Some(jid.as_str());
                let Some(channel) = registry.channel_mut(&jid) else {
                    warn!(channel = %jid, id = %item.id,
                          "dropping pushed item for unknown channel");
                    return;
                };
                let published = item.published;
                let id = item.id.clone();
                let outcome = channel.apply_item(item);
                // A superseding payload moves the thread, so the channel's
                // activity must move with it; only newly observed items on
                // subscribed channels count as unread.
                if outcome.applied() {
                    channel.record_activity(published);
                    debug!(channel = %jid, id = %id, "applied pushed item");
                }
                if outcome.is_new() && !is_active && channel.subscribed {
                    channel.increment_unread();
                }
            }

            ChannelEvent::ItemRetracted { jid, id } => {
                let Some(channel) = registry.channel_mut(&jid) else {
                    warn!(channel = %jid, id = %id,
                          "dropping retraction for unknown channel");
                    return;
                };
                if channel.apply_retraction(&id) {
                    debug!(channel = %jid, id = %id, "retracted item");
                } else {
                    warn!(channel = %jid, id = %id, "dropping retraction of unknown item");
                }
            }

            ChannelEvent::MetadataChanged { jid, update } => {
                let Some(channel) = registry.channel_mut(&jid) else {
                    warn!(channel = %jid, "dropping metadata change for unknown channel");
                    return;
                };
                let previous = channel.update_metadata(&update);
                debug!(channel = %jid, ?previous, "applied metadata change");
            }

            ChannelEvent::ChannelReset {
                jid,
                items,
                generation,
            } => {
                let Some(channel) = registry.channel_mut(&jid) else {
                    warn!(channel = %jid, "dropping reset for unknown channel");
                    return;
                };
                if generation != channel.fetch_generation() {
                    debug!(channel = %jid, generation, "dropping superseded reset");
                    return;
                }
                channel.reset_items();
                for item in items {
                    let published = item.published;
                    if channel.apply_item(item).applied() {
                        channel.record_activity(published);
                    }
                }
                debug!(channel = %jid, count = channel.item_count(), "channel reset");
            }
        }
    }
}
