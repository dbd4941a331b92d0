use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::errors::TransportError;
use crate::models::{Channel, ChannelMetadataUpdate, Item};
use crate::transport::PubSubTransport;

/// A process-local publish/subscribe service. Stands in for the XMPP backend
/// in tests and in the demo loop of the TUI; the engine cannot tell the
/// difference.
pub struct MemoryTransport {
    user: String,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    channels: HashMap<String, Vec<Item>>,
    subscriptions: Vec<String>,
    /// Channels that refuse publishes from this user.
    forbidden: HashSet<String>,
    next_id: u64,
}

impl MemoryTransport {
    pub fn new(user: impl Into<String>) -> Self {
        let user = user.into();
        let transport = Self {
            user: user.clone(),
            state: Mutex::new(State::default()),
        };
        transport.add_subscription(&user);
        transport
    }

    /// Register a channel in the user's subscription list.
    pub fn add_subscription(&self, jid: &str) {
        let mut state = self.state.lock();
        state.channels.entry(jid.to_string()).or_default();
        if !state.subscriptions.iter().any(|s| s == jid) {
            state.subscriptions.push(jid.to_string());
        }
    }

    /// Pre-load server-side content for a channel.
    pub fn seed_channel(&self, jid: &str, items: Vec<Item>) {
        let mut state = self.state.lock();
        state.channels.entry(jid.to_string()).or_default().extend(items);
    }

    /// Make a channel reject publishes, to exercise the permission path.
    pub fn deny_publishing(&self, jid: &str) {
        self.state.lock().forbidden.insert(jid.to_string());
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn publish(&self, jid: &str, parent: Option<&str>, body: &str) -> Result<Item, TransportError> {
        Channel::validate_jid(jid)?;
        let mut state = self.state.lock();
        if state.forbidden.contains(jid) {
            return Err(TransportError::Forbidden(format!(
                "posting to {jid} is not allowed"
            )));
        }
        if let Some(parent) = parent {
            let known = state
                .channels
                .get(jid)
                .is_some_and(|items| items.iter().any(|i| i.id == parent));
            if !known {
                return Err(TransportError::NotFound(format!(
                    "no item {parent} in {jid}"
                )));
            }
        }
        state.next_id += 1;
        let id = format!("item-{}", state.next_id);
        let item = match parent {
            Some(parent) => Item::new_reply(jid, &id, parent, &self.user, Self::now(), body),
            None => Item::new_root(jid, &id, &self.user, Self::now(), body),
        };
        state
            .channels
            .entry(jid.to_string())
            .or_default()
            .push(item.clone());
        Ok(item)
    }
}

impl PubSubTransport for MemoryTransport {
    fn subscriptions(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.state.lock().subscriptions.clone())
    }

    fn fetch_items(&self, jid: &str) -> Result<Vec<Item>, TransportError> {
        Channel::validate_jid(jid)?;
        self.state
            .lock()
            .channels
            .get(jid)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("unknown channel {jid}")))
    }

    fn send_post(&self, jid: &str, body: &str) -> Result<Item, TransportError> {
        self.publish(jid, None, body)
    }

    fn send_reply(&self, jid: &str, parent: &str, body: &str) -> Result<Item, TransportError> {
        self.publish(jid, Some(parent), body)
    }

    fn send_retraction(&self, jid: &str, id: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let Some(items) = state.channels.get_mut(jid) else {
            return Err(TransportError::NotFound(format!("unknown channel {jid}")));
        };
        match items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.retracted = true;
                item.content.clear();
                Ok(())
            }
            None => Err(TransportError::NotFound(format!("no item {id} in {jid}"))),
        }
    }

    fn send_metadata_update(
        &self,
        jid: &str,
        _update: &ChannelMetadataUpdate,
    ) -> Result<(), TransportError> {
        let state = self.state.lock();
        if state.forbidden.contains(jid) {
            return Err(TransportError::Forbidden(format!(
                "configuring {jid} is not allowed"
            )));
        }
        if state.channels.contains_key(jid) {
            Ok(())
        } else {
            Err(TransportError::NotFound(format!("unknown channel {jid}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_assigns_ids_and_round_trips() {
        let transport = MemoryTransport::new("alice@example.com");
        let post = transport.send_post("alice@example.com", "hello").unwrap();
        let reply = transport
            .send_reply("alice@example.com", &post.id, "hi back")
            .unwrap();
        assert_eq!(reply.parent.as_deref(), Some(post.id.as_str()));

        let items = transport.fetch_items("alice@example.com").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn replying_to_a_missing_item_is_not_found() {
        let transport = MemoryTransport::new("alice@example.com");
        let err = transport
            .send_reply("alice@example.com", "ghost", "hi")
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound(_)));
    }

    #[test]
    fn forbidden_channels_reject_publishes() {
        let transport = MemoryTransport::new("alice@example.com");
        transport.add_subscription("lounge@example.com");
        transport.deny_publishing("lounge@example.com");
        let err = transport.send_post("lounge@example.com", "hi").unwrap_err();
        assert!(matches!(err, TransportError::Forbidden(_)));
    }
}
