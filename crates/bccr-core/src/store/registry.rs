use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::info;

use crate::errors::TransportError;
use crate::models::Channel;

/// Owns every known channel, keyed by address, and tracks which one is
/// currently displayed. All mutation goes through the `Reconciler`; readers
/// see the registry behind its lock.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: HashMap<String, Channel>,
    active: Option<String>,
    own_jid: String,
}

impl ChannelRegistry {
    pub fn new(own_jid: impl Into<String>) -> Result<Self, TransportError> {
        let own_jid = own_jid.into();
        let mut own = Channel::new(own_jid.clone())?;
        own.is_own = true;
        own.subscribed = true;

        let mut channels = HashMap::new();
        channels.insert(own_jid.clone(), own);
        Ok(Self {
            channels,
            active: None,
            own_jid,
        })
    }

    pub fn own_jid(&self) -> &str {
        &self.own_jid
    }

    pub fn active_jid(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn channel(&self, jid: &str) -> Option<&Channel> {
        self.channels.get(jid)
    }

    pub(crate) fn channel_mut(&mut self, jid: &str) -> Option<&mut Channel> {
        self.channels.get_mut(jid)
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        self.active.as_deref().and_then(|jid| self.channels.get(jid))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Look up a channel, creating an unsubscribed stub on first reference.
    pub(crate) fn get_or_create(&mut self, jid: &str) -> Result<&mut Channel, TransportError> {
        match self.channels.entry(jid.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let channel = Channel::new(jid)?;
                info!(channel = %jid, "registering channel");
                Ok(entry.insert(channel))
            }
        }
    }

    /// Switch the active channel and clear its unread count. Everything else
    /// is left untouched. Returns false for an unknown address.
    pub(crate) fn set_active(&mut self, jid: &str) -> bool {
        match self.channels.get_mut(jid) {
            Some(channel) => {
                channel.mark_read();
                self.active = Some(jid.to_string());
                true
            }
            None => false,
        }
    }

    /// Register (if needed) the target of a fetch and bump its fetch
    /// generation. The returned generation stamps the eventual result so a
    /// superseded fetch cannot clobber a newer one.
    pub(crate) fn begin_fetch(&mut self, jid: &str) -> Result<u64, TransportError> {
        Ok(self.get_or_create(jid)?.begin_fetch())
    }
}
