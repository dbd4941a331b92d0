use serde::{Deserialize, Serialize};

/// A single post or reply published into a channel.
///
/// Items are immutable once published; the only in-place mutations are
/// retraction (content cleared, `retracted` set) and supersession (the same id
/// observed again with a newer timestamp replaces the payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Address of the owning channel.
    pub channel: String,
    /// Opaque id, unique within the channel.
    pub id: String,
    /// Set for replies; references the parent item's id.
    pub parent: Option<String>,
    /// Author address.
    pub author: String,
    /// Publish time, unix seconds.
    pub published: u64,
    pub content: String,
    pub retracted: bool,
    /// A root synthesized to host replies that arrived before it. Cleared
    /// when the real payload is observed.
    pub placeholder: bool,
}

impl Item {
    pub fn new_root(
        channel: impl Into<String>,
        id: impl Into<String>,
        author: impl Into<String>,
        published: u64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            id: id.into(),
            parent: None,
            author: author.into(),
            published,
            content: content.into(),
            retracted: false,
            placeholder: false,
        }
    }

    pub fn new_reply(
        channel: impl Into<String>,
        id: impl Into<String>,
        parent: impl Into<String>,
        author: impl Into<String>,
        published: u64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::new_root(channel, id, author, published, content)
        }
    }

    /// A stand-in root for a reply whose parent has not been observed yet.
    pub(crate) fn pending_root(channel: &str, id: &str) -> Self {
        Self {
            channel: channel.to_string(),
            id: id.to_string(),
            parent: None,
            author: String::new(),
            published: 0,
            content: String::new(),
            retracted: false,
            placeholder: true,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent.is_some()
    }

    /// Mark the item removed without giving up its chronological slot.
    pub(crate) fn retract(&mut self) {
        self.retracted = true;
        self.content.clear();
    }
}
