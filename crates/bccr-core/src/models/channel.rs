use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Item, Thread};
use crate::errors::TransportError;

/// Channel metadata snapshot, returned by `update_metadata` so callers can
/// show what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMetadata {
    pub title: String,
    pub status: String,
    pub description: String,
}

/// Partial metadata update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMetadataUpdate {
    pub title: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

impl ChannelMetadataUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// What `apply_item` did with a payload. Activity bumps key off any applied
/// payload; unread counting keys off newly observed items only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// First payload observed for this id (or the real payload for a
    /// pending root).
    New,
    /// An existing item's payload was superseded by a newer one.
    Updated,
    /// Duplicate or stale payload, nothing changed.
    Ignored,
}

impl ItemOutcome {
    pub fn is_new(self) -> bool {
        matches!(self, ItemOutcome::New)
    }

    /// True when the item set changed at all.
    pub fn applied(self) -> bool {
        !matches!(self, ItemOutcome::Ignored)
    }
}

/// A content channel: subscription metadata, the item set, and unread/activity
/// state. The item set is owned exclusively by this channel; threads are
/// derived from it on demand.
#[derive(Debug, Clone)]
pub struct Channel {
    pub jid: String,
    pub title: String,
    pub status: String,
    pub description: String,
    pub subscribed: bool,
    pub is_own: bool,
    pub unread: u32,
    /// Max publish time over all items ever applied; monotone.
    pub last_activity: u64,
    items: HashMap<String, Item>,
    /// Bumped for every fetch issued for this channel; stale fetch results
    /// are dropped on arrival (last request wins).
    fetch_generation: u64,
}

impl Channel {
    pub fn new(jid: impl Into<String>) -> Result<Self, TransportError> {
        let jid = jid.into();
        Self::validate_jid(&jid)?;
        Ok(Self {
            jid,
            title: String::new(),
            status: String::new(),
            description: String::new(),
            subscribed: false,
            is_own: false,
            unread: 0,
            last_activity: 0,
            items: HashMap::new(),
            fetch_generation: 0,
        })
    }

    /// Channel addresses are `user@domain` with both halves non-empty.
    pub fn validate_jid(jid: &str) -> Result<(), TransportError> {
        match jid.split_once('@') {
            Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(TransportError::InvalidChannel(jid.to_string())),
        }
    }

    /// Insert or supersede an item. A superseding payload changes the thread
    /// index too, so callers must treat `Updated` as activity even though the
    /// item is not new.
    pub fn apply_item(&mut self, item: Item) -> ItemOutcome {
        if item.channel != self.jid {
            warn!(channel = %self.jid, item_channel = %item.channel, id = %item.id,
                  "dropping item addressed to another channel");
            return ItemOutcome::Ignored;
        }

        match self.items.get(&item.id) {
            None => {
                if let Some(parent) = item.parent.clone() {
                    self.ensure_root(&parent);
                }
                self.items.insert(item.id.clone(), item);
                ItemOutcome::New
            }
            Some(existing) if existing.placeholder && !item.placeholder => {
                debug!(channel = %self.jid, id = %item.id,
                       "merging real payload into pending root");
                if let Some(parent) = item.parent.clone() {
                    self.ensure_root(&parent);
                }
                self.items.insert(item.id.clone(), item);
                ItemOutcome::New
            }
            Some(existing) if !existing.retracted && item.published > existing.published => {
                debug!(channel = %self.jid, id = %item.id, "superseding item with newer payload");
                self.items.insert(item.id.clone(), item);
                ItemOutcome::Updated
            }
            Some(_) => ItemOutcome::Ignored,
        }
    }

    /// Mark an item retracted in place. The item keeps its chronological slot;
    /// neither the thread's nor the channel's activity changes. Returns false
    /// for an unknown id.
    pub fn apply_retraction(&mut self, id: &str) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.retract();
                true
            }
            None => false,
        }
    }

    /// Threads ordered by last activity descending, ties broken by root id
    /// ascending. Recomputed from the item set on every call.
    pub fn ordered_threads(&self) -> Vec<Thread> {
        let mut groups: HashMap<String, Vec<&Item>> = HashMap::new();
        for item in self.items.values() {
            groups
                .entry(self.resolve_root_id(&item.id))
                .or_default()
                .push(item);
        }

        let mut threads = Vec::with_capacity(groups.len());
        for (root_id, members) in groups {
            let Some(root) = self.items.get(&root_id) else {
                continue;
            };
            let mut replies: Vec<Item> = members
                .into_iter()
                .filter(|i| i.id != root_id)
                .cloned()
                .collect();
            replies.sort_by(|a, b| {
                a.published
                    .cmp(&b.published)
                    .then_with(|| a.id.cmp(&b.id))
            });
            threads.push(Thread {
                root: root.clone(),
                replies,
            });
        }

        threads.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.root.id.cmp(&b.root.id))
        });
        threads
    }

    pub fn record_activity(&mut self, timestamp: u64) {
        self.last_activity = self.last_activity.max(timestamp);
    }

    pub fn mark_read(&mut self) {
        self.unread = 0;
    }

    pub fn increment_unread(&mut self) {
        self.unread += 1;
    }

    /// Apply a partial metadata update; returns the previous values.
    pub fn update_metadata(&mut self, update: &ChannelMetadataUpdate) -> ChannelMetadata {
        let previous = ChannelMetadata {
            title: self.title.clone(),
            status: self.status.clone(),
            description: self.description.clone(),
        };
        if let Some(title) = &update.title {
            self.title = title.trim().to_string();
        }
        if let Some(status) = &update.status {
            self.status = status.trim().to_string();
        }
        if let Some(description) = &update.description {
            self.description = description.trim().to_string();
        }
        previous
    }

    /// Discard the entire item set (force reload). Activity is recomputed
    /// from the items applied afterwards.
    pub fn reset_items(&mut self) {
        self.items.clear();
        self.last_activity = 0;
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn begin_fetch(&mut self) -> u64 {
        self.fetch_generation += 1;
        self.fetch_generation
    }

    pub(crate) fn fetch_generation(&self) -> u64 {
        self.fetch_generation
    }

    /// Create a pending root for a reply whose parent is not in the index yet.
    fn ensure_root(&mut self, parent_id: &str) {
        if !self.items.contains_key(parent_id) {
            debug!(channel = %self.jid, id = %parent_id,
                   "reply arrived before its root, creating pending root");
            self.items
                .insert(parent_id.to_string(), Item::pending_root(&self.jid, parent_id));
        }
    }

    /// Walk parent links to the top-level ancestor. Bounded by the item count
    /// so a malformed cycle cannot hang the walk.
    fn resolve_root_id(&self, id: &str) -> String {
        let mut current = id;
        let mut hops = 0usize;
        while let Some(item) = self.items.get(current) {
            match item.parent.as_deref() {
                Some(parent) if hops <= self.items.len() => {
                    current = parent;
                    hops += 1;
                }
                _ => break,
            }
        }
        current.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel::new("alice@example.com").unwrap()
    }

    fn root(ch: &Channel, id: &str, published: u64) -> Item {
        Item::new_root(&ch.jid, id, "alice@example.com", published, format!("post {id}"))
    }

    fn reply(ch: &Channel, id: &str, parent: &str, published: u64) -> Item {
        Item::new_reply(&ch.jid, id, parent, "bob@example.com", published, format!("reply {id}"))
    }

    #[test]
    fn rejects_invalid_addresses() {
        assert!(Channel::new("user@").is_err());
        assert!(Channel::new("@topics.example.com").is_err());
        assert!(Channel::new("no-at-sign").is_err());
        assert!(Channel::new("user@example.com").is_ok());
    }

    #[test]
    fn new_item_is_newly_observed_once() {
        let mut ch = channel();
        let item = root(&ch, "p1", 100);
        assert_eq!(ch.apply_item(item.clone()), ItemOutcome::New);
        assert_eq!(
            ch.apply_item(item),
            ItemOutcome::Ignored,
            "duplicate delivery must not count as new"
        );
        assert_eq!(ch.item_count(), 1);
    }

    #[test]
    fn supersession_replaces_payload_but_is_not_new() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "p1", 100));

        let mut updated = root(&ch, "p1", 200);
        updated.content = "edited".to_string();
        assert_eq!(ch.apply_item(updated), ItemOutcome::Updated);

        let item = ch.item("p1").unwrap();
        assert_eq!(item.content, "edited");
        assert_eq!(item.published, 200);

        // An older payload for the same id is stale and ignored.
        let mut stale = root(&ch, "p1", 150);
        stale.content = "old".to_string();
        assert_eq!(ch.apply_item(stale), ItemOutcome::Ignored);
        assert_eq!(ch.item("p1").unwrap().content, "edited");
    }

    #[test]
    fn retraction_clears_content_in_place() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "p1", 100));
        assert!(ch.apply_retraction("p1"));

        let item = ch.item("p1").unwrap();
        assert!(item.retracted);
        assert!(item.content.is_empty());
        assert_eq!(item.published, 100, "retraction keeps the chronological slot");

        assert!(!ch.apply_retraction("missing"));
    }

    #[test]
    fn replies_are_ordered_by_time_then_id() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "p1", 100));
        ch.apply_item(reply(&ch, "r-b", "p1", 110));
        ch.apply_item(reply(&ch, "r-a", "p1", 110));
        ch.apply_item(reply(&ch, "r-c", "p1", 105));

        let threads = ch.ordered_threads();
        assert_eq!(threads.len(), 1);
        let ids: Vec<&str> = threads[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r-c", "r-a", "r-b"]);
    }

    #[test]
    fn threads_are_ordered_by_last_activity_desc() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "old", 100));
        ch.apply_item(root(&ch, "new", 200));
        ch.apply_item(reply(&ch, "r1", "old", 300));

        let threads = ch.ordered_threads();
        let roots: Vec<&str> = threads.iter().map(|t| t.id()).collect();
        assert_eq!(roots, ["old", "new"], "a fresh reply bumps its thread to the top");
    }

    #[test]
    fn thread_order_ties_break_by_root_id() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "b", 100));
        ch.apply_item(root(&ch, "a", 100));

        let threads = ch.ordered_threads();
        let roots: Vec<&str> = threads.iter().map(|t| t.id()).collect();
        assert_eq!(roots, ["a", "b"]);
    }

    #[test]
    fn retracting_the_newest_reply_keeps_thread_position() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "t1", 100));
        ch.apply_item(reply(&ch, "r1", "t1", 400));
        ch.apply_item(root(&ch, "t2", 200));

        assert_eq!(ch.ordered_threads()[0].id(), "t1");
        ch.apply_retraction("r1");

        let threads = ch.ordered_threads();
        assert_eq!(threads[0].id(), "t1", "retraction must not move the thread");
        assert!(threads[0].replies[0].retracted);
    }

    #[test]
    fn forward_reference_creates_pending_root_and_merges() {
        let mut ch = channel();
        ch.apply_item(reply(&ch, "r1", "p1", 110));

        let threads = ch.ordered_threads();
        assert_eq!(threads.len(), 1, "no orphan thread for the early reply");
        assert!(threads[0].pending_root());
        assert_eq!(threads[0].replies.len(), 1);

        // The real root arrives and merges into the placeholder.
        assert_eq!(ch.apply_item(root(&ch, "p1", 100)), ItemOutcome::New);
        let threads = ch.ordered_threads();
        assert_eq!(threads.len(), 1);
        assert!(!threads[0].pending_root());
        assert_eq!(threads[0].root.content, "post p1");
        assert_eq!(threads[0].replies.len(), 1);

        // Replaying both items changes nothing.
        ch.apply_item(reply(&ch, "r1", "p1", 110));
        ch.apply_item(root(&ch, "p1", 100));
        let threads = ch.ordered_threads();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies.len(), 1);
    }

    #[test]
    fn parent_links_resolve_transitively() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "p1", 100));
        ch.apply_item(reply(&ch, "r1", "p1", 110));
        ch.apply_item(reply(&ch, "r2", "r1", 120));

        let threads = ch.ordered_threads();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id(), "p1");
        let ids: Vec<&str> = threads[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2"]);
    }

    #[test]
    fn metadata_update_is_partial_and_returns_previous() {
        let mut ch = channel();
        ch.update_metadata(&ChannelMetadataUpdate {
            title: Some("Alice".into()),
            status: Some("hi".into()),
            description: Some("a channel".into()),
        });

        let previous = ch.update_metadata(&ChannelMetadataUpdate::status("away "));
        assert_eq!(previous.status, "hi");
        assert_eq!(ch.status, "away");
        assert_eq!(ch.title, "Alice", "unspecified fields stay untouched");
        assert_eq!(ch.description, "a channel");
    }

    #[test]
    fn reset_discards_items_and_activity() {
        let mut ch = channel();
        ch.apply_item(root(&ch, "p1", 100));
        ch.record_activity(100);
        ch.reset_items();

        assert_eq!(ch.item_count(), 0);
        assert_eq!(ch.last_activity, 0);
        assert!(ch.ordered_threads().is_empty());
    }
}
