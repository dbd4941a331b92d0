use super::Item;

/// A root post plus its ordered replies, treated as one orderable unit.
///
/// Threads are derived from a channel's item set on demand and never stored,
/// so they are always consistent with the items they were computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub root: Item,
    /// Replies ordered by publish time ascending, ties broken by id.
    pub replies: Vec<Item>,
}

impl Thread {
    pub fn id(&self) -> &str {
        &self.root.id
    }

    /// Most recent activity in the thread: the max publish time over the root
    /// and all replies. Retracted items keep their original timestamp, so a
    /// retraction never moves the thread relative to its neighbors.
    pub fn last_activity(&self) -> u64 {
        self.replies
            .iter()
            .map(|r| r.published)
            .fold(self.root.published, u64::max)
    }

    /// True while the root is a synthesized stand-in for a post that has not
    /// been fetched yet.
    pub fn pending_root(&self) -> bool {
        self.root.placeholder
    }
}
