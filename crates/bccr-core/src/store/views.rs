//! Pure, read-only projections of the registry for the renderer. Recomputed
//! on every call, never cached across mutations.

use crate::models::Thread;
use crate::store::ChannelRegistry;

/// One row of the channel sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub jid: String,
    pub title: String,
    pub status: String,
    pub unread: u32,
    pub last_activity: u64,
    pub is_active: bool,
    pub is_own: bool,
}

/// Sidebar ordering: the user's own channel always first, then all other
/// subscribed channels by last activity descending, ties broken by address.
/// Ad hoc (unsubscribed) channels are not listed.
pub fn sidebar_order(registry: &ChannelRegistry) -> Vec<SidebarEntry> {
    let active = registry.active_jid();

    let mut rest: Vec<SidebarEntry> = registry
        .channels()
        .filter(|c| c.subscribed && !c.is_own)
        .map(|c| entry(c, active))
        .collect();
    rest.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.jid.cmp(&b.jid))
    });

    let mut entries = Vec::with_capacity(rest.len() + 1);
    if let Some(own) = registry.channel(registry.own_jid()) {
        entries.push(entry(own, active));
    }
    entries.extend(rest);
    entries
}

/// Ordered threads of the active channel; empty when no channel is active.
/// Retracted items stay in place, flagged for the renderer to suppress or
/// mark.
pub fn active_channel_threads(registry: &ChannelRegistry) -> Vec<Thread> {
    registry
        .active_channel()
        .map(|c| c.ordered_threads())
        .unwrap_or_default()
}

fn entry(channel: &crate::models::Channel, active: Option<&str>) -> SidebarEntry {
    SidebarEntry {
        jid: channel.jid.clone(),
        title: channel.title.clone(),
        status: channel.status.clone(),
        unread: channel.unread,
        last_activity: channel.last_activity,
        is_active: active == Some(channel.jid.as_str()),
        is_own: channel.is_own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new("alice@example.com").unwrap()
    }

    fn add_subscribed(registry: &mut ChannelRegistry, jid: &str, last_activity: u64) {
        let channel = registry.get_or_create(jid).unwrap();
        channel.subscribed = true;
        channel.record_activity(last_activity);
    }

    #[test]
    fn own_channel_is_pinned_first() {
        let mut registry = registry();
        registry
            .channel_mut("alice@example.com")
            .unwrap()
            .record_activity(100);
        add_subscribed(&mut registry, "bob@example.com", 500);

        let order = sidebar_order(&registry);
        assert_eq!(order[0].jid, "alice@example.com");
        assert!(order[0].is_own);
        assert_eq!(order[1].jid, "bob@example.com");
    }

    #[test]
    fn subscribed_channels_sort_by_activity_then_address() {
        let mut registry = registry();
        add_subscribed(&mut registry, "carol@example.com", 300);
        add_subscribed(&mut registry, "bob@example.com", 500);
        add_subscribed(&mut registry, "dave@example.com", 300);

        let order: Vec<String> = sidebar_order(&registry)
            .into_iter()
            .map(|e| e.jid)
            .collect();
        assert_eq!(
            order,
            [
                "alice@example.com",
                "bob@example.com",
                "carol@example.com",
                "dave@example.com"
            ]
        );
    }

    #[test]
    fn ad_hoc_channels_are_excluded() {
        let mut registry = registry();
        registry.begin_fetch("lounge@example.com").unwrap();
        registry
            .channel_mut("lounge@example.com")
            .unwrap()
            .record_activity(9_999);

        let order = sidebar_order(&registry);
        assert!(order.iter().all(|e| e.jid != "lounge@example.com"));
    }

    #[test]
    fn active_flag_follows_the_registry() {
        let mut registry = registry();
        add_subscribed(&mut registry, "bob@example.com", 100);
        registry.set_active("bob@example.com");

        let order = sidebar_order(&registry);
        assert!(!order[0].is_active);
        assert!(order[1].is_active);
    }

    #[test]
    fn no_active_channel_means_no_threads() {
        let registry = registry();
        assert!(active_channel_threads(&registry).is_empty());
    }

    #[test]
    fn threads_come_from_the_active_channel_only() {
        let mut registry = registry();
        add_subscribed(&mut registry, "bob@example.com", 100);
        registry
            .channel_mut("bob@example.com")
            .unwrap()
            .apply_item(Item::new_root(
                "bob@example.com",
                "p1",
                "bob@example.com",
                100,
                "hello",
            ));
        registry.set_active("bob@example.com");

        let threads = active_channel_threads(&registry);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].root.content, "hello");
    }
}
