use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dispatch::{Notice, PendingAction, PubSubCommand};
use crate::errors::TransportError;
use crate::events::ChannelEvent;
use crate::store::Reconciler;
use crate::transport::PubSubTransport;

/// Consumes `PubSubCommand`s on its own thread, calls the transport, and
/// feeds outcomes back: acks re-enter through the reconciler exactly like
/// remote pushes, failures go out as notices. The registry lock is never held
/// across a transport call.
pub struct PubSubWorker {
    transport: Arc<dyn PubSubTransport>,
    reconciler: Reconciler,
    command_rx: Receiver<PubSubCommand>,
    notice_tx: Sender<Notice>,
}

impl PubSubWorker {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        reconciler: Reconciler,
        command_rx: Receiver<PubSubCommand>,
        notice_tx: Sender<Notice>,
    ) -> Self {
        Self {
            transport,
            reconciler,
            command_rx,
            notice_tx,
        }
    }

    pub fn run(self) {
        info!("pubsub worker started");
        while let Ok(command) = self.command_rx.recv() {
            match command {
                PubSubCommand::Post { action, body } => {
                    match self.transport.send_post(&action.jid, &body) {
                        Ok(item) => self.reconciler.apply(ChannelEvent::ItemPushed {
                            jid: action.jid.clone(),
                            item,
                        }),
                        Err(error) => self.fail(action, error),
                    }
                }

                PubSubCommand::Reply {
                    action,
                    parent,
                    body,
                } => match self.transport.send_reply(&action.jid, &parent, &body) {
                    Ok(item) => self.reconciler.apply(ChannelEvent::ItemPushed {
                        jid: action.jid.clone(),
                        item,
                    }),
                    Err(error) => self.fail(action, error),
                },

                PubSubCommand::Retract { action, item_id } => {
                    match self.transport.send_retraction(&action.jid, &item_id) {
                        Ok(()) => self.reconciler.apply(ChannelEvent::ItemRetracted {
                            jid: action.jid.clone(),
                            id: item_id,
                        }),
                        Err(error) => self.fail(action, error),
                    }
                }

                PubSubCommand::UpdateMetadata { action, update } => {
                    match self.transport.send_metadata_update(&action.jid, &update) {
                        Ok(()) => self.reconciler.apply(ChannelEvent::MetadataChanged {
                            jid: action.jid.clone(),
                            update,
                        }),
                        Err(error) => self.fail(action, error),
                    }
                }

                PubSubCommand::Fetch {
                    action,
                    generation,
                    subscription,
                } => match self.transport.fetch_items(&action.jid) {
                    Ok(items) => self.reconciler.apply(ChannelEvent::ItemsFetched {
                        jid: action.jid.clone(),
                        items,
                        generation,
                        subscription,
                    }),
                    Err(error) => self.fail(action, error),
                },

                PubSubCommand::Reload { action, generation } => {
                    match self.transport.fetch_items(&action.jid) {
                        Ok(items) => self.reconciler.apply(ChannelEvent::ChannelReset {
                            jid: action.jid.clone(),
                            items,
                            generation,
                        }),
                        Err(error) => self.fail(action, error),
                    }
                }

                PubSubCommand::LoadSubscriptions => self.load_subscriptions(),

                PubSubCommand::Shutdown => break,
            }
        }
        info!("pubsub worker stopped");
    }

    fn load_subscriptions(&self) {
        let jids = match self.transport.subscriptions() {
            Ok(jids) => jids,
            Err(error) => {
                warn!(%error, "failed to load subscriptions");
                let _ = self
                    .notice_tx
                    .send(Notice::Warning(format!("subscriptions unavailable: {error}")));
                return;
            }
        };

        // Report channels actually loaded, not the raw list length.
        let mut count = 0;
        for jid in jids {
            let generation = match self.reconciler.begin_fetch(&jid) {
                Ok(generation) => generation,
                Err(error) => {
                    warn!(channel = %jid, %error, "skipping invalid subscription entry");
                    continue;
                }
            };
            match self.transport.fetch_items(&jid) {
                Ok(items) => {
                    self.reconciler.apply(ChannelEvent::ItemsFetched {
                        jid,
                        items,
                        generation,
                        subscription: true,
                    });
                    count += 1;
                }
                Err(error) => {
                    warn!(channel = %jid, %error, "failed to fetch subscribed channel");
                    let _ = self
                        .notice_tx
                        .send(Notice::Warning(format!("could not load {jid}: {error}")));
                }
            }
        }
        let _ = self.notice_tx.send(Notice::SubscriptionsLoaded { count });
    }

    fn fail(&self, action: PendingAction, error: TransportError) {
        debug!(kind = %action.kind, channel = %action.jid, %error, "action failed");
        let _ = self.notice_tx.send(Notice::ActionFailed { action, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ActionDispatcher;
    use crate::models::ChannelMetadataUpdate;
    use crate::models::Item;
    use crate::store::{views, ChannelRegistry};
    use crate::transport::MemoryTransport;
    use parking_lot::RwLock;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    struct Harness {
        reconciler: Reconciler,
        dispatcher: ActionDispatcher,
        notice_rx: Receiver<Notice>,
        _worker: std::thread::JoinHandle<()>,
    }

    fn harness(transport: Arc<MemoryTransport>) -> Harness {
        let registry = ChannelRegistry::new("alice@example.com").unwrap();
        let reconciler = Reconciler::new(Arc::new(RwLock::new(registry)));
        let (command_tx, command_rx) = mpsc::channel();
        let (notice_tx, notice_rx) = mpsc::channel();
        let worker = PubSubWorker::new(transport, reconciler.clone(), command_rx, notice_tx);
        let handle = std::thread::spawn(move || worker.run());
        let dispatcher = ActionDispatcher::new(command_tx, reconciler.clone());
        Harness {
            reconciler,
            dispatcher,
            notice_rx,
            _worker: handle,
        }
    }

    fn wait_until(mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(Instant::now() < deadline, "condition not met within timeout");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn a_sent_post_comes_back_through_the_reconciler() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        let h = harness(transport);
        h.reconciler.set_active("alice@example.com");

        h.dispatcher
            .create_post("alice@example.com", "hello world")
            .unwrap();

        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("alice@example.com").unwrap().item_count() == 1);

        let registry = registry.read();
        let own = registry.channel("alice@example.com").unwrap();
        let threads = own.ordered_threads();
        assert_eq!(threads[0].root.content, "hello world");
        assert_eq!(own.unread, 0, "own action on the active channel is already read");
    }

    #[test]
    fn replies_attach_to_their_thread() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        let post = transport.send_post("alice@example.com", "root post").unwrap();
        let h = harness(transport);
        h.dispatcher.load_subscriptions().unwrap();

        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("alice@example.com").unwrap().item_count() == 1);

        h.dispatcher
            .create_reply("alice@example.com", &post.id, "a reply")
            .unwrap();
        wait_until(|| registry.read().channel("alice@example.com").unwrap().item_count() == 2);

        let registry = registry.read();
        let threads = registry.channel("alice@example.com").unwrap().ordered_threads();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies[0].content, "a reply");
    }

    #[test]
    fn failed_actions_surface_a_notice_and_leave_state_untouched() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        transport.add_subscription("lounge@example.com");
        transport.deny_publishing("lounge@example.com");
        let h = harness(transport);
        h.dispatcher.load_subscriptions().unwrap();

        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("lounge@example.com").is_some());

        let action = h.dispatcher.create_post("lounge@example.com", "hi").unwrap();
        let notice = h.notice_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        // The subscription notice may arrive first.
        let notice = match notice {
            Notice::SubscriptionsLoaded { .. } => {
                h.notice_rx.recv_timeout(Duration::from_secs(2)).unwrap()
            }
            other => other,
        };
        match notice {
            Notice::ActionFailed { action: failed, error } => {
                assert_eq!(failed.id, action.id);
                assert!(matches!(error, TransportError::Forbidden(_)));
            }
            other => panic!("unexpected notice: {other:?}"),
        }

        let registry = registry.read();
        assert_eq!(
            registry.channel("lounge@example.com").unwrap().item_count(),
            0,
            "failed action must not be applied optimistically"
        );
    }

    #[test]
    fn subscriptions_loaded_counts_only_successful_fetches() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        transport.add_subscription("bob@example.com");
        transport.add_subscription("not-a-jid");
        let h = harness(transport);

        h.dispatcher.load_subscriptions().unwrap();

        let notice = h.notice_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match notice {
            Notice::SubscriptionsLoaded { count } => {
                assert_eq!(count, 2, "the invalid entry is skipped, not counted");
            }
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn goto_registers_an_ad_hoc_channel_outside_the_sidebar() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        transport.seed_channel(
            "news@example.com",
            vec![Item::new_root("news@example.com", "n1", "news@example.com", 100, "headline")],
        );
        let h = harness(transport);

        h.dispatcher.go_to_channel("news@example.com").unwrap();
        assert!(
            h.reconciler.set_active("news@example.com"),
            "stub is registered as soon as the fetch begins"
        );

        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("news@example.com").unwrap().item_count() == 1);

        let registry = registry.read();
        let order = views::sidebar_order(&registry);
        assert!(order.iter().all(|e| e.jid != "news@example.com"));
        let threads = views::active_channel_threads(&registry);
        assert_eq!(threads[0].root.content, "headline");
    }

    #[test]
    fn force_reload_replaces_local_state_with_the_server_view() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        let h = harness(transport);

        // Local-only item that the server never saw.
        let generation = h.reconciler.begin_fetch("alice@example.com").unwrap();
        h.reconciler.apply(ChannelEvent::ItemsFetched {
            jid: "alice@example.com".into(),
            items: vec![Item::new_root("alice@example.com", "ghost", "alice@example.com", 50, "stale")],
            generation,
            subscription: true,
        });

        h.dispatcher.force_reload("alice@example.com").unwrap();
        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("alice@example.com").unwrap().item_count() == 0);

        let registry = registry.read();
        assert!(registry.channel("alice@example.com").unwrap().item("ghost").is_none());
    }

    #[test]
    fn metadata_updates_round_trip_through_the_worker() {
        let transport = Arc::new(MemoryTransport::new("alice@example.com"));
        let h = harness(transport);

        h.dispatcher
            .update_channel_meta("alice@example.com", ChannelMetadataUpdate::title("Alice"))
            .unwrap();

        let registry = h.reconciler.registry();
        wait_until(|| registry.read().channel("alice@example.com").unwrap().title == "Alice");
    }
}
