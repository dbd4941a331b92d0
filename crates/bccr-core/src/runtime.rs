use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;

use crate::config::CoreConfig;
use crate::dispatch::{ActionDispatcher, Notice, PubSubWorker};
use crate::errors::TransportError;
use crate::events::ChannelEvent;
use crate::store::{ChannelRegistry, Reconciler};
use crate::transport::PubSubTransport;

/// Wires the engine together: the registry behind its lock, the reconciler
/// that owns all writes, and the worker thread driving the transport. The
/// front end holds a `CoreRuntime`, reads through `registry()`, and acts
/// through `dispatcher()`.
pub struct CoreRuntime {
    reconciler: Reconciler,
    dispatcher: ActionDispatcher,
    notice_rx: Option<Receiver<Notice>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl CoreRuntime {
    pub fn new(
        config: &CoreConfig,
        transport: Arc<dyn PubSubTransport>,
    ) -> Result<Self, TransportError> {
        let registry = ChannelRegistry::new(config.jid.clone())?;
        let reconciler = Reconciler::new(Arc::new(RwLock::new(registry)));

        let (command_tx, command_rx) = mpsc::channel();
        let (notice_tx, notice_rx) = mpsc::channel();

        let worker = PubSubWorker::new(transport, reconciler.clone(), command_rx, notice_tx);
        let worker_handle = std::thread::spawn(move || worker.run());

        let dispatcher = ActionDispatcher::new(command_tx, reconciler.clone());
        dispatcher.load_subscriptions()?;

        Ok(Self {
            reconciler,
            dispatcher,
            notice_rx: Some(notice_rx),
            worker_handle: Some(worker_handle),
        })
    }

    pub fn registry(&self) -> Arc<RwLock<ChannelRegistry>> {
        self.reconciler.registry()
    }

    pub fn reconciler(&self) -> Reconciler {
        self.reconciler.clone()
    }

    pub fn dispatcher(&self) -> ActionDispatcher {
        self.dispatcher.clone()
    }

    /// Entry point for the transport's receive side: live pushes, retractions
    /// and metadata changes are fed in here and applied like any other event.
    pub fn push_event(&self, event: ChannelEvent) {
        self.reconciler.apply(event);
    }

    pub fn set_active_channel(&self, jid: &str) -> bool {
        self.reconciler.set_active(jid)
    }

    pub fn take_notice_rx(&mut self) -> Option<Receiver<Notice>> {
        self.notice_rx.take()
    }

    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CoreRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
