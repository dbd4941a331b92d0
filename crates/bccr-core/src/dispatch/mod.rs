mod worker;

pub use worker::PubSubWorker;

use std::fmt;
use std::sync::mpsc::Sender;

use uuid::Uuid;

use crate::errors::TransportError;
use crate::models::{Channel, ChannelMetadataUpdate};
use crate::store::Reconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Post,
    Reply,
    Retract,
    UpdateMetadata,
    Reload,
    Goto,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Post => "post",
            ActionKind::Reply => "reply",
            ActionKind::Retract => "retract",
            ActionKind::UpdateMetadata => "update metadata",
            ActionKind::Reload => "reload",
            ActionKind::Goto => "go to channel",
        };
        f.write_str(name)
    }
}

/// Handle for an in-flight user action. Completion arrives through the
/// reconciler (the ack re-enters as an ordinary event); failure arrives as a
/// `Notice` carrying this handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub id: Uuid,
    pub kind: ActionKind,
    pub jid: String,
}

impl PendingAction {
    fn new(kind: ActionKind, jid: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            jid: jid.to_string(),
        }
    }
}

/// Commands consumed by the `PubSubWorker` thread.
#[derive(Debug)]
pub enum PubSubCommand {
    Post {
        action: PendingAction,
        body: String,
    },
    Reply {
        action: PendingAction,
        parent: String,
        body: String,
    },
    Retract {
        action: PendingAction,
        item_id: String,
    },
    UpdateMetadata {
        action: PendingAction,
        update: ChannelMetadataUpdate,
    },
    /// On-demand fetch (goto or subscription refresh), stamped with the fetch
    /// generation obtained when the fetch began.
    Fetch {
        action: PendingAction,
        generation: u64,
        subscription: bool,
    },
    /// Force reload: fetch and replace the channel's item set wholesale.
    Reload {
        action: PendingAction,
        generation: u64,
    },
    /// Load the subscription list and fetch every subscribed channel.
    LoadSubscriptions,
    Shutdown,
}

/// User-visible outcomes that do not flow through the registry.
#[derive(Debug, Clone)]
pub enum Notice {
    ActionFailed {
        action: PendingAction,
        error: TransportError,
    },
    SubscriptionsLoaded {
        count: usize,
    },
    Warning(String),
}

/// Translates user intents into outbound requests. Performs no state
/// mutation itself, with one narrow exception: beginning a fetch registers
/// the stub channel and bumps the fetch generation, via the reconciler, so
/// that repeated navigation is idempotent and stale results can be told
/// apart.
#[derive(Clone)]
pub struct ActionDispatcher {
    command_tx: Sender<PubSubCommand>,
    reconciler: Reconciler,
}

impl ActionDispatcher {
    pub(crate) fn new(command_tx: Sender<PubSubCommand>, reconciler: Reconciler) -> Self {
        Self {
            command_tx,
            reconciler,
        }
    }

    pub fn create_post(&self, jid: &str, body: &str) -> Result<PendingAction, TransportError> {
        Channel::validate_jid(jid)?;
        let action = PendingAction::new(ActionKind::Post, jid);
        self.send(PubSubCommand::Post {
            action: action.clone(),
            body: body.to_string(),
        })?;
        Ok(action)
    }

    pub fn create_reply(
        &self,
        jid: &str,
        parent: &str,
        body: &str,
    ) -> Result<PendingAction, TransportError> {
        Channel::validate_jid(jid)?;
        let action = PendingAction::new(ActionKind::Reply, jid);
        self.send(PubSubCommand::Reply {
            action: action.clone(),
            parent: parent.to_string(),
            body: body.to_string(),
        })?;
        Ok(action)
    }

    pub fn retract(&self, jid: &str, item_id: &str) -> Result<PendingAction, TransportError> {
        Channel::validate_jid(jid)?;
        let action = PendingAction::new(ActionKind::Retract, jid);
        self.send(PubSubCommand::Retract {
            action: action.clone(),
            item_id: item_id.to_string(),
        })?;
        Ok(action)
    }

    pub fn update_channel_meta(
        &self,
        jid: &str,
        update: ChannelMetadataUpdate,
    ) -> Result<PendingAction, TransportError> {
        Channel::validate_jid(jid)?;
        let action = PendingAction::new(ActionKind::UpdateMetadata, jid);
        self.send(PubSubCommand::UpdateMetadata {
            action: action.clone(),
            update,
        })?;
        Ok(action)
    }

    /// View a channel on demand. The stub is registered (unsubscribed) as the
    /// fetch begins; the caller may activate the channel right away.
    pub fn go_to_channel(&self, jid: &str) -> Result<PendingAction, TransportError> {
        let generation = self.reconciler.begin_fetch(jid)?;
        let action = PendingAction::new(ActionKind::Goto, jid);
        self.send(PubSubCommand::Fetch {
            action: action.clone(),
            generation,
            subscription: false,
        })?;
        Ok(action)
    }

    /// Discard the channel's item set and refetch it.
    pub fn force_reload(&self, jid: &str) -> Result<PendingAction, TransportError> {
        let generation = self.reconciler.begin_fetch(jid)?;
        let action = PendingAction::new(ActionKind::Reload, jid);
        self.send(PubSubCommand::Reload {
            action: action.clone(),
            generation,
        })?;
        Ok(action)
    }

    pub fn load_subscriptions(&self) -> Result<(), TransportError> {
        self.send(PubSubCommand::LoadSubscriptions)
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.command_tx.send(PubSubCommand::Shutdown);
    }

    fn send(&self, command: PubSubCommand) -> Result<(), TransportError> {
        self.command_tx
            .send(command)
            .map_err(|_| TransportError::Protocol("dispatcher worker stopped".to_string()))
    }
}
