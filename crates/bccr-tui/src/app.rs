use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::RwLock;

use bccr_core::dispatch::{ActionDispatcher, Notice};
use bccr_core::models::{ChannelMetadataUpdate, Item};
use bccr_core::store::{views, ChannelRegistry, Reconciler, SidebarEntry};
use bccr_core::CoreRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Sidebar,
    Threads,
}

#[derive(Debug, Clone)]
pub enum PromptKind {
    NewPost,
    Reply { parent: String },
    Title,
    Status,
    Description,
    Goto,
}

impl PromptKind {
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::NewPost => "New post: ",
            PromptKind::Reply { .. } => "Reply: ",
            PromptKind::Title => "New channel title: ",
            PromptKind::Status => "New status message: ",
            PromptKind::Description => "New channel description: ",
            PromptKind::Goto => "Go to channel: ",
        }
    }
}

/// One selectable line in the threads pane.
#[derive(Debug, Clone)]
pub struct ThreadRow {
    pub item: Item,
    pub is_reply: bool,
    /// Root id of the thread this row belongs to (reply target).
    pub root_id: String,
}

pub struct App {
    registry: Arc<RwLock<ChannelRegistry>>,
    reconciler: Reconciler,
    dispatcher: ActionDispatcher,
    notice_rx: Receiver<Notice>,

    pub pane: Pane,
    pub sidebar_cursor: usize,
    pub thread_cursor: usize,
    pub prompt: Option<(PromptKind, String)>,
    pub status_line: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(runtime: &CoreRuntime, notice_rx: Receiver<Notice>) -> Self {
        Self {
            registry: runtime.registry(),
            reconciler: runtime.reconciler(),
            dispatcher: runtime.dispatcher(),
            notice_rx,
            pane: Pane::Sidebar,
            sidebar_cursor: 0,
            thread_cursor: 0,
            prompt: None,
            status_line: String::new(),
            should_quit: false,
        }
    }

    pub fn sidebar_entries(&self) -> Vec<SidebarEntry> {
        views::sidebar_order(&self.registry.read())
    }

    pub fn thread_rows(&self) -> Vec<ThreadRow> {
        let registry = self.registry.read();
        let mut rows = Vec::new();
        for thread in views::active_channel_threads(&registry) {
            let root_id = thread.root.id.clone();
            rows.push(ThreadRow {
                item: thread.root.clone(),
                is_reply: false,
                root_id: root_id.clone(),
            });
            for reply in &thread.replies {
                rows.push(ThreadRow {
                    item: reply.clone(),
                    is_reply: true,
                    root_id: root_id.clone(),
                });
            }
        }
        rows
    }

    pub fn active_jid(&self) -> Option<String> {
        self.registry.read().active_jid().map(str::to_string)
    }

    pub fn active_header(&self) -> String {
        let registry = self.registry.read();
        match registry.active_channel() {
            Some(channel) if channel.title.is_empty() => channel.jid.clone(),
            Some(channel) => format!("{} - {}", channel.title, channel.description),
            None => "no channel selected".to_string(),
        }
    }

    pub fn drain_notices(&mut self) {
        while let Ok(notice) = self.notice_rx.try_recv() {
            match notice {
                Notice::ActionFailed { action, error } => {
                    self.status_line = format!("{} failed for {}: {error}", action.kind, action.jid);
                }
                Notice::SubscriptionsLoaded { count } => {
                    self.status_line = format!("{count} channel(s) loaded");
                }
                Notice::Warning(text) => self.status_line = text,
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.prompt.take() {
            Some(prompt) => self.handle_prompt_key(prompt, key),
            None => self.handle_normal_key(key),
        }
    }

    fn handle_prompt_key(&mut self, (kind, mut buffer): (PromptKind, String), key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.status_line.clear();
            }
            KeyCode::Enter => {
                let text = buffer.trim().to_string();
                if !text.is_empty() {
                    self.submit_prompt(&kind, &text);
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
                self.prompt = Some((kind, buffer));
            }
            KeyCode::Char(c) => {
                buffer.push(c);
                self.prompt = Some((kind, buffer));
            }
            _ => {
                self.prompt = Some((kind, buffer));
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => {
                self.pane = match self.pane {
                    Pane::Sidebar => Pane::Threads,
                    Pane::Threads => Pane::Sidebar,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Enter => {
                if self.pane == Pane::Sidebar {
                    self.activate_selected_channel();
                }
            }
            KeyCode::Char('n') => self.open_prompt(PromptKind::NewPost),
            KeyCode::Char('r') => {
                if let Some(row) = self.focused_row() {
                    self.open_prompt(PromptKind::Reply {
                        parent: row.root_id,
                    });
                }
            }
            KeyCode::Char('D') => self.retract_focused(),
            KeyCode::Char('t') => self.open_prompt(PromptKind::Title),
            KeyCode::Char('s') => self.open_prompt(PromptKind::Status),
            KeyCode::Char('d') => self.open_prompt(PromptKind::Description),
            KeyCode::Char('g') => self.open_prompt(PromptKind::Goto),
            KeyCode::Char('R') | KeyCode::F(5) => self.reload_active(),
            _ => {}
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) {
        let needs_channel = !matches!(kind, PromptKind::Goto);
        if needs_channel && self.active_jid().is_none() {
            self.status_line = "no active channel".to_string();
            return;
        }
        self.prompt = Some((kind, String::new()));
    }

    fn submit_prompt(&mut self, kind: &PromptKind, text: &str) {
        let result = match kind {
            PromptKind::Goto => self.dispatcher.go_to_channel(text).map(|action| {
                self.reconciler.set_active(text);
                action
            }),
            other => {
                let Some(jid) = self.active_jid() else {
                    self.status_line = "no active channel".to_string();
                    return;
                };
                match other {
                    PromptKind::NewPost => self.dispatcher.create_post(&jid, text),
                    PromptKind::Reply { parent } => {
                        self.dispatcher.create_reply(&jid, parent, text)
                    }
                    PromptKind::Title => self
                        .dispatcher
                        .update_channel_meta(&jid, ChannelMetadataUpdate::title(text)),
                    PromptKind::Status => self
                        .dispatcher
                        .update_channel_meta(&jid, ChannelMetadataUpdate::status(text)),
                    PromptKind::Description => self
                        .dispatcher
                        .update_channel_meta(&jid, ChannelMetadataUpdate::description(text)),
                    PromptKind::Goto => unreachable!("handled above"),
                }
            }
        };
        match result {
            Ok(action) => self.status_line = format!("{}...", action.kind),
            Err(error) => self.status_line = error.to_string(),
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = match self.pane {
            Pane::Sidebar => self.sidebar_entries().len(),
            Pane::Threads => self.thread_rows().len(),
        };
        if len == 0 {
            return;
        }
        let cursor = match self.pane {
            Pane::Sidebar => &mut self.sidebar_cursor,
            Pane::Threads => &mut self.thread_cursor,
        };
        *cursor = cursor
            .saturating_add_signed(delta)
            .min(len - 1);
    }

    fn activate_selected_channel(&mut self) {
        let entries = self.sidebar_entries();
        if let Some(entry) = entries.get(self.sidebar_cursor) {
            if self.reconciler.set_active(&entry.jid) {
                self.thread_cursor = 0;
                self.status_line = format!("Displaying channel {}", entry.jid);
            }
        }
    }

    fn focused_row(&self) -> Option<ThreadRow> {
        self.thread_rows().get(self.thread_cursor).cloned()
    }

    fn retract_focused(&mut self) {
        let Some(row) = self.focused_row() else {
            return;
        };
        let Some(jid) = self.active_jid() else {
            return;
        };
        match self.dispatcher.retract(&jid, &row.item.id) {
            Ok(_) => self.status_line = format!("retracting {}", row.item.id),
            Err(error) => self.status_line = error.to_string(),
        }
    }

    fn reload_active(&mut self) {
        let Some(jid) = self.active_jid() else {
            return;
        };
        match self.dispatcher.force_reload(&jid) {
            Ok(_) => self.status_line = format!("reloading {jid}"),
            Err(error) => self.status_line = error.to_string(),
        }
    }
}
