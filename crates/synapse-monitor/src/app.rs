use crate::pull::{apply_cycle, PullCycle};
use crate::push::{ChannelState, PushEvent};
use crate::store::{SnapshotStore, StoreState};
use crate::view::DashboardView;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::info;

/// Event-loop state. Everything the two channels produce is applied here,
/// one event at a time, so store mutations never interleave.
pub struct App {
    store: SnapshotStore<DashboardView>,
    channel_state: ChannelState,
    server_label: String,
    last_pull_at: Option<DateTime<Local>>,
    status_note: Option<String>,
    help_open: bool,
    history_scroll: u16,
    refresh_requested: bool,
}

impl App {
    pub fn new(server_label: impl Into<String>) -> Self {
        Self {
            store: SnapshotStore::with_observer(DashboardView::new()),
            channel_state: ChannelState::Connecting,
            server_label: server_label.into(),
            last_pull_at: None,
            status_note: None,
            help_open: false,
            history_scroll: 0,
            refresh_requested: false,
        }
    }

    pub fn view(&self) -> &DashboardView {
        self.store.observer()
    }

    pub fn state(&self) -> &StoreState {
        self.store.current_state()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel_state
    }

    pub fn server_label(&self) -> &str {
        &self.server_label
    }

    pub fn last_pull_at(&self) -> Option<DateTime<Local>> {
        self.last_pull_at
    }

    pub fn status_note(&self) -> Option<&str> {
        self.status_note.as_deref()
    }

    pub fn help_open(&self) -> bool {
        self.help_open
    }

    pub fn history_scroll(&self) -> u16 {
        self.history_scroll
    }

    pub fn apply_push_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::Frame(frame) => {
                self.store.apply_frame(&frame);
            }
            PushEvent::State(ChannelState::ClosedPendingReconnect) => {
                let invalidated = self.store.invalidate_pnl();
                if self.channel_state != ChannelState::ClosedPendingReconnect {
                    info!(event = "push_down", invalidated);
                    self.status_note = Some("stream down; live PnL hidden until reconnect".to_string());
                }
                self.channel_state = ChannelState::ClosedPendingReconnect;
            }
            PushEvent::State(ChannelState::Open) => {
                self.channel_state = ChannelState::Open;
                self.status_note = Some("stream connected".to_string());
            }
            PushEvent::State(ChannelState::Connecting) => {
                self.channel_state = ChannelState::Connecting;
            }
        }
    }

    pub fn apply_pull_cycle(&mut self, cycle: PullCycle) {
        let failures = cycle.failures();
        apply_cycle(&mut self.store, cycle);
        self.last_pull_at = Some(Local::now());
        if failures > 0 {
            self.status_note = Some(format!("refresh: {failures}/3 requests failed"));
        }
    }

    /// Returns true when the operator asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('r') => {
                self.refresh_requested = true;
                self.status_note = Some("refresh requested".to_string());
            }
            KeyCode::Char('?') => self.help_open = !self.help_open,
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.view().history().len().saturating_sub(1);
                let max = u16::try_from(last).unwrap_or(u16::MAX);
                self.history_scroll = self.history_scroll.saturating_add(1).min(max);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.history_scroll = self.history_scroll.saturating_sub(1);
            }
            _ => {}
        }
        false
    }

    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }
}
