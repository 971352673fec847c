//! Snapshot store: the single owner of everything the monitor knows.
//!
//! Channels never hold state of their own; they hand update intents to the
//! store, which applies them and then notifies its observer synchronously.
//! No I/O happens here.

use chrono::{DateTime, Utc};
use synapse_core::dashboard_api::{parse_server_timestamp, HistoryRecord, PositionRecord};
use synapse_core::pnl_stream::PnlFrame;
use synapse_core::{PnlValue, Side};
use tracing::{debug, warn};

pub const STATUS_ERROR_LABEL: &str = "API ERROR";
pub const STATUS_PENDING_LABEL: &str = "WAITING";

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub sl_price: f64,
    pub tp_price: Option<f64>,
    pub trailing_stop: Option<f64>,
    pub strategy: Option<String>,
    pub entry_time: Option<DateTime<Utc>>,
    pub pnl: PnlValue,
    pub mark_price: Option<f64>,
}

impl From<PositionRecord> for Position {
    fn from(record: PositionRecord) -> Self {
        Self {
            entry_time: record
                .entry_timestamp
                .as_deref()
                .and_then(parse_server_timestamp),
            symbol: record.symbol,
            side: record.side,
            quantity: record.quantity,
            entry_price: record.entry_price,
            sl_price: record.sl_price,
            tp_price: record.tp_price,
            trailing_stop: record.tsl_current_stop,
            strategy: record.strategy,
            pnl: PnlValue::Unknown,
            mark_price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub online: bool,
    pub market_trend: String,
    pub detail: Option<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            online: false,
            market_trend: STATUS_PENDING_LABEL.to_string(),
            detail: None,
        }
    }
}

impl StatusSnapshot {
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            online: false,
            market_trend: STATUS_ERROR_LABEL.to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// A closed trade, keyed by (symbol, exit timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub symbol: String,
    pub side: Side,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_time_raw: String,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub strategy: Option<String>,
    pub quantity: Option<f64>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        Self {
            exit_time: parse_server_timestamp(&record.timestamp_exit),
            exit_time_raw: record.timestamp_exit,
            symbol: record.symbol,
            side: record.side,
            pnl: record.pnl,
            pnl_percent: record.pnl_percent,
            strategy: record.strategy,
            quantity: record.quantity,
            entry_price: record.entry_price,
            exit_price: record.exit_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub positions: Vec<Position>,
    pub status: StatusSnapshot,
    pub history: Vec<HistoryEntry>,
}

impl StoreState {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|pos| pos.symbol == symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Pnl(String),
    Positions,
    Status,
    History,
}

/// Receives every settled store mutation, in order.
pub trait StoreObserver {
    fn on_change(&mut self, change: &StoreChange, state: &StoreState);
}

impl StoreObserver for () {
    fn on_change(&mut self, _change: &StoreChange, _state: &StoreState) {}
}

#[derive(Debug, Default)]
pub struct SnapshotStore<O = ()> {
    state: StoreState,
    observer: O,
}

impl SnapshotStore<()> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: StoreObserver> SnapshotStore<O> {
    pub fn with_observer(observer: O) -> Self {
        Self {
            state: StoreState::default(),
            observer,
        }
    }

    pub fn current_state(&self) -> &StoreState {
        &self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.state.position(symbol)
    }

    pub fn pnl_for(&self, symbol: &str) -> Option<PnlValue> {
        self.state.position(symbol).map(|pos| pos.pnl)
    }

    /// Targeted merge of a PnL reading. Returns false (and changes nothing)
    /// when no position with that symbol is held.
    pub fn apply_pnl(&mut self, symbol: &str, value: PnlValue) -> bool {
        let Some(position) = self.position_mut(symbol) else {
            debug!(event = "pnl_dropped", symbol, "no open position for symbol");
            return false;
        };
        position.pnl = value;
        self.notify(StoreChange::Pnl(symbol.to_string()));
        true
    }

    /// Like [`apply_pnl`](Self::apply_pnl), also recording the frame's mark price.
    pub fn apply_frame(&mut self, frame: &PnlFrame) -> bool {
        let Some(position) = self.position_mut(&frame.symbol) else {
            debug!(event = "pnl_dropped", symbol = %frame.symbol, "no open position for symbol");
            return false;
        };
        position.pnl = frame.pnl;
        if frame.price.is_some() {
            position.mark_price = frame.price;
        }
        self.notify(StoreChange::Pnl(frame.symbol.clone()));
        true
    }

    /// Forgets every live reading; used when the push channel goes down.
    pub fn invalidate_pnl(&mut self) -> usize {
        let symbols: Vec<String> = self
            .state
            .positions
            .iter()
            .map(|pos| pos.symbol.clone())
            .collect();
        for position in &mut self.state.positions {
            position.pnl = PnlValue::Unknown;
            position.mark_price = None;
        }
        for symbol in &symbols {
            self.notify(StoreChange::Pnl(symbol.clone()));
        }
        symbols.len()
    }

    /// Replaces the open-position set. Live readings already held for a
    /// symbol that survives the replace are carried over; the pull payload
    /// has no PnL of its own.
    pub fn replace_positions(&mut self, records: Vec<PositionRecord>) {
        let mut next: Vec<Position> = Vec::with_capacity(records.len());
        for record in records {
            let mut position = Position::from(record);
            if let Some(previous) = self.state.position(&position.symbol) {
                position.pnl = previous.pnl;
                position.mark_price = previous.mark_price;
            }
            match next.iter_mut().find(|pos| pos.symbol == position.symbol) {
                Some(existing) => {
                    warn!(event = "duplicate_position", symbol = %position.symbol);
                    *existing = position;
                }
                None => next.push(position),
            }
        }
        self.state.positions = next;
        self.notify(StoreChange::Positions);
    }

    pub fn replace_status(&mut self, status: StatusSnapshot) {
        self.state.status = status;
        self.notify(StoreChange::Status);
    }

    pub fn replace_history(&mut self, entries: Vec<HistoryEntry>) {
        self.state.history = entries;
        self.notify(StoreChange::History);
    }

    fn position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.state
            .positions
            .iter_mut()
            .find(|pos| pos.symbol == symbol)
    }

    fn notify(&mut self, change: StoreChange) {
        self.observer.on_change(&change, &self.state);
    }
}
