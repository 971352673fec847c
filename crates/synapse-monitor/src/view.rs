//! Display rows derived from the snapshot store.
//!
//! `DashboardView` is the store's observer. PnL changes patch one row in
//! place through the keyed row index; snapshot replaces rebuild the whole
//! section. The view never writes back into the store.

use crate::store::{HistoryEntry, Position, StatusSnapshot, StoreChange, StoreObserver, StoreState};
use chrono::Local;
use std::collections::HashMap;
use synapse_core::PnlValue;

pub const UNKNOWN_TEXT: &str = "---";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnlClass {
    Profit,
    Loss,
}

impl PnlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PnlClass::Profit => "profit",
            PnlClass::Loss => "loss",
        }
    }
}

pub fn pnl_class(value: f64) -> PnlClass {
    if value >= 0.0 {
        PnlClass::Profit
    } else {
        PnlClass::Loss
    }
}

pub fn format_pnl(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_price(value: f64) -> String {
    format!("{value:.4}")
}

fn format_optional_price(value: Option<f64>) -> String {
    value
        .map(format_price)
        .unwrap_or_else(|| UNKNOWN_TEXT.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlCell {
    pub text: String,
    pub class: Option<PnlClass>,
}

impl PnlCell {
    pub fn from_value(value: PnlValue) -> Self {
        match value {
            PnlValue::Known(v) => Self::known(v),
            PnlValue::Unknown => Self {
                text: UNKNOWN_TEXT.to_string(),
                class: None,
            },
        }
    }

    fn known(value: f64) -> Self {
        Self {
            text: format!("${}", format_pnl(value)),
            class: Some(pnl_class(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRow {
    pub row_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: String,
    pub entry_price: String,
    pub sl_price: String,
    pub tp_price: String,
    pub tsl_price: String,
    pub mark_price: String,
    pub strategy: String,
    pub opened: String,
    pub pnl: PnlCell,
}

impl PositionRow {
    fn build(position: &Position) -> Self {
        Self {
            row_id: position_row_id(&position.symbol),
            symbol: position.symbol.clone(),
            side: position.side.to_string(),
            quantity: position.quantity.to_string(),
            entry_price: format_price(position.entry_price),
            sl_price: format_price(position.sl_price),
            tp_price: format_optional_price(position.tp_price),
            tsl_price: format_optional_price(position.trailing_stop),
            mark_price: format_optional_price(position.mark_price),
            strategy: position
                .strategy
                .clone()
                .unwrap_or_else(|| UNKNOWN_TEXT.to_string()),
            opened: position
                .entry_time
                .map(|at| at.with_timezone(&Local).format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| UNKNOWN_TEXT.to_string()),
            pnl: PnlCell::from_value(position.pnl),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub row_id: String,
    pub exit_time: String,
    pub symbol: String,
    pub side: String,
    pub strategy: String,
    pub pnl: PnlCell,
    pub pnl_percent: String,
}

impl HistoryRow {
    fn build(entry: &HistoryEntry) -> Self {
        Self {
            row_id: format!("hist-{}-{}", entry.symbol, entry.exit_time_raw),
            exit_time: format_exit_time(entry),
            symbol: entry.symbol.clone(),
            side: entry.side.to_string(),
            strategy: entry
                .strategy
                .clone()
                .unwrap_or_else(|| UNKNOWN_TEXT.to_string()),
            pnl: PnlCell::known(entry.pnl),
            pnl_percent: format!("{}%", format_pnl(entry.pnl_percent)),
        }
    }

    /// `$12.50 (3.21%)`
    pub fn pnl_display(&self) -> String {
        format!("{} ({})", self.pnl.text, self.pnl_percent)
    }
}

fn format_exit_time(entry: &HistoryEntry) -> String {
    match entry.exit_time {
        Some(at) => at.with_timezone(&Local).format(TIME_FORMAT).to_string(),
        None => entry.exit_time_raw.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub online: bool,
    pub connectivity: String,
    pub trend: String,
    pub detail: Option<String>,
}

impl StatusView {
    fn build(status: &StatusSnapshot) -> Self {
        Self {
            online: status.online,
            connectivity: if status.online { "ONLINE" } else { "OFFLINE" }.to_string(),
            trend: status.market_trend.clone(),
            detail: status.detail.clone(),
        }
    }
}

impl Default for StatusView {
    fn default() -> Self {
        Self::build(&StatusSnapshot::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpis {
    pub open_positions: usize,
    pub live_pnl_count: usize,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub closed_trades: usize,
    pub winning_trades: usize,
}

impl Kpis {
    fn compute(state: &StoreState) -> Self {
        let live: Vec<f64> = state
            .positions
            .iter()
            .filter_map(|pos| pos.pnl.as_option())
            .collect();
        Self {
            open_positions: state.positions.len(),
            live_pnl_count: live.len(),
            unrealized_pnl: live.iter().sum(),
            realized_pnl: state.history.iter().map(|entry| entry.pnl).sum(),
            closed_trades: state.history.len(),
            winning_trades: state.history.iter().filter(|entry| entry.pnl > 0.0).count(),
        }
    }

    pub fn unrealized_cell(&self) -> PnlCell {
        if self.open_positions > 0 && self.live_pnl_count == 0 {
            return PnlCell::from_value(PnlValue::Unknown);
        }
        PnlCell::known(self.unrealized_pnl)
    }

    pub fn realized_cell(&self) -> PnlCell {
        PnlCell::known(self.realized_pnl)
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.closed_trades == 0 {
            return None;
        }
        Some(self.winning_trades as f64 * 100.0 / self.closed_trades as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub patches: u64,
    pub rebuilds: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    positions: Vec<PositionRow>,
    row_index: HashMap<String, usize>,
    history: Vec<HistoryRow>,
    status: StatusView,
    kpis: Kpis,
    stats: RenderStats,
}

pub fn position_row_id(symbol: &str) -> String {
    format!("pos-{symbol}")
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> &[PositionRow] {
        &self.positions
    }

    pub fn history(&self) -> &[HistoryRow] {
        &self.history
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn kpis(&self) -> &Kpis {
        &self.kpis
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn row(&self, row_id: &str) -> Option<&PositionRow> {
        self.row_index
            .get(row_id)
            .and_then(|idx| self.positions.get(*idx))
    }

    pub fn position_row(&self, symbol: &str) -> Option<&PositionRow> {
        self.row(&position_row_id(symbol))
    }

    fn patch_pnl(&mut self, symbol: &str, state: &StoreState) {
        let Some(idx) = self.row_index.get(&position_row_id(symbol)).copied() else {
            return;
        };
        let Some(position) = state.position(symbol) else {
            return;
        };
        let Some(row) = self.positions.get_mut(idx) else {
            return;
        };
        row.pnl = PnlCell::from_value(position.pnl);
        row.mark_price = format_optional_price(position.mark_price);
        self.kpis = Kpis::compute(state);
        self.stats.patches += 1;
    }

    fn rebuild_positions(&mut self, state: &StoreState) {
        self.positions = state.positions.iter().map(PositionRow::build).collect();
        self.row_index = self
            .positions
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.row_id.clone(), idx))
            .collect();
    }

    fn rebuild_history(&mut self, state: &StoreState) {
        self.history = state.history.iter().map(HistoryRow::build).collect();
    }
}

impl StoreObserver for DashboardView {
    fn on_change(&mut self, change: &StoreChange, state: &StoreState) {
        match change {
            StoreChange::Pnl(symbol) => {
                self.patch_pnl(symbol, state);
                return;
            }
            StoreChange::Positions => self.rebuild_positions(state),
            StoreChange::Status => self.status = StatusView::build(&state.status),
            StoreChange::History => self.rebuild_history(state),
        }
        self.kpis = Kpis::compute(state);
        self.stats.rebuilds += 1;
    }
}
