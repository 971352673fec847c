use crate::Side;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_PATH: &str = "/api/v1/status";
pub const POSITIONS_PATH: &str = "/api/v1/positions";
pub const HISTORY_PATH: &str = "/api/v1/trade_history";
pub const DASHBOARD_STREAM_PATH: &str = "/ws/dashboard";

pub const ONLINE_STATUS: &str = "online";
pub const UNKNOWN_TREND: &str = "UNKNOWN";

/// `GET /api/v1/status`. On internal failure the server answers
/// `{"status": "error", "message": ...}` with no trend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub market_trend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_online(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(ONLINE_STATUS)
    }

    pub fn trend_label(&self) -> String {
        self.market_trend
            .as_deref()
            .map(str::trim)
            .filter(|trend| !trend.is_empty())
            .unwrap_or(UNKNOWN_TREND)
            .to_string()
    }
}

/// `GET /api/v1/positions`. Live PnL is not part of this payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionsResponse {
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRecord {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub sl_price: f64,
    #[serde(default)]
    pub tp_price: Option<f64>,
    #[serde(default)]
    pub tsl_current_stop: Option<f64>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub entry_timestamp: Option<String>,
}

/// `GET /api/v1/trade_history`, most recent exit first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub timestamp_exit: String,
    pub symbol: String,
    pub side: Side,
    pub pnl: f64,
    pub pnl_percent: f64,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
}

/// Parses server timestamps. RFC 3339 is honoured as-is; naive ISO
/// timestamps (what the server's ORM emits) are taken as UTC.
pub fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_error_shape_is_offline_with_unknown_trend() {
        let status: StatusResponse =
            serde_json::from_str(r#"{"status":"error","message":"redis down"}"#)
                .expect("decode status");
        assert!(!status.is_online());
        assert_eq!(status.trend_label(), UNKNOWN_TREND);
        assert_eq!(status.message.as_deref(), Some("redis down"));
    }

    #[test]
    fn status_online_keeps_trend() {
        let status: StatusResponse = serde_json::from_str(
            r#"{"service":"synapse-trader-api","status":"online","market_trend":"BULLISH"}"#,
        )
        .expect("decode status");
        assert!(status.is_online());
        assert_eq!(status.trend_label(), "BULLISH");
    }

    #[test]
    fn positions_decode_with_optional_fields_missing() {
        let payload = r#"{"positions":[
            {"symbol":"BTCUSDT","side":"BUY","quantity":0.5,"entry_price":26123.456,"sl_price":25000.0},
            {"symbol":"ETHUSDT","side":"SELL","quantity":2,"entry_price":1800,"sl_price":1850,
             "tp_price":1700.5,"strategy":"ema_crossover","tsl_current_stop":null}
        ]}"#;
        let response: PositionsResponse = serde_json::from_str(payload).expect("decode");
        assert!(response.error.is_none());
        assert_eq!(response.positions.len(), 2);
        assert_eq!(response.positions[0].side, Side::Long);
        assert_eq!(response.positions[0].tp_price, None);
        assert_eq!(response.positions[1].side, Side::Short);
        assert_eq!(response.positions[1].tp_price, Some(1700.5));
        assert_eq!(
            response.positions[1].strategy.as_deref(),
            Some("ema_crossover")
        );
    }

    #[test]
    fn positions_error_envelope_is_preserved() {
        let response: PositionsResponse =
            serde_json::from_str(r#"{"positions":[],"error":"state manager offline"}"#)
                .expect("decode");
        assert!(response.positions.is_empty());
        assert_eq!(response.error.as_deref(), Some("state manager offline"));
    }

    #[test]
    fn history_decodes_server_rows() {
        let payload = r#"{"history":[{"id":7,"symbol":"SOLUSDT","strategy":"rsi_momentum",
            "side":"BUY","quantity":10.0,"entry_price":20.0,"exit_price":21.0,"pnl":10.0,
            "pnl_percent":5.0,"timestamp_entry":"2024-03-01T09:00:00",
            "timestamp_exit":"2024-03-01T10:30:00.250000"}]}"#;
        let response: HistoryResponse = serde_json::from_str(payload).expect("decode");
        let row = &response.history[0];
        assert_eq!(row.symbol, "SOLUSDT");
        assert_eq!(row.exit_price, Some(21.0));
        assert_eq!(row.pnl_percent, 5.0);
    }

    #[test]
    fn timestamps_accept_naive_and_rfc3339() {
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 1, 10, 30, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(parse_server_timestamp("2024-03-01T10:30:00"), Some(expected));
        assert_eq!(parse_server_timestamp("2024-03-01 10:30:00"), Some(expected));
        assert_eq!(
            parse_server_timestamp("2024-03-01T12:30:00+02:00"),
            Some(expected)
        );
        assert!(parse_server_timestamp("2024-03-01T10:30:00.5").is_some());
        assert_eq!(parse_server_timestamp("yesterday"), None);
        assert_eq!(parse_server_timestamp("  "), None);
    }
}
