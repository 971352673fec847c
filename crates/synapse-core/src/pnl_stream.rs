use crate::PnlValue;
use serde_json::Value;
use thiserror::Error;

/// One decoded profit/loss update from the dashboard stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PnlFrame {
    pub symbol: String,
    pub pnl: PnlValue,
    /// Mark price the server used for this reading, when it sends one.
    pub price: Option<f64>,
}

impl PnlFrame {
    pub fn new(symbol: impl Into<String>, pnl: PnlValue) -> Self {
        Self {
            symbol: symbol.into(),
            pnl,
            price: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes a stream text frame.
///
/// `Err` only for text that is not JSON at all. Valid JSON that does not
/// carry both a string `symbol` and a `pnl` field yields `Ok(None)`.
/// `pnl: null` is the explicit unknown sentinel; any other non-numeric
/// `pnl` is treated like a missing field. The symbol is kept verbatim so it
/// only ever matches a position with exactly that symbol.
pub fn decode_pnl_frame(text: &str) -> Result<Option<PnlFrame>, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(map) = value.as_object() else {
        return Ok(None);
    };
    let Some(symbol) = map.get("symbol").and_then(Value::as_str) else {
        return Ok(None);
    };
    if symbol.is_empty() {
        return Ok(None);
    }
    let pnl = match map.get("pnl") {
        Some(Value::Null) => PnlValue::Unknown,
        Some(Value::Number(number)) => match number.as_f64() {
            Some(v) if v.is_finite() => PnlValue::Known(v),
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    let price = map
        .get("price")
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite());
    Ok(Some(PnlFrame {
        symbol: symbol.to_string(),
        pnl,
        price,
    }))
}
