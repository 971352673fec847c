use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub mod dashboard_api;
pub mod pnl_stream;

/// Direction of an open position or a closed trade.
///
/// The trading server speaks in order sides (`BUY`/`SELL`); the monitor
/// presents them as long/short. Both spellings are accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "long" | "buy" => Ok(Side::Long),
            "short" | "sell" => Ok(Side::Short),
            other => Err(format!("Unknown side: {other}")),
        }
    }
}

impl Serialize for Side {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Side::Long => "BUY",
            Side::Short => "SELL",
        };
        serializer.serialize_str(wire)
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Side>().map_err(serde::de::Error::custom)
    }
}

/// A profit/loss reading. `Unknown` is distinct from zero: it means no
/// current data (never received, or invalidated by a push outage).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PnlValue {
    #[default]
    Unknown,
    Known(f64),
}

impl PnlValue {
    pub fn as_option(self) -> Option<f64> {
        match self {
            PnlValue::Known(v) => Some(v),
            PnlValue::Unknown => None,
        }
    }
}
