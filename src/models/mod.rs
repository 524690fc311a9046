pub mod asset;
pub mod audit;
pub mod order;
pub mod trade;
pub mod user;

pub use asset::Asset;
pub use audit::AuditEntry;
pub use order::{Order, OrderStatus, Side};
pub use trade::Trade;
pub use user::User;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// The fixed set of tradeable symbols. Adding a new one is a compile-time
/// change, matching §6's "compile-time constants; no runtime configuration
/// is required by the core."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Btc => "BTC",
            Symbol::Eth => "ETH",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BTC" => Ok(Symbol::Btc),
            "ETH" => Ok(Symbol::Eth),
            other => Err(EngineError::Validation(format!("unsupported symbol: {other}"))),
        }
    }
}
