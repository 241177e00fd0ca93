/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{OrderStatus, OrderType, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub open: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub close: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub high: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub low: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub last: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub volume: Decimal,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// One `[price, size]` book level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookLevel(pub Decimal, pub Decimal);

impl OrderbookLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }

    pub fn size(&self) -> Decimal {
        self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub bids: Vec<OrderbookLevel>,
    pub asks: Vec<OrderbookLevel>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTrade {
    pub size: Decimal,
    pub price: Decimal,
    pub side: Side,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub symbol: String,
}

/// Per-currency balances as returned by `/user/balance`.
///
/// The API flattens currencies into keys such as `usdt_balance` and
/// `usdt_available`; those are kept in `entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(flatten)]
    pub entries: BTreeMap<String, Value>,
}

impl Balance {
    /// Total balance for a currency (`<currency>_balance`)
    pub fn total(&self, currency: &str) -> Option<Decimal> {
        self.decimal_entry(&format!("{currency}_balance"))
    }

    /// Available balance for a currency (`<currency>_available`)
    pub fn available(&self, currency: &str) -> Option<Decimal> {
        self.decimal_entry(&format!("{currency}_available"))
    }

    fn decimal_entry(&self, key: &str) -> Option<Decimal> {
        match self.entries.get(key)? {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

/// Deposit or withdrawal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub currency: String,
    #[serde(deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub fee: Decimal,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub processing: bool,
    #[serde(default)]
    pub waiting: bool,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Fill belonging to the authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTrade {
    pub side: Side,
    pub symbol: String,
    pub size: Decimal,
    pub price: Decimal,
    pub timestamp: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub fee_coin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub side: Side,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub size: Decimal,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_or_zero")]
    pub filled: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stop: Option<Decimal>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub fee_coin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default)]
    pub created_by: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

mod serde_helpers {
    use super::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    pub fn deserialize_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Decimal::ZERO);
        }

        if let Some(raw) = value.as_str() {
            if raw.trim().is_empty() {
                return Ok(Decimal::ZERO);
            }
            return Decimal::from_str(raw.trim()).map_err(serde::de::Error::custom);
        }

        if value.is_number() {
            let raw = value.to_string();
            return Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map_err(serde::de::Error::custom);
        }

        Err(serde::de::Error::custom("invalid decimal value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticker_accepts_numbers_and_nulls() {
        let ticker: Ticker = serde_json::from_value(json!({
            "open": 0.1,
            "close": 0.12,
            "high": 0.13,
            "low": null,
            "last": 0.12,
            "volume": 1500,
            "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .expect("ticker should deserialize");

        assert_eq!(ticker.close, Decimal::from_str("0.12").unwrap());
        assert_eq!(ticker.low, Decimal::ZERO);
        assert_eq!(ticker.volume, Decimal::from(1500));
        assert!(ticker.symbol.is_none());
    }

    #[test]
    fn test_balance_reads_flattened_currency_keys() {
        let balance: Balance = serde_json::from_value(json!({
            "updated_at": "2024-01-01T00:00:00.000Z",
            "user_id": 7,
            "usdt_balance": 100.5,
            "usdt_available": 80,
            "xht_balance": "12.25"
        }))
        .expect("balance should deserialize");

        assert_eq!(balance.user_id, Some(7));
        assert_eq!(balance.total("usdt"), Some(Decimal::from_str("100.5").unwrap()));
        assert_eq!(balance.available("usdt"), Some(Decimal::from(80)));
        assert_eq!(balance.total("xht"), Some(Decimal::from_str("12.25").unwrap()));
        assert_eq!(balance.available("btc"), None);
    }

    #[test]
    fn test_order_deserializes_minimal_payload() {
        let order: Order = serde_json::from_value(json!({
            "id": "string",
            "side": "sell",
            "symbol": "xht-usdt",
            "type": "limit",
            "size": 0.1,
            "price": 1,
            "status": "new",
            "created_at": "2024-01-01T00:00:00.000Z"
        }))
        .expect("order should deserialize");

        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.filled, Decimal::ZERO);
        assert_eq!(order.price, Some(Decimal::ONE));
        assert_eq!(order.status, Some(OrderStatus::New));
    }

    #[test]
    fn test_orderbook_levels_are_price_size_pairs() {
        let book: OrderbookSnapshot = serde_json::from_value(json!({
            "bids": [[0.1, 5]],
            "asks": [[0.2, 3]],
            "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .expect("orderbook should deserialize");

        assert_eq!(book.bids[0].price(), Decimal::from_str("0.1").unwrap());
        assert_eq!(book.asks[0].size(), Decimal::from(3));
    }
}
