/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust request structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{OrderType, Side, SortOrder};

/// Body of `POST /order`.
///
/// Field order is the wire order, and the serialized text is what gets signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub side: Side,
    #[serde(with = "decimal_number")]
    pub size: Decimal,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default, with = "decimal_number::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, with = "decimal_number::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<OrderMeta>,
}

impl CreateOrderRequest {
    pub fn limit(symbol: impl Into<String>, side: Side, size: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            order_type: OrderType::Limit,
            price: Some(price),
            stop: None,
            meta: None,
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            order_type: OrderType::Market,
            price: None,
            stop: None,
            meta: None,
        }
    }

    pub fn with_stop(mut self, stop: Decimal) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn post_only(mut self) -> Self {
        self.meta.get_or_insert_with(OrderMeta::default).post_only = Some(true);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.meta.get_or_insert_with(OrderMeta::default).note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Filters for `GET /orders`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Filters for `GET /user/deposits` and `GET /user/withdrawals`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Filters for `GET /user/trades`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Parameters for `GET /chart`; `from`/`to` are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartQuery {
    pub symbol: String,
    pub resolution: String,
    pub from: i64,
    pub to: i64,
}

/// Body of `POST /user/withdrawal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub currency: String,
    #[serde(with = "decimal_number")]
    pub amount: Decimal,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
}

/// Decimals as JSON numbers: integral values without a fraction, others as `f64`.
mod decimal_number {
    use rust_decimal::Decimal;
    use rust_decimal::prelude::ToPrimitive;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = value.normalize();
        if normalized.scale() == 0 {
            if let Some(int) = normalized.to_i64() {
                return serializer.serialize_i64(int);
            }
        }
        rust_decimal::serde::float::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer)
    }

    pub mod option {
        use rust_decimal::Decimal;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Decimal>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Decimal>, D::Error> {
            rust_decimal::serde::float_option::deserialize(deserializer)
        }
    }
}
