use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// REST API Response Types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HollaexTicker {
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub last: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `[price, size]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HollaexPriceLevel(
    #[serde(with = "rust_decimal::serde::float")] pub Decimal,
    #[serde(with = "rust_decimal::serde::float")] pub Decimal,
);

impl HollaexPriceLevel {
    pub const fn price(&self) -> Decimal {
        self.0
    }

    pub const fn size(&self) -> Decimal {
        self.1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HollaexOrderBook {
    pub bids: Vec<HollaexPriceLevel>,
    pub asks: Vec<HollaexPriceLevel>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Order books keyed by symbol
pub type HollaexOrderBooks = HashMap<String, HollaexOrderBook>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HollaexTrade {
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub side: OrderSide,
    pub timestamp: String,
}

/// Public trades keyed by symbol
pub type HollaexTrades = HashMap<String, Vec<HollaexTrade>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Body of `POST /order`
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub stop: Option<Decimal>,
}

impl OrderRequest {
    pub fn limit(symbol: impl Into<String>, side: OrderSide, size: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            order_type: OrderType::Limit,
            price: Some(price),
            stop: None,
        }
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            order_type: OrderType::Market,
            price: None,
            stop: None,
        }
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Decimal) -> Self {
        self.stop = Some(stop);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HollaexOrder {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub filled: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Paged list returned by `GET /orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HollaexOrderPage {
    pub count: u64,
    pub data: Vec<HollaexOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_limit_order_body() {
        let order = OrderRequest::limit("xht-usdt", OrderSide::Buy, dec("10"), dec("0.25"));
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "symbol": "xht-usdt",
                "side": "buy",
                "size": 10.0,
                "type": "limit",
                "price": 0.25
            })
        );
    }

    #[test]
    fn test_market_order_omits_price() {
        let order = OrderRequest::market("btc-usdt", OrderSide::Sell, dec("0.5"));
        let body = serde_json::to_value(&order).unwrap();
        assert!(body.get("price").is_none());
        assert_eq!(body["type"], "market");
    }

    #[test]
    fn test_orderbook_levels_parse() {
        let raw = r#"{"xht-usdt":{"bids":[[0.2,100]],"asks":[[0.21,50.5]],"timestamp":"2024-01-01T00:00:00.000Z"}}"#;
        let books: HollaexOrderBooks = serde_json::from_str(raw).unwrap();
        let book = &books["xht-usdt"];
        assert_eq!(book.bids[0].price(), dec("0.2"));
        assert_eq!(book.asks[0].size(), dec("50.5"));
    }

    #[test]
    fn test_order_parse_with_missing_optionals() {
        let raw = r#"{"id":"abc","symbol":"xht-usdt","side":"sell","type":"market","size":3}"#;
        let order: HollaexOrder = serde_json::from_str(raw).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.price, None);
        assert_eq!(order.size, dec("3"));
    }
}
