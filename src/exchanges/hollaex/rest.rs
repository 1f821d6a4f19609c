use crate::core::errors::HollaexError;
use crate::core::kernel::RestClient;
use crate::exchanges::hollaex::types::{
    HollaexOrder, HollaexOrderBooks, HollaexOrderPage, HollaexTicker, HollaexTrades, OrderRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::instrument;

/// Thin typed wrapper around `RestClient` for the HollaEx API
///
/// Every call is a single request; nothing here retries.
pub struct HollaexRest<R: RestClient> {
    client: R,
}

impl<R: RestClient> HollaexRest<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &R {
        &self.client
    }

    /// Exchange configuration: name, features, supported pairs
    pub async fn get_kit(&self) -> Result<Value, HollaexError> {
        self.client.get_json("/kit", &[], false).await
    }

    /// Coin and pair constants
    pub async fn get_constants(&self) -> Result<Value, HollaexError> {
        self.client.get_json("/constants", &[], false).await
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<HollaexTicker, HollaexError> {
        self.client
            .get_json("/ticker", &[("symbol", symbol)], false)
            .await
    }

    /// Tickers for every pair, keyed by symbol
    pub async fn get_tickers(&self) -> Result<HashMap<String, HollaexTicker>, HollaexError> {
        self.client.get_json("/tickers", &[], false).await
    }

    pub async fn get_orderbook(&self, symbol: &str) -> Result<HollaexOrderBooks, HollaexError> {
        self.client
            .get_json("/orderbook", &[("symbol", symbol)], false)
            .await
    }

    /// Recent public trades, for one pair or all of them
    pub async fn get_trades(&self, symbol: Option<&str>) -> Result<HollaexTrades, HollaexError> {
        let params: Vec<(&str, &str)> = symbol.map(|s| ("symbol", s)).into_iter().collect();
        self.client.get_json("/trades", &params, false).await
    }

    pub async fn get_user(&self) -> Result<Value, HollaexError> {
        self.client.get_json("/user", &[], true).await
    }

    pub async fn get_balance(&self) -> Result<Value, HollaexError> {
        self.client.get_json("/user/balance", &[], true).await
    }

    /// Open and historical orders, optionally for one pair
    pub async fn get_orders(&self, symbol: Option<&str>) -> Result<HollaexOrderPage, HollaexError> {
        let params: Vec<(&str, &str)> = symbol.map(|s| ("symbol", s)).into_iter().collect();
        self.client.get_json("/orders", &params, true).await
    }

    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = %order.side))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<HollaexOrder, HollaexError> {
        let body = serde_json::to_value(order)?;
        self.client.post_json("/order", &body, true).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> Result<HollaexOrder, HollaexError> {
        self.client
            .delete_json("/order", &[("order_id", order_id)], true)
            .await
    }

    /// Cancel every open order on one pair
    ///
    /// The venue requires a symbol; `None` fails before any request is made.
    #[instrument(skip(self))]
    pub async fn cancel_all_orders(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<HollaexOrder>, HollaexError> {
        let symbol = symbol.filter(|s| !s.is_empty()).ok_or_else(|| {
            HollaexError::ValidationError("cancel_all_orders requires a symbol".to_string())
        })?;
        self.client
            .delete_json("/order/all", &[("symbol", symbol)], true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use std::sync::Mutex;

    /// Records calls and answers every request with a canned value
    struct StubRest {
        calls: Mutex<Vec<(String, String, Vec<(String, String)>, bool)>>,
        response: Value,
    }

    impl StubRest {
        fn new(response: Value) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response,
            }
        }

        fn record(&self, method: &str, endpoint: &str, params: &[(&str, &str)], auth: bool) {
            self.calls.lock().unwrap().push((
                method.to_string(),
                endpoint.to_string(),
                params
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                auth,
            ));
        }
    }

    #[async_trait]
    impl RestClient for StubRest {
        async fn get_json<T: DeserializeOwned>(
            &self,
            endpoint: &str,
            query_params: &[(&str, &str)],
            authenticated: bool,
        ) -> Result<T, HollaexError> {
            self.record("GET", endpoint, query_params, authenticated);
            Ok(serde_json::from_value(self.response.clone())?)
        }

        async fn post_json<T: DeserializeOwned>(
            &self,
            endpoint: &str,
            body: &Value,
            authenticated: bool,
        ) -> Result<T, HollaexError> {
            let body = body.to_string();
            self.record("POST", endpoint, &[("body", body.as_str())], authenticated);
            Ok(serde_json::from_value(self.response.clone())?)
        }

        async fn delete_json<T: DeserializeOwned>(
            &self,
            endpoint: &str,
            query_params: &[(&str, &str)],
            authenticated: bool,
        ) -> Result<T, HollaexError> {
            self.record("DELETE", endpoint, query_params, authenticated);
            Ok(serde_json::from_value(self.response.clone())?)
        }
    }

    #[tokio::test]
    async fn test_cancel_all_without_symbol_is_validation_error() {
        let rest = HollaexRest::new(StubRest::new(serde_json::json!([])));
        let result = rest.cancel_all_orders(None).await;
        assert!(matches!(result, Err(HollaexError::ValidationError(_))));
        assert!(rest.client().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_all_with_symbol() {
        let rest = HollaexRest::new(StubRest::new(serde_json::json!([])));
        let cancelled = rest.cancel_all_orders(Some("xht-usdt")).await.unwrap();
        assert!(cancelled.is_empty());

        let calls = rest.client().calls.lock().unwrap();
        assert_eq!(calls[0].0, "DELETE");
        assert_eq!(calls[0].1, "/order/all");
        assert_eq!(calls[0].2, vec![("symbol".to_string(), "xht-usdt".to_string())]);
        assert!(calls[0].3);
    }

    #[tokio::test]
    async fn test_public_endpoints_are_unsigned() {
        let rest = HollaexRest::new(StubRest::new(serde_json::json!({})));
        rest.get_kit().await.unwrap();
        rest.get_trades(None).await.unwrap();

        let calls = rest.client().calls.lock().unwrap();
        assert_eq!(calls[0].1, "/kit");
        assert!(!calls[0].3);
        assert_eq!(calls[1].1, "/trades");
        assert!(calls[1].2.is_empty());
    }

    #[tokio::test]
    async fn test_create_order_posts_body() {
        let order_json = serde_json::json!({
            "id": "o-1",
            "symbol": "xht-usdt",
            "side": "buy",
            "type": "limit",
            "size": 1,
            "price": 0.3
        });
        let rest = HollaexRest::new(StubRest::new(order_json));
        let request = OrderRequest::limit(
            "xht-usdt",
            crate::exchanges::hollaex::types::OrderSide::Buy,
            "1".parse().unwrap(),
            "0.3".parse().unwrap(),
        );

        let order = rest.create_order(&request).await.unwrap();
        assert_eq!(order.id, "o-1");

        let calls = rest.client().calls.lock().unwrap();
        assert_eq!(calls[0].1, "/order");
        assert!(calls[0].2[0].1.contains("\"symbol\":\"xht-usdt\""));
        assert!(calls[0].3);
    }
}
