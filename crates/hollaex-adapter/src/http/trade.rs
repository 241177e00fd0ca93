/*
[INPUT]:  Order requests and identifiers with signed credentials
[OUTPUT]: Order records and cancellation results
[POS]:    HTTP layer - order management endpoints (require api-key signature over body)
[UPDATE]: When adding new trading endpoints or changing order flow
*/

use reqwest::Method;

use crate::http::query::QueryParams;
use crate::http::{HollaexClient, Result};
use crate::types::{CreateOrderRequest, Order, OrderQuery, Paginated};

impl HollaexClient {
    /// GET /order?order_id={order_id}
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let params = QueryParams::new().with("order_id", order_id);
        let builder = self.signed_request(Method::GET, "/order", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// GET /orders
    pub async fn get_orders(&self, query: &OrderQuery) -> Result<Paginated<Order>> {
        let params = QueryParams::from_serialize(query)?;
        let builder = self.signed_request(Method::GET, "/orders", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// Create a new order
    ///
    /// POST /order
    /// The JSON body is part of the signed string.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        let body = Self::json_body(request)?;
        let builder = self.signed_request(Method::POST, "/order", None, Some(body))?;
        self.send_json(builder).await
    }

    /// DELETE /order?order_id={order_id}
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        let params = QueryParams::new().with("order_id", order_id);
        let builder = self.signed_request(Method::DELETE, "/order", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// Cancel every open order, optionally for one pair
    ///
    /// DELETE /order/all[?symbol={symbol}]
    pub async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let params = QueryParams::new().with_opt("symbol", symbol);
        let builder = self.signed_request(Method::DELETE, "/order/all", Some(&params), None)?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::{Clock, Credentials};
    use crate::http::{ClientConfig, HollaexClient};
    use crate::types::{CreateOrderRequest, OrderQuery, OrderStatus, Side};

    #[derive(Debug)]
    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn unix_seconds(&self) -> u64 {
            self.0
        }
    }

    fn signed_client(server: &MockServer) -> HollaexClient {
        HollaexClient::with_config(ClientConfig {
            api_url: server.uri(),
            ..ClientConfig::default()
        })
        .expect("client init")
        .with_clock(Arc::new(FixedClock(1_700_000_000)))
        .with_credentials(Credentials::new("K", "S"))
        .expect("credentials")
    }

    const ORDER_JSON: &str = r#"{
        "id": "a1b2",
        "side": "buy",
        "symbol": "xht-usdt",
        "type": "limit",
        "size": 1,
        "filled": 0,
        "price": 0.1,
        "status": "new",
        "created_at": "2024-01-01T00:00:00.000Z"
    }"#;

    #[tokio::test]
    async fn test_create_order_signs_exact_body() {
        let server = MockServer::start().await;
        let body = r#"{"symbol":"xht-usdt","side":"buy","size":1,"type":"limit","price":0.1}"#;

        let _mock = Mock::given(method("POST"))
            .and(path("/v2/order"))
            .and(body_string(body))
            .and(header("api-expires", "1700000060"))
            .and(header(
                "api-signature",
                "fcbbb77a271b7c7cee66dadaa6ed83b2aeb2049e8ff2a57b77cd19a8ada671b9",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(ORDER_JSON, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let order = signed_client(&server)
            .create_order(&CreateOrderRequest::limit(
                "xht-usdt",
                Side::Buy,
                Decimal::ONE,
                Decimal::from_str("0.1").unwrap(),
            ))
            .await
            .expect("create_order");
        assert_eq!(order.id, "a1b2");
        assert_eq!(order.status, Some(OrderStatus::New));
    }

    #[tokio::test]
    async fn test_get_orders_signs_sorted_query() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .and(path("/v2/orders"))
            .and(query_param("symbol", "btc-usdt"))
            .and(query_param("limit", "50"))
            .and(header(
                "api-signature",
                "c40a1c5ba66e79bdbdee1fd08ee7ec811ea7b31629c42b0d9d99993d5fe83c4a",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(r#"{{"count":1,"data":[{ORDER_JSON}]}}"#),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let orders = signed_client(&server)
            .get_orders(&OrderQuery {
                symbol: Some("btc-usdt".to_string()),
                limit: Some(50),
                ..OrderQuery::default()
            })
            .await
            .expect("get_orders");
        assert_eq!(orders.data.len(), 1);

        let received = server.received_requests().await.expect("recorded requests");
        assert_eq!(received[0].url.query(), Some("limit=50&symbol=btc-usdt"));
    }

    #[tokio::test]
    async fn test_cancel_order_uses_delete() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("DELETE"))
            .and(path("/v2/order"))
            .and(query_param("order_id", "a1b2"))
            .and(header("api-key", "K"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(ORDER_JSON, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let order = signed_client(&server).cancel_order("a1b2").await.expect("cancel");
        assert_eq!(order.symbol, "xht-usdt");
    }

    #[tokio::test]
    async fn test_cancel_all_orders_for_symbol() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("DELETE"))
            .and(path("/v2/order/all"))
            .and(query_param("symbol", "xht-usdt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!("[{ORDER_JSON}]"),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let orders = signed_client(&server)
            .cancel_all_orders(Some("xht-usdt"))
            .await
            .expect("cancel all");
        assert_eq!(orders.len(), 1);
    }
}
