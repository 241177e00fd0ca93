/*
[INPUT]:  Symbol identifiers and query parameters
[OUTPUT]: Market data (exchange info, tickers, order books, trades, candles)
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use std::collections::HashMap;

use reqwest::Method;
use serde_json::Value;

use crate::http::query::QueryParams;
use crate::http::{HollaexClient, HollaexError, Result};
use crate::types::{Candle, ChartQuery, OrderbookSnapshot, PublicTrade, Ticker};

impl HollaexClient {
    /// Exchange configuration and branding
    ///
    /// GET /kit
    pub async fn get_kit(&self) -> Result<Value> {
        let builder = self.public_request(Method::GET, "/kit", None)?;
        self.send_json(builder).await
    }

    /// Coins, pairs and limits
    ///
    /// GET /constants
    pub async fn get_constants(&self) -> Result<Value> {
        let builder = self.public_request(Method::GET, "/constants", None)?;
        self.send_json(builder).await
    }

    /// GET /ticker?symbol={symbol}
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let params = QueryParams::new().with("symbol", symbol);
        let builder = self.public_request(Method::GET, "/ticker", Some(&params))?;
        self.send_json(builder).await
    }

    /// Tickers for every pair, keyed by symbol
    ///
    /// GET /tickers
    pub async fn get_tickers(&self) -> Result<HashMap<String, Ticker>> {
        let builder = self.public_request(Method::GET, "/tickers", None)?;
        self.send_json(builder).await
    }

    /// Order book for one pair.
    ///
    /// GET /orderbook?symbol={symbol}
    /// The response is keyed by symbol; the entry for `symbol` is returned.
    pub async fn get_orderbook(&self, symbol: &str) -> Result<OrderbookSnapshot> {
        let params = QueryParams::new().with("symbol", symbol);
        let builder = self.public_request(Method::GET, "/orderbook", Some(&params))?;
        let mut books: HashMap<String, OrderbookSnapshot> = self.send_json(builder).await?;
        books.remove(symbol).ok_or_else(|| {
            HollaexError::InvalidResponse(format!("order book response has no entry for {symbol}"))
        })
    }

    /// GET /orderbooks
    pub async fn get_orderbooks(&self) -> Result<HashMap<String, OrderbookSnapshot>> {
        let builder = self.public_request(Method::GET, "/orderbooks", None)?;
        self.send_json(builder).await
    }

    /// Recent public trades keyed by symbol
    ///
    /// GET /trades[?symbol={symbol}]
    pub async fn get_trades(&self, symbol: Option<&str>) -> Result<HashMap<String, Vec<PublicTrade>>> {
        let params = QueryParams::new().with_opt("symbol", symbol);
        let builder = self.public_request(Method::GET, "/trades", Some(&params))?;
        self.send_json(builder).await
    }

    /// GET /chart?symbol=&resolution=&from=&to=
    pub async fn get_chart(&self, query: &ChartQuery) -> Result<Vec<Candle>> {
        let params = QueryParams::from_serialize(query)?;
        let builder = self.public_request(Method::GET, "/chart", Some(&params))?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, HollaexClient, HollaexError};
    use crate::types::{ChartQuery, Side};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HollaexClient {
        HollaexClient::with_config(ClientConfig {
            api_url: server.uri(),
            ..ClientConfig::default()
        })
        .expect("client init")
    }

    #[tokio::test]
    async fn test_get_ticker() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "open": 0.1,
            "close": 0.105,
            "high": 0.11,
            "low": 0.09,
            "last": 0.105,
            "volume": 12000,
            "timestamp": "2024-01-01T00:00:00.000Z"
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/v2/ticker"))
            .and(query_param("symbol", "xht-usdt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let ticker = client_for(&server)
            .get_ticker("xht-usdt")
            .await
            .expect("get_ticker failed");

        assert_eq!(ticker.close, Decimal::from_str("0.105").unwrap());
        assert_eq!(ticker.volume, Decimal::from(12000));
    }

    #[tokio::test]
    async fn test_public_requests_are_unsigned() {
        let server = MockServer::start().await;

        // any auth header on a public call is a failure
        Mock::given(header_exists("api-key"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/constants"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"coins":{}}"#, "application/json"))
            .mount(&server)
            .await;

        let constants = client_for(&server)
            .get_constants()
            .await
            .expect("get_constants failed");
        assert!(constants.get("coins").is_some());
    }

    #[tokio::test]
    async fn test_get_orderbook_extracts_symbol_entry() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "xht-usdt": {
                "bids": [[0.1, 10], [0.09, 5]],
                "asks": [[0.11, 3]],
                "timestamp": "2024-01-01T00:00:00.000Z"
            }
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/v2/orderbook"))
            .and(query_param("symbol", "xht-usdt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let book = client.get_orderbook("xht-usdt").await.expect("orderbook");
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.asks[0].price(), Decimal::from_str("0.11").unwrap());
    }

    #[tokio::test]
    async fn test_get_orderbook_missing_symbol() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .and(path("/v2/orderbook"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_orderbook("btc-usdt").await.unwrap_err();
        assert!(matches!(err, HollaexError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_get_trades_without_symbol() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "xht-usdt": [
                { "size": 2, "price": 0.1, "side": "sell", "timestamp": "2024-01-01T00:00:00.000Z" }
            ]
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/v2/trades"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .mount(&server)
            .await;

        let trades = client_for(&server).get_trades(None).await.expect("trades");
        let received = server.received_requests().await.expect("recorded requests");
        assert_eq!(received[0].url.query(), None);
        assert_eq!(trades["xht-usdt"][0].side, Side::Sell);
    }

    #[tokio::test]
    async fn test_get_chart() {
        let server = MockServer::start().await;
        let mock_response = r#"[
            {
                "time": "2024-01-01T00:00:00.000Z",
                "open": 0.1, "high": 0.12, "low": 0.09, "close": 0.11,
                "volume": 100, "symbol": "xht-usdt"
            }
        ]"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/v2/chart"))
            .and(query_param("symbol", "xht-usdt"))
            .and(query_param("resolution", "1D"))
            .and(query_param("from", "1700000000"))
            .and(query_param("to", "1700086400"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let candles = client_for(&server)
            .get_chart(&ChartQuery {
                symbol: "xht-usdt".to_string(),
                resolution: "1D".to_string(),
                from: 1_700_000_000,
                to: 1_700_086_400,
            })
            .await
            .expect("chart");
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, Decimal::from_str("0.11").unwrap());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_kit().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, HollaexError::Api { code: 503, .. }));
    }
}
