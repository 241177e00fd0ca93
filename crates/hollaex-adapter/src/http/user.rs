/*
[INPUT]:  Query filters and signed credentials
[OUTPUT]: User account data (profile, balances, transfers, fills)
[POS]:    HTTP layer - user data endpoints (require api-key signature)
[UPDATE]: When adding new user endpoints or changing query parameters
*/

// ### User Endpoints

use reqwest::Method;
use serde_json::Value;

use crate::http::query::QueryParams;
use crate::http::{HollaexClient, Result};
use crate::types::{Balance, Paginated, TradeQuery, Transfer, TransferQuery, UserTrade, WithdrawalRequest};

impl HollaexClient {
    /// Profile of the authenticated user
    ///
    /// GET /user
    pub async fn get_user(&self) -> Result<Value> {
        let builder = self.signed_request(Method::GET, "/user", None, None)?;
        self.send_json(builder).await
    }

    /// GET /user/balance
    pub async fn get_balance(&self) -> Result<Balance> {
        let builder = self.signed_request(Method::GET, "/user/balance", None, None)?;
        self.send_json(builder).await
    }

    /// GET /user/deposits
    pub async fn get_deposits(&self, query: &TransferQuery) -> Result<Paginated<Transfer>> {
        let params = QueryParams::from_serialize(query)?;
        let builder = self.signed_request(Method::GET, "/user/deposits", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// GET /user/withdrawals
    pub async fn get_withdrawals(&self, query: &TransferQuery) -> Result<Paginated<Transfer>> {
        let params = QueryParams::from_serialize(query)?;
        let builder = self.signed_request(Method::GET, "/user/withdrawals", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// Fills of the authenticated user
    ///
    /// GET /user/trades
    pub async fn get_user_trades(&self, query: &TradeQuery) -> Result<Paginated<UserTrade>> {
        let params = QueryParams::from_serialize(query)?;
        let builder = self.signed_request(Method::GET, "/user/trades", Some(&params), None)?;
        self.send_json(builder).await
    }

    /// POST /user/withdrawal
    pub async fn make_withdrawal(&self, request: &WithdrawalRequest) -> Result<Value> {
        let body = Self::json_body(request)?;
        let builder = self.signed_request(Method::POST, "/user/withdrawal", None, Some(body))?;
        self.send_json(builder).await
    }
}
