/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod public;
pub mod query;
pub mod trade;
pub mod user;

pub use error::{HollaexError, Result};
pub use query::{QueryParams, build_url, to_snake_case};

pub use client::{ClientConfig, HollaexClient};
