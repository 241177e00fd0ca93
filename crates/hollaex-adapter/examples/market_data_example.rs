/*
[INPUT]:  Symbol identifier (e.g., "xht-usdt"), optional HOLLAEX_API_KEY/HOLLAEX_API_SECRET
[OUTPUT]: Market data and, with credentials, account balance
[POS]:    Examples - public market data queries and one signed call
[UPDATE]: When adding new market data endpoints
*/

use hollaex_adapter::*;
use tracing_subscriber::EnvFilter;

/// Example: Query market data, then the balance if credentials are set
///
/// Run with `RUST_LOG=hollaex_adapter=debug` to see request signing.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== HollaEx Market Data Example ===\n");

    let client = match HollaexClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let symbol = "xht-usdt";

    println!("Querying ticker for {}...", symbol);
    match client.get_ticker(symbol).await {
        Ok(ticker) => println!("✓ Last: {} (volume {})", ticker.last, ticker.volume),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying order book for {}...", symbol);
    match client.get_orderbook(symbol).await {
        Ok(book) => println!(
            "✓ Best bid: {:?}, best ask: {:?}",
            book.bids.first().map(|l| l.price()),
            book.asks.first().map(|l| l.price())
        ),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying recent trades for {}...", symbol);
    match client.get_trades(Some(symbol)).await {
        Ok(trades) => println!("✓ {} trades", trades.get(symbol).map_or(0, Vec::len)),
        Err(e) => println!("✗ Error: {}", e),
    }

    let credentials = match Credentials::from_env() {
        Some(credentials) => credentials,
        None => {
            println!("\nHOLLAEX_API_KEY/HOLLAEX_API_SECRET not set; skipping signed calls");
            return;
        }
    };
    let client = match client.with_credentials(credentials) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid credentials: {}", e);
            return;
        }
    };

    println!("\nQuerying balance...");
    match client.get_balance().await {
        Ok(balance) => println!("✓ USDT available: {:?}", balance.available("usdt")),
        Err(e) if e.is_auth_error() => println!("✗ Rejected credentials: {}", e),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\n✓ Market data example complete");
}
