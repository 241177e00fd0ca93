/*
[INPUT]:  Topics to follow, optional HOLLAEX_API_KEY/HOLLAEX_API_SECRET
[OUTPUT]: Printed stream events for ~30 seconds
[POS]:    Examples - streaming session with reconnect and replay
[UPDATE]: When the session API changes
*/

use std::time::Duration;

use hollaex_adapter::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut client = HollaexClient::new()?;
    if let Some(credentials) = Credentials::from_env() {
        client = client.with_credentials(credentials)?;
    }

    let mut session = client.stream()?;
    let mut events = session
        .take_receiver()
        .ok_or_else(|| HollaexError::Config("event receiver already taken".to_string()))?;
    let mut state = session.state_changes();

    let mut topics = vec!["orderbook:xht-usdt", "trade:xht-usdt"];
    if client.has_credentials() {
        topics.extend(["order", "wallet"]);
    }
    session.connect(topics)?;

    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("state: {:?}", *state.borrow());
            }
            event = events.recv() => match event {
                Some(StreamEvent::Message(message)) => println!(
                    "{} {} {}",
                    message.topic,
                    message.symbol.as_deref().unwrap_or("-"),
                    message.action.as_deref().unwrap_or("-")
                ),
                Some(StreamEvent::Other(value)) => println!("server: {value}"),
                None => break,
            },
        }
    }

    if session.is_connected() {
        session.disconnect()?;
    }
    Ok(())
}
