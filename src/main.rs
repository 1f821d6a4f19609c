use hollaex::core::config::{HollaexConfig, StreamConfig};
use hollaex::{build_rest_client, build_stream_client, EventKind, StreamEvent};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Falls back to the public API when HOLLAEX_API_KEY / HOLLAEX_API_SECRET are unset
    let config = HollaexConfig::from_env("HOLLAEX").unwrap_or_else(|_| HollaexConfig::read_only());

    let rest = build_rest_client(&config)?;
    println!("Fetching xht-usdt ticker...");
    match rest.get_ticker("xht-usdt").await {
        Ok(ticker) => println!("Last: {} (volume {})", ticker.last, ticker.volume),
        Err(e) => println!("Error fetching ticker: {}", e),
    }

    let stream = build_stream_client(&config, StreamConfig::default());
    stream.on(EventKind::Message, |event| {
        if let StreamEvent::Message(frame) = event {
            println!("{}", frame);
        }
    });
    stream.on(EventKind::Reconnecting, |event| {
        println!("{:?}", event);
    });

    let mut topics = vec!["orderbook:xht-usdt", "trade:xht-usdt"];
    if config.has_credentials() {
        topics.extend(["order", "wallet"]);
    }

    stream.connect(&topics).await?;
    tokio::time::sleep(Duration::from_secs(30)).await;
    stream.disconnect().await?;

    Ok(())
}
