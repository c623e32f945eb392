//! Relay listener CLI
//!
//! Subscribes to a RecipeMaster relay, prints every event it receives and
//! publishes each line typed on stdin as a `test` event to the other peers.

use std::time::Duration;

use clap::Parser;
use recipemaster_client::config::{ConfigError, DEFAULT_RECONNECT_DELAY, DEFAULT_RELAY_URL};
use recipemaster_client::{ClientConfig, ClientError, ConnectionState, Subscription};
use recipemaster_shared::{Event, RecipeEvent};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "recipemaster-listen", about = "Watch RecipeMaster notifications")]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, env = "RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    url: String,

    /// Delay before reconnecting after the connection drops (milliseconds)
    #[arg(long, env = "RECONNECT_DELAY_MS", default_value_t = DEFAULT_RECONNECT_DELAY.as_millis() as u64)]
    reconnect_delay_ms: u64,

    /// Print raw JSON instead of notification text
    #[arg(long)]
    raw: bool,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::new(self.url.clone())
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
            .validated()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = args.client_config()?;
    let raw = args.raw;
    let subscription = Subscription::connect(config, move |event| print_event(&event, raw));

    // Report connection changes on stderr
    let mut states = subscription.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            eprintln!("[{state}]");
            if state == ConnectionState::Closed {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if !line.trim().is_empty() => {
                    match subscription.publish(&test_event(line.trim())?) {
                        Ok(()) => {}
                        Err(ClientError::NotConnected) => eprintln!("not connected, message dropped"),
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    subscription.close().await;
    Ok(())
}

fn test_event(message: &str) -> anyhow::Result<Event> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    Ok(Event::new("test")
        .with_field("message", message)
        .with_field("timestamp", timestamp))
}

fn print_event(event: &Event, raw: bool) {
    if !raw {
        if let Ok(recipe) = RecipeEvent::from_event(event) {
            println!("{}", recipe.summary());
            return;
        }
    }
    match event.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to print event"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_args_build_validated_config() {
        let args = Args::try_parse_from([
            "recipemaster-listen",
            "--url",
            "ws://relay.local:4000/",
            "--reconnect-delay-ms",
            "250",
        ])
        .unwrap();
        let config = args.client_config().unwrap();
        assert_eq!(config.url, "ws://relay.local:4000/");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_args_reject_invalid_config() {
        let args = Args::try_parse_from([
            "recipemaster-listen",
            "--url",
            "ws://relay.local:4000/",
            "--reconnect-delay-ms",
            "0",
        ])
        .unwrap();
        assert!(matches!(args.client_config(), Err(ConfigError::Invalid(_))));

        let args =
            Args::try_parse_from(["recipemaster-listen", "--url", "relay.local:4000"]).unwrap();
        assert!(matches!(args.client_config(), Err(ConfigError::Invalid(_))));
    }
}
