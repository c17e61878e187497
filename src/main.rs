/// Chatlink terminal client - main entry point
use chatlink_core::{ChatClient, Config};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    info!("🚀 Starting Chatlink client");
    info!("   Server: {}", config.server_url);
    if let Some(target) = &config.target {
        info!("   Conversation: {:?}", target);
    }

    let client = ChatClient::connect(config);

    // Print render events as they arrive
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("event: {:?}", event);
        }
    });

    // Read stdin lines and send them to the selected conversation
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let content = line.trim();
                    if content.is_empty() {
                        continue;
                    }
                    if let Err(e) = client.send_text(content).await {
                        error!("send failed: {}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("stdin error: {}", e);
                    break;
                }
            }
        }
    }

    client.logout().await;
    info!("Client stopped");
    Ok(())
}
