use clap::Parser;
use tether::config::{CliArgs, RelayConfig};
use tether::signaling::{ServerOptions, SignalingServer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = RelayConfig::from_args(&CliArgs::parse());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let options = ServerOptions::from_config(&config)?;

    println!("   Tether Signaling Relay");
    println!("   Binding to {}", config.bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = SignalingServer::bind(&config.bind_addr, options).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Signaling server failed: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
