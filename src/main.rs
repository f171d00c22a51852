mod bot;
mod config;
mod database;
mod error;
mod game;
mod logging;
mod scheduler;
mod session;
mod utils;

use anyhow::Result;
use config::Config;
use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guards = logging::init()?;

    // Load configuration
    let config = Config::load()?;

    let session = Session::start(&config).await?;

    // Create and start the bot
    let mut client = match bot::create_bot(config, &session).await {
        Ok(client) => client,
        Err(e) => {
            session.shutdown().await;
            return Err(e);
        }
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down...");
            shard_manager.shutdown_all().await;
        }
    });

    tracing::info!("Starting Discord bot...");

    if let Err(why) = client.start().await {
        tracing::error!("Client error: {:?}", why);
    }

    session.shutdown().await;
    Ok(())
}
