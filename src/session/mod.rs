mod tunnel;

pub use tunnel::SshTunnel;

use crate::config::Config;
use crate::database;
use crate::scheduler::Scheduler;
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POOL_CLOSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Resources that outlive the gateway connection.
pub struct Session {
    pub pool: SqlitePool,
    pub scheduler: Arc<Scheduler>,
    tunnel: Option<SshTunnel>,
}

impl Session {
    /// Opens the tunnel (when configured), then the database, then runs migrations.
    pub async fn start(config: &Config) -> Result<Self> {
        let tunnel = match &config.ssh_tunnel {
            Some(args) => {
                let mut tunnel = SshTunnel::new(args.clone());
                tunnel.start().await?;
                Some(tunnel)
            }
            None => None,
        };

        let pool = database::create_connection(&config.database.url).await?;
        info!("Connected to database");

        Ok(Self {
            scheduler: Arc::new(Scheduler::new(pool.clone())),
            pool,
            tunnel,
        })
    }

    /// Stops the scheduler, closes the pool, then the tunnel.
    pub async fn shutdown(mut self) {
        self.scheduler.stop().await;

        if tokio::time::timeout(POOL_CLOSE_TIMEOUT, self.pool.close())
            .await
            .is_err()
        {
            warn!(
                "Database pool did not close within {} seconds",
                POOL_CLOSE_TIMEOUT.as_secs()
            );
        }

        if let Some(tunnel) = self.tunnel.as_mut() {
            tunnel.stop().await;
        }

        info!("Session closed");
    }
}
