use anyhow::Result;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// How long the tunnel gets to fail before it is considered up.
const STARTUP_GRACE: Duration = Duration::from_secs(3);

/// A `ssh -NL` port forward kept alive for the lifetime of the session.
pub struct SshTunnel {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl SshTunnel {
    pub fn new(args: Vec<String>) -> Self {
        Self::with_program("ssh", args)
    }

    fn with_program(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            child: None,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("SSH tunnel is already running");
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .arg("-NL")
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()?;

        tokio::time::sleep(STARTUP_GRACE).await;

        if let Some(status) = child.try_wait()? {
            return Err(anyhow::anyhow!(
                "Starting SSH tunnel failed with code {}",
                status.code().unwrap_or(-1)
            ));
        }

        info!("SSH tunnel established ({})", self.args.join(" "));
        self.child = Some(child);
        Ok(())
    }

    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.kill().await {
            Ok(()) => info!("SSH tunnel closed"),
            Err(e) => warn!("Failed to stop SSH tunnel: {:?}", e),
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exited_tunnel_reports_its_code() {
        let mut tunnel = SshTunnel::with_program("false", vec!["5432:localhost:5432".into()]);

        let err = tunnel.start().await.unwrap_err();
        assert_eq!(err.to_string(), "Starting SSH tunnel failed with code 1");
        assert!(!tunnel.is_running());
    }

    #[tokio::test]
    async fn stopping_an_idle_tunnel_is_a_no_op() {
        let mut tunnel = SshTunnel::new(Vec::new());
        tunnel.stop().await;
        assert!(!tunnel.is_running());
    }
}
