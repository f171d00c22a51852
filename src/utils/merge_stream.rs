use anyhow::Result;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Interleaves a child process's stdout and stderr into a single stream of lines.
///
/// Lines are yielded in the order they are read, trimmed, and decoded lossily as UTF-8.
/// The stream ends once both pipes are closed.
pub struct MergeStream {
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
}

impl MergeStream {
    /// Spawns `command` with both output pipes captured.
    pub fn spawn(command: &mut Command) -> Result<Self> {
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Self::new(child)
    }

    pub fn new(mut child: Child) -> Result<Self> {
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(anyhow::anyhow!(
                "stdout and stderr must both be piped to merge them"
            ));
        };

        let (tx, lines) = mpsc::unbounded_channel();
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        Ok(Self { child, lines })
    }

    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    pub async fn wait(mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read process output: {}", e);
                break;
            }
        }
    }
}
