//! SSH tunnel management.
//!
//! The destination cluster is only reachable from inside its VPC, so all
//! destination traffic goes through a local port-forward established over
//! SSH to a bastion host. The tunnel is a scoped resource: [`SshTunnel`]
//! owns the forwarding process and guarantees teardown on every exit path,
//! either through an explicit [`close`](SshTunnel::close) or through `Drop`.

use crate::config::TunnelConfig;
use crate::error::{MigrateError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// How long to wait for the forwarded port to start accepting connections.
const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Poll interval while waiting for the forward to come up.
const READY_POLL: Duration = Duration::from_millis(200);

/// A local port-forward to the destination database, held open by a
/// spawned `ssh -N -L` process.
pub struct SshTunnel {
    child: Child,
    local_port: u16,
}

impl SshTunnel {
    /// Establish the tunnel and wait until the forwarded port is live.
    pub async fn open(config: &TunnelConfig) -> Result<Self> {
        let local_port = pick_local_port().await?;

        let args = forward_args(config, local_port);
        debug!("Spawning ssh {}", args.join(" "));

        let child = Command::new("ssh")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MigrateError::Tunnel(format!("failed to spawn ssh: {e}")))?;

        let mut tunnel = Self { child, local_port };
        tunnel.wait_ready().await?;

        info!("SSH tunnel established on local port: {}", local_port);
        Ok(tunnel)
    }

    /// Local port the destination client should connect to.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Tear the tunnel down and reap the ssh process.
    pub async fn close(mut self) {
        let _ = self.child.kill().await;
        info!("SSH tunnel closed");
    }

    /// Poll the forwarded port until it accepts a connection, failing fast
    /// if the ssh process exits first (bad key, unreachable bastion).
    async fn wait_ready(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;

        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|e| MigrateError::Tunnel(format!("failed to poll ssh process: {e}")))?
            {
                return Err(MigrateError::Tunnel(format!(
                    "ssh exited before the forward came up (status: {status})"
                )));
            }

            match TcpStream::connect(("127.0.0.1", self.local_port)).await {
                Ok(_) => return Ok(()),
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(READY_POLL).await;
                }
                Err(e) => {
                    let _ = self.child.kill().await;
                    return Err(MigrateError::Tunnel(format!(
                        "forwarded port {} not ready within {:?}: {e}",
                        self.local_port, READY_TIMEOUT
                    )));
                }
            }
        }
    }
}

/// Find a free local port by binding port 0 and releasing it.
async fn pick_local_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    Ok(listener.local_addr()?.port())
}

/// Build the ssh argument list for a non-interactive local forward.
fn forward_args(config: &TunnelConfig, local_port: u16) -> Vec<String> {
    vec![
        "-N".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-i".to_string(),
        config.key_path.display().to_string(),
        "-L".to_string(),
        format!(
            "127.0.0.1:{}:{}:{}",
            local_port, config.remote_host, config.remote_port
        ),
        format!("{}@{}", config.user, config.host),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TunnelConfig {
        TunnelConfig {
            host: "bastion.example.com".to_string(),
            user: "ec2-user".to_string(),
            key_path: "creds/adh-db-proxy.pem".into(),
            remote_host: "docdb.cluster.example.com".to_string(),
            remote_port: 27017,
        }
    }

    #[test]
    fn test_forward_args_shape() {
        let args = forward_args(&config(), 43210);
        assert_eq!(args[0], "-N");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ExitOnForwardFailure=yes".to_string()));
        assert!(args.contains(&"127.0.0.1:43210:docdb.cluster.example.com:27017".to_string()));
        assert_eq!(args.last().unwrap(), "ec2-user@bastion.example.com");
    }

    #[test]
    fn test_forward_args_use_key_path() {
        let args = forward_args(&config(), 1);
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "creds/adh-db-proxy.pem");
    }

    #[tokio::test]
    async fn test_pick_local_port_is_nonzero() {
        let port = pick_local_port().await.unwrap();
        assert_ne!(port, 0);
    }
}
