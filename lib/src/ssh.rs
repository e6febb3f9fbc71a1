use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use tokio::{net::TcpStream, process::Command, time};

/// How the remote host's key is verified when the session opens.
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    /// Accept and record an unknown host key on first contact.
    AcceptNew,
    /// Strict checking against a known-hosts file carrying the pinned key.
    Pinned(PathBuf),
}

/// Where and as whom to open the remote shell.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: IpAddr,
    pub user: String,
    pub key_file: PathBuf,
}

/// Captured output of a one-shot remote command.
#[derive(Debug)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// One-shot remote script execution with captured output.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn run_script(&self, target: &SshTarget, script: &str) -> Result<ShellOutput>;
}

/// Remote shell backed by the local OpenSSH client.
pub struct OpenSsh {
    policy: HostKeyPolicy,
}

impl OpenSsh {
    pub fn new(policy: HostKeyPolicy) -> Self {
        Self { policy }
    }

    fn ssh_args(&self, target: &SshTarget) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "NumberOfPasswordPrompts=0".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=60".to_string(),
        ];

        match &self.policy {
            HostKeyPolicy::AcceptNew => {
                args.push("-o".to_string());
                args.push("StrictHostKeyChecking=accept-new".to_string());
            }
            HostKeyPolicy::Pinned(known_hosts) => {
                args.push("-o".to_string());
                args.push("StrictHostKeyChecking=yes".to_string());
                args.push("-o".to_string());
                args.push(format!("UserKnownHostsFile={}", known_hosts.display()));
            }
        }

        args.push("-i".to_string());
        args.push(target.key_file.display().to_string());
        args.push(format!("{}@{}", target.user, target.host));
        args
    }
}

#[async_trait]
impl RemoteShell for OpenSsh {
    async fn run_script(&self, target: &SshTarget, script: &str) -> Result<ShellOutput> {
        wait_for_ssh(&target.host).await?;

        let mut args = self.ssh_args(target);
        args.push(script.to_string());

        info!("connecting to {}", target.host);
        let output = Command::new("ssh")
            .args(&args)
            .output()
            .await
            .context("ssh command failed to start")?;

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

pub async fn wait_for_ssh(ip: &IpAddr) -> Result<()> {
    wait_for_port(ip, 22, 10_000, 120).await
}

/// Poll a TCP port until it accepts a connection or the attempts run out.
pub async fn wait_for_port(
    ip: &IpAddr,
    port: u16,
    duration_in_ms: u64,
    attempts: usize,
) -> Result<()> {
    let addr = format!("{}:{}", ip, port);
    let timeout_duration = Duration::from_millis(duration_in_ms);
    let mut interval = time::interval(timeout_duration);

    for _ in 0..attempts {
        let stream = TcpStream::connect(addr.clone());
        match time::timeout(timeout_duration, stream).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(err)) => {
                warn!("error while connecting to {}: {}", addr, err);
                interval.tick().await;
            }
            Err(elapsed) => warn!("waiting for {} to respond: {}", addr, elapsed),
        }
    }

    Err(anyhow!("{} did not respond after {} attempts", addr, attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target() -> SshTarget {
        SshTarget {
            host: "1.2.3.4".parse().unwrap(),
            user: "ec2-user".to_string(),
            key_file: PathBuf::from("spinup-key.pem"),
        }
    }

    #[test]
    fn accept_new_policy_records_unknown_hosts() {
        let args = OpenSsh::new(HostKeyPolicy::AcceptNew).ssh_args(&target());

        assert!(args.contains(&"StrictHostKeyChecking=accept-new".to_string()));
        assert_eq!(args.last().unwrap(), "ec2-user@1.2.3.4");
    }

    #[test]
    fn pinned_policy_is_strict_against_the_pinned_file() {
        let policy = HostKeyPolicy::Pinned(PathBuf::from("/tmp/pinned_hosts"));

        let args = OpenSsh::new(policy).ssh_args(&target());

        assert!(args.contains(&"StrictHostKeyChecking=yes".to_string()));
        assert!(args.contains(&"UserKnownHostsFile=/tmp/pinned_hosts".to_string()));
    }

    #[test]
    fn key_file_is_passed_to_ssh() {
        let args = OpenSsh::new(HostKeyPolicy::AcceptNew).ssh_args(&target());

        let position = args.iter().position(|arg| arg == "-i").unwrap();
        assert_eq!(args[position + 1], "spinup-key.pem");
    }
}
