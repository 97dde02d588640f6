use crate::{
    config,
    ssh::{self, profile_settings, resolve_profile},
    BoxedSession, ConnectRequest, DeviceSession, SessionConnector,
};
use anyhow::{bail, Context, Result};
use async_ssh2_tokio::Client;
use async_trait::async_trait;
use ncollect_model::{Credentials, DeviceProfile};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Opens one SSH exec session per device.
#[derive(Default, Clone)]
pub struct SshCliConnector;

#[async_trait]
impl SessionConnector for SshCliConnector {
    fn name(&self) -> &'static str {
        "SSH CLI"
    }

    async fn connect(&self, request: &ConnectRequest<'_>) -> Result<BoxedSession> {
        let profile = resolve_profile(request.profile)?;
        let settings = profile_settings(profile);
        let credentials = Credentials::new(request.username, request.password);
        let client = ssh::connect(request.address, &credentials, settings.port).await?;
        info!(
            target: "drivers::ssh_cli",
            "connected to {} as {} ({})",
            request.address,
            request.username,
            profile
        );
        let delay = if request.fast_mode {
            Duration::ZERO
        } else {
            settings.command_delay
        };
        Ok(Box::new(SshCliSession {
            client: Some(client),
            address: request.address.to_string(),
            profile,
            delay,
        }))
    }
}

pub struct SshCliSession {
    client: Option<Client>,
    address: String,
    profile: DeviceProfile,
    delay: Duration,
}

#[async_trait]
impl DeviceSession for SshCliSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        let Some(client) = self.client.as_ref() else {
            bail!("session to {} is closed", self.address);
        };
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let exec = ssh::with_optional_timeout(config::ssh_command_timeout(), async {
            client.execute(command).await.map_err(anyhow::Error::from)
        })
        .await
        .with_context(|| format!("ssh exec {} {}", self.address, command))?;

        if exec.exit_status != 0 {
            debug!(
                target: "drivers::ssh_cli",
                "{} ({}) '{}' exited with status {}",
                self.address,
                self.profile,
                command,
                exec.exit_status
            );
        }
        Ok(merge_streams(exec.stdout, &exec.stderr))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            if let Err(err) = client.disconnect().await {
                warn!(
                    target: "drivers::ssh_cli",
                    "disconnect from {} failed: {}",
                    self.address,
                    err
                );
            }
        }
        Ok(())
    }
}

fn merge_streams(mut stdout: String, stderr: &str) -> String {
    if stderr.is_empty() {
        return stdout;
    }
    if !stdout.is_empty() && !stdout.ends_with('\n') {
        stdout.push('\n');
    }
    stdout.push_str(stderr);
    stdout
}
