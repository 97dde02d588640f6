use crate::config;
use anyhow::{anyhow, bail, Context, Result};
use async_ssh2_tokio::{AuthMethod, Client, ServerCheckMethod};
use ncollect_model::{Credentials, DeviceProfile};
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Per-profile transport tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSettings {
    pub port: u16,
    /// Pause before each command when fast mode is off.
    pub command_delay: Duration,
}

pub fn profile_settings(profile: DeviceProfile) -> ProfileSettings {
    let delay_ms = match profile {
        DeviceProfile::Linux => 0,
        DeviceProfile::CiscoIos | DeviceProfile::CiscoXe | DeviceProfile::AristaEos => 100,
        DeviceProfile::CiscoNxos | DeviceProfile::CiscoXr => 200,
        DeviceProfile::JuniperJunos | DeviceProfile::HpProcurve => 300,
    };
    ProfileSettings {
        port: DEFAULT_SSH_PORT,
        command_delay: Duration::from_millis(delay_ms),
    }
}

pub fn resolve_profile(name: &str) -> Result<DeviceProfile> {
    DeviceProfile::from_str(name).map_err(|err| anyhow!(err))
}

pub async fn connect(address: &str, credentials: &Credentials, port: u16) -> Result<Client> {
    if address.trim().is_empty() {
        bail!("no address to connect to");
    }
    let target = TargetAddr::parse(address, port);
    let server_check = if config::strict_host_keys() {
        ServerCheckMethod::DefaultKnownHostsFile
    } else {
        ServerCheckMethod::NoCheck
    };
    let auth = AuthMethod::with_password(&credentials.password);
    let username = credentials.username.as_str();

    let dial = async {
        match target {
            TargetAddr::Socket(addr) => Client::connect(addr, username, auth, server_check).await,
            TargetAddr::HostPort(host, port) => {
                Client::connect((host.as_str(), port), username, auth, server_check).await
            }
        }
        .map_err(anyhow::Error::from)
    };

    with_optional_timeout(config::ssh_connect_timeout(), dial)
        .await
        .with_context(|| format!("ssh connect {address} as {username}"))
}

/// Runs `fut`, bounded by `limit` when one is configured.
pub async fn with_optional_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow!("timed out after {limit:?}"))?,
        None => fut.await,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TargetAddr {
    Socket(SocketAddr),
    HostPort(String, u16),
}

impl TargetAddr {
    fn parse(address: &str, port: u16) -> Self {
        let address = address.trim();
        SocketAddr::from_str(address)
            .map(TargetAddr::Socket)
            .unwrap_or_else(|_| TargetAddr::HostPort(address.to_string(), port))
    }
}
