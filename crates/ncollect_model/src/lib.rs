use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Section name holding the commands sent to every device.
pub const SHARED_SECTION: &str = "all";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    #[default]
    CiscoNxos,
    CiscoIos,
    CiscoXe,
    CiscoXr,
    AristaEos,
    JuniperJunos,
    HpProcurve,
    Linux,
}

impl DeviceProfile {
    pub const ALL: [DeviceProfile; 8] = [
        DeviceProfile::AristaEos,
        DeviceProfile::CiscoIos,
        DeviceProfile::CiscoNxos,
        DeviceProfile::CiscoXe,
        DeviceProfile::CiscoXr,
        DeviceProfile::HpProcurve,
        DeviceProfile::JuniperJunos,
        DeviceProfile::Linux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::CiscoNxos => "cisco_nxos",
            DeviceProfile::CiscoIos => "cisco_ios",
            DeviceProfile::CiscoXe => "cisco_xe",
            DeviceProfile::CiscoXr => "cisco_xr",
            DeviceProfile::AristaEos => "arista_eos",
            DeviceProfile::JuniperJunos => "juniper_junos",
            DeviceProfile::HpProcurve => "hp_procurve",
            DeviceProfile::Linux => "linux",
        }
    }

    /// Comma separated list of every accepted profile name.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(DeviceProfile::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unsupported device profile '{}'; supported profiles: {}",
                    s.trim(),
                    Self::supported()
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl DeviceEntry {
    /// Upper-cased name used in status lines and report headers.
    pub fn label(&self) -> String {
        self.name.to_uppercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Inventory {
    #[serde(default)]
    pub shared_commands: Vec<String>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Every command returned output.
    Collected,
    /// Connected, but at least one command failed.
    Partial,
    ConnectFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOutcome {
    pub name: String,
    pub address: String,
    pub status: DeviceStatus,
    pub commands_ok: usize,
    pub commands_failed: usize,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub devices: Vec<DeviceOutcome>,
}

impl CollectSummary {
    pub fn connected_count(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| d.status != DeviceStatus::ConnectFailed)
            .count()
    }

    pub fn unreachable_count(&self) -> usize {
        self.devices.len() - self.connected_count()
    }

    pub fn commands_ok(&self) -> usize {
        self.devices.iter().map(|d| d.commands_ok).sum()
    }

    pub fn commands_failed(&self) -> usize {
        self.devices.iter().map(|d| d.commands_failed).sum()
    }
}
