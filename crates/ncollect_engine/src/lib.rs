pub mod inventory;
pub mod report;

pub use inventory::{load_inventory, parse_inventory, InventoryError};
pub use report::ReportWriter;

use chrono::Utc;
use ncollect_drivers::{ConnectRequest, DeviceSession, SessionConnector};
use ncollect_model::{
    CollectSummary, Credentials, DeviceEntry, DeviceOutcome, DeviceStatus, Inventory,
};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Profile value that asks the connector to list what it supports.
pub const PROBE_PROFILE: &str = "?";

/// Sessions are always opened with reduced inter-command delay.
const FAST_MODE: bool = true;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("writing report: {0}")]
    Report(#[source] io::Error),
    #[error("writing status: {0}")]
    Status(#[source] io::Error),
    #[error("profile probe unexpectedly connected via {0}")]
    ProbeConnected(&'static str),
}

/// Runs the shared and per-device command lists against every device in turn.
pub struct Collector<C: SessionConnector> {
    connector: C,
    profile: String,
}

#[derive(Default)]
struct CommandTally {
    ok: usize,
    failed: usize,
}

impl<C: SessionConnector> Collector<C> {
    pub fn new(connector: C, profile: impl Into<String>) -> Self {
        Self {
            connector,
            profile: profile.into(),
        }
    }

    pub fn is_probe(&self) -> bool {
        self.profile == PROBE_PROFILE
    }

    /// One connect attempt with the `?` profile and no target. The connector's
    /// refusal names every profile it accepts.
    pub async fn probe_profiles(&self) -> Result<String, CollectError> {
        let request = ConnectRequest {
            profile: PROBE_PROFILE,
            address: "",
            username: "",
            password: "",
            fast_mode: FAST_MODE,
        };
        match self.connector.connect(&request).await {
            Err(err) => Ok(format!("{err:#}")),
            Ok(mut session) => {
                if let Err(err) = session.close().await {
                    warn!("closing probe session failed: {err:#}");
                }
                Err(CollectError::ProbeConnected(self.connector.name()))
            }
        }
    }

    #[instrument(
        skip_all,
        fields(run_id = %run_id, connector = self.connector.name(), profile = %self.profile)
    )]
    async fn run_with_id<R: Write, S: Write>(
        &self,
        run_id: Uuid,
        inventory: &Inventory,
        credentials: &Credentials,
        report: &mut ReportWriter<R>,
        status: &mut S,
    ) -> Result<CollectSummary, CollectError> {
        let started_at = Utc::now();
        info!(
            devices = inventory.devices.len(),
            shared_commands = inventory.shared_commands.len(),
            "starting collection"
        );

        let mut devices = Vec::with_capacity(inventory.devices.len());
        for device in &inventory.devices {
            let shared = &inventory.shared_commands;
            let outcome = self
                .collect_device(device, shared, credentials, report, status)
                .await?;
            devices.push(outcome);
        }

        let summary = CollectSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            devices,
        };
        info!(
            connected = summary.connected_count(),
            unreachable = summary.unreachable_count(),
            commands_ok = summary.commands_ok(),
            commands_failed = summary.commands_failed(),
            "collection finished"
        );
        Ok(summary)
    }

    pub async fn run<R: Write, S: Write>(
        &self,
        inventory: &Inventory,
        credentials: &Credentials,
        report: &mut ReportWriter<R>,
        status: &mut S,
    ) -> Result<CollectSummary, CollectError> {
        self.run_with_id(Uuid::new_v4(), inventory, credentials, report, status)
            .await
    }

    async fn collect_device<R: Write, S: Write>(
        &self,
        device: &DeviceEntry,
        shared_commands: &[String],
        credentials: &Credentials,
        report: &mut ReportWriter<R>,
        status: &mut S,
    ) -> Result<DeviceOutcome, CollectError> {
        let started_at = Utc::now();
        announce(
            status,
            format_args!("Connecting to {} ({}):", device.label(), device.address),
        )?;

        let request = ConnectRequest {
            profile: &self.profile,
            address: &device.address,
            username: &credentials.username,
            password: &credentials.password,
            fast_mode: FAST_MODE,
        };
        let mut session = match self.connector.connect(&request).await {
            Ok(session) => session,
            Err(err) => {
                warn!(device = %device.name, address = %device.address, "connect failed: {err:#}");
                announce(status, format_args!("Unable to connect: {err:#}"))?;
                return Ok(DeviceOutcome {
                    name: device.name.clone(),
                    address: device.address.clone(),
                    status: DeviceStatus::ConnectFailed,
                    commands_ok: 0,
                    commands_failed: 0,
                    error: Some(format!("{err:#}")),
                    started_at,
                    finished_at: Utc::now(),
                });
            }
        };

        let mut tally = CommandTally::default();
        let phases = self
            .run_phase(session.as_mut(), device, shared_commands, &mut tally, report, status)
            .await;
        let phases = match phases {
            Ok(()) => {
                let own = &device.commands;
                self.run_phase(session.as_mut(), device, own, &mut tally, report, status)
                    .await
            }
            Err(err) => Err(err),
        };

        // The session is closed even when the report sink has failed.
        let disconnecting = announce(status, format_args!("Disconnecting."));
        if let Err(err) = session.close().await {
            warn!(device = %device.name, "close failed: {err:#}");
        }
        phases?;
        disconnecting?;

        Ok(DeviceOutcome {
            name: device.name.clone(),
            address: device.address.clone(),
            status: if tally.failed == 0 {
                DeviceStatus::Collected
            } else {
                DeviceStatus::Partial
            },
            commands_ok: tally.ok,
            commands_failed: tally.failed,
            error: None,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Every command is attempted; a failure only costs that command's block.
    async fn run_phase<R: Write, S: Write>(
        &self,
        session: &mut dyn DeviceSession,
        device: &DeviceEntry,
        commands: &[String],
        tally: &mut CommandTally,
        report: &mut ReportWriter<R>,
        status: &mut S,
    ) -> Result<(), CollectError> {
        for command in commands {
            announce(status, format_args!("\tSend: {command}"))?;
            debug!(device = %device.name, %command, "sending");
            match session.run(command).await {
                Ok(output) => {
                    report
                        .write_block(&device.name, command, &output)
                        .map_err(CollectError::Report)?;
                    tally.ok += 1;
                }
                Err(err) => {
                    warn!(device = %device.name, %command, "command failed: {err:#}");
                    announce(status, format_args!("\tFailed: {err:#}"))?;
                    tally.failed += 1;
                }
            }
        }
        Ok(())
    }
}

fn announce<S: Write>(status: &mut S, line: std::fmt::Arguments<'_>) -> Result<(), CollectError> {
    writeln!(status, "{line}").map_err(CollectError::Status)
}
