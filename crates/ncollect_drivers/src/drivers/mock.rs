use crate::{BoxedSession, ConnectRequest, DeviceSession, SessionConnector};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Something the mock observed, keyed by device address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect { address: String },
    Run { address: String, command: String },
    Close { address: String },
}

#[derive(Default)]
struct Script {
    connect_failures: HashMap<String, String>,
    command_failures: HashSet<(String, String)>,
    close_failures: HashSet<String>,
    outputs: HashMap<(String, String), String>,
}

/// Scripted connector for exercising collection logic without a network.
///
/// Unless told otherwise every connect succeeds and every command answers
/// with `"<address># <command>"`.
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
    events: Arc<Mutex<Vec<MockEvent>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(self, address: &str, reason: &str) -> Self {
        self.with_script(|script| {
            script
                .connect_failures
                .insert(address.to_string(), reason.to_string());
        })
    }

    pub fn fail_command(self, address: &str, command: &str) -> Self {
        self.with_script(|script| {
            script
                .command_failures
                .insert((address.to_string(), command.to_string()));
        })
    }

    /// The session to `address` still records its close, then reports an error.
    pub fn fail_close(self, address: &str) -> Self {
        self.with_script(|script| {
            script.close_failures.insert(address.to_string());
        })
    }

    pub fn with_output(self, address: &str, command: &str, output: &str) -> Self {
        self.with_script(|script| {
            script.outputs.insert(
                (address.to_string(), command.to_string()),
                output.to_string(),
            );
        })
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn with_script(self, edit: impl FnOnce(&mut Script)) -> Self {
        if let Ok(mut script) = self.script.lock() {
            edit(&mut script);
        }
        self
    }
}

fn record(events: &Mutex<Vec<MockEvent>>, event: MockEvent) {
    if let Ok(mut events) = events.lock() {
        events.push(event);
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    fn name(&self) -> &'static str {
        "Mock Connector"
    }

    async fn connect(&self, request: &ConnectRequest<'_>) -> Result<BoxedSession> {
        let address = request.address.to_string();
        record(
            &self.events,
            MockEvent::Connect {
                address: address.clone(),
            },
        );
        if request.profile == "?" {
            bail!("unsupported device profile '?'; supported profiles: mock");
        }
        let failure = self
            .script
            .lock()
            .map_err(|_| anyhow!("mock script poisoned"))?
            .connect_failures
            .get(&address)
            .cloned();
        if let Some(reason) = failure {
            bail!("{reason}");
        }
        Ok(Box::new(MockSession {
            address,
            script: self.script.clone(),
            events: self.events.clone(),
            closed: false,
        }))
    }
}

struct MockSession {
    address: String,
    script: Arc<Mutex<Script>>,
    events: Arc<Mutex<Vec<MockEvent>>>,
    closed: bool,
}

#[async_trait]
impl DeviceSession for MockSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        record(
            &self.events,
            MockEvent::Run {
                address: self.address.clone(),
                command: command.to_string(),
            },
        );
        if self.closed {
            bail!("session to {} is closed", self.address);
        }
        let script = self
            .script
            .lock()
            .map_err(|_| anyhow!("mock script poisoned"))?;
        let key = (self.address.clone(), command.to_string());
        if script.command_failures.contains(&key) {
            bail!("[mock] '{}' failed on {}", command, self.address);
        }
        Ok(script
            .outputs
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("{}# {}", self.address, command)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        record(
            &self.events,
            MockEvent::Close {
                address: self.address.clone(),
            },
        );
        let fails = self
            .script
            .lock()
            .map_err(|_| anyhow!("mock script poisoned"))?
            .close_failures
            .contains(&self.address);
        if fails {
            bail!("[mock] channel to {} dropped during close", self.address);
        }
        Ok(())
    }
}
