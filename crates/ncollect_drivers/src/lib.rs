pub mod config;
pub mod drivers;
pub mod ssh;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Everything a connector needs to open one session.
#[derive(Clone)]
pub struct ConnectRequest<'a> {
    /// Device profile name as given by the operator; connectors validate it.
    pub profile: &'a str,
    pub address: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub fast_mode: bool,
}

impl fmt::Debug for ConnectRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("profile", &self.profile)
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"******")
            .field("fast_mode", &self.fast_mode)
            .finish()
    }
}

/// An open, authenticated session to a single device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Runs one command and returns the captured text unmodified.
    async fn run(&mut self, command: &str) -> Result<String>;

    /// Ends the session. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

pub type BoxedSession = Box<dyn DeviceSession>;

#[async_trait]
pub trait SessionConnector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn connect(&self, request: &ConnectRequest<'_>) -> Result<BoxedSession>;
}
