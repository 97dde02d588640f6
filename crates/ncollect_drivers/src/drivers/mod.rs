pub mod mock;
pub mod ssh_cli;

pub use mock::{MockConnector, MockEvent};
pub use ssh_cli::{SshCliConnector, SshCliSession};
