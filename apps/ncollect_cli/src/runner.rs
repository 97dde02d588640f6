use crate::credentials;
use anyhow::{Context, Result};
use ncollect_drivers::SessionConnector;
use ncollect_engine::{load_inventory, Collector, CollectError, ReportWriter};
use ncollect_model::{CollectSummary, Credentials, Inventory};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Validated command-line choices for a collection run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub config: PathBuf,
    pub output: PathBuf,
    pub username: Option<String>,
}

/// Everything resolved before the first device is contacted.
pub struct Prepared {
    pub inventory: Inventory,
    pub credentials: Credentials,
    pub report: ReportWriter<BufWriter<File>>,
}

/// Loads the inventory, settles credentials and truncates the report, in
/// that order. Any error here is a setup error.
pub fn prepare<P>(plan: RunPlan, prompt: P) -> Result<Prepared>
where
    P: FnOnce(&str) -> io::Result<String>,
{
    let inventory = load_inventory(&plan.config).context("Unable to read config file")?;
    info!(
        "Loaded {} devices and {} shared commands from {}",
        inventory.devices.len(),
        inventory.shared_commands.len(),
        plan.config.display()
    );
    let credentials = credentials::resolve(plan.username.clone(), prompt)?;
    let report = open_report(&plan.output)?;
    Ok(Prepared {
        inventory,
        credentials,
        report,
    })
}

pub fn open_report(path: &Path) -> Result<ReportWriter<BufWriter<File>>> {
    let file = File::create(path)
        .with_context(|| format!("Unable to open {} for writing", path.display()))?;
    Ok(ReportWriter::new(BufWriter::new(file)))
}

pub async fn collect<C, S>(
    collector: &Collector<C>,
    prepared: Prepared,
    status: &mut S,
) -> Result<CollectSummary, CollectError>
where
    C: SessionConnector,
    S: Write,
{
    let Prepared {
        inventory,
        credentials,
        mut report,
    } = prepared;
    let summary = collector
        .run(&inventory, &credentials, &mut report, status)
        .await?;
    info!("Wrote {} report blocks", report.blocks_written());
    report
        .into_inner()
        .flush()
        .map_err(CollectError::Report)?;
    Ok(summary)
}

pub fn render_summary(summary: &CollectSummary, output: &Path) -> String {
    format!(
        "Collection complete: devices={} unreachable={} commands_ok={} commands_failed={} report={}",
        summary.devices.len(),
        summary.unreachable_count(),
        summary.commands_ok(),
        summary.commands_failed(),
        output.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncollect_drivers::drivers::MockConnector;
    use std::fs;
    use tempfile::TempDir;

    const SWITCHES: &str = "\
[all]
commands = show version

[sw1]
ip = 10.0.0.1
commands = show vlan

[sw2]
ip = 10.0.0.2
";

    fn plan(dir: &TempDir) -> RunPlan {
        let config = dir.path().join("switches.ini");
        fs::write(&config, SWITCHES).unwrap();
        RunPlan {
            config,
            output: dir.path().join("report.txt"),
            username: Some("netops".into()),
        }
    }

    #[test]
    fn unreadable_config_fails_before_prompt() {
        let dir = TempDir::new().unwrap();
        let mut plan = plan(&dir);
        plan.config = dir.path().join("missing.ini");
        let err = prepare(plan.clone(), |_| panic!("prompted despite bad config"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").starts_with("Unable to read config file"));
        assert!(!plan.output.exists());
    }

    #[test]
    fn unwritable_report_is_a_setup_error() {
        let dir = TempDir::new().unwrap();
        let mut plan = plan(&dir);
        plan.output = dir.path().join("no-such-dir").join("report.txt");
        let err = prepare(plan, |_| Ok("pw".into())).err().unwrap();
        assert!(format!("{err:#}").contains("for writing"));
    }

    #[tokio::test]
    async fn rerun_replaces_previous_report() {
        let dir = TempDir::new().unwrap();
        let plan = plan(&dir);
        fs::write(&plan.output, "stale content from last week\n").unwrap();

        let prepared = prepare(plan.clone(), |_| Ok("pw".into())).unwrap();
        let mock = MockConnector::new().fail_connect("10.0.0.2", "timed out");
        let mut status = Vec::new();
        let collector = Collector::new(mock, "cisco_nxos");
        let summary = collect(&collector, prepared, &mut status).await.unwrap();

        let report = fs::read_to_string(&plan.output).unwrap();
        assert!(!report.contains("stale content"));
        assert!(report.contains("* SW1: show version\n"));
        assert!(report.contains("* SW1: show vlan\n"));
        assert!(!report.contains("SW2"));
        assert_eq!(summary.unreachable_count(), 1);

        let line = render_summary(&summary, &plan.output);
        assert!(line.contains("devices=2 unreachable=1 commands_ok=2 commands_failed=0"));
    }
}
