mod credentials;
mod runner;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use ncollect_drivers::drivers::SshCliConnector;
use ncollect_engine::Collector;
use ncollect_model::DeviceProfile;
use runner::RunPlan;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SETUP_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "ncollect",
    about = "Run show commands across network devices and collect the output into one report",
    override_usage = "ncollect -c <CONFIG> -o <OUTPUT> [-u <USERNAME>] [-d <DEVICE>]",
    arg_required_else_help = true
)]
struct Cli {
    /// INI file listing devices and the commands to run
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Report file; truncated at the start of every run
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Login name for every device (defaults to the current user)
    #[arg(short, long)]
    username: Option<String>,

    /// Device profile; pass '?' to list the supported profiles
    #[arg(
        short = 'd',
        long = "device",
        value_name = "DEVICE",
        default_value_t = DeviceProfile::default().to_string()
    )]
    device: String,
}

impl Cli {
    fn into_plan(self) -> Result<RunPlan, clap::Error> {
        let config = self.config.ok_or_else(|| missing("-c/--config <CONFIG>"))?;
        let output = self.output.ok_or_else(|| missing("-o/--output <OUTPUT>"))?;
        Ok(RunPlan {
            config,
            output,
            username: self.username,
        })
    }
}

fn missing(flag: &str) -> clap::Error {
    Cli::command().error(
        ErrorKind::MissingRequiredArgument,
        format!("the required option {flag} was not provided"),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let collector = Collector::new(SshCliConnector::default(), cli.device.clone());
    if collector.is_probe() {
        return probe_profiles(&collector).await;
    }

    let plan = match cli.into_plan() {
        Ok(plan) => plan,
        Err(err) => err.exit(),
    };
    let output = plan.output.clone();

    let prepared = match runner::prepare(plan, credentials::tty_prompt) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(SETUP_FAILURE);
        }
    };

    let mut status = std::io::stdout().lock();
    let outcome = runner::collect(&collector, prepared, &mut status).await;
    drop(status);
    match outcome {
        Ok(summary) => {
            println!("{}", runner::render_summary(&summary, &output));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Collection aborted: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn probe_profiles(collector: &Collector<SshCliConnector>) -> ExitCode {
    match collector.probe_profiles().await {
        Ok(listing) => println!("{listing}"),
        Err(err) => eprintln!("{err}"),
    }
    ExitCode::from(SETUP_FAILURE)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
