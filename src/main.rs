use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use harvest_station_lib::commands::{self, StdinPrompt};
use harvest_station_lib::device::{AlwaysCancel, DeviceKind, RetryPrompt};
use harvest_station_lib::scanner::SCAN_TEST_WINDOW;
use harvest_station_lib::serial::SystemPorts;
use harvest_station_lib::{HardwareConfig, HardwareSession};

#[derive(Parser)]
#[command(name = "harvest-station")]
#[command(about = "Scale and scanner access for harvest station forms")]
struct Cli {
    /// Hardware config file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Use a simulated scanner instead of opening a port
    #[arg(long, global = true)]
    test: bool,

    /// Give up on the first failed connection instead of prompting
    #[arg(long, global = true)]
    no_retry: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScaleModel {
    Ranger,
    Scout,
}

impl From<ScaleModel> for DeviceKind {
    fn from(model: ScaleModel) -> Self {
        match model {
            ScaleModel::Ranger => DeviceKind::RangerScale,
            ScaleModel::Scout => DeviceKind::ScoutScale,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports and what each was recognised as
    Ports,
    /// Show weight readings
    Weigh {
        #[arg(short, long, value_enum)]
        model: Option<ScaleModel>,
        /// Stop after this many readings
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Print scanned codes
    Scan {
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Connect everything and show connection status
    Status {
        /// Keep re-checking on the configured interval
        #[arg(short, long)]
        watch: bool,
    },
    /// Test a Bluetooth port for the scanner
    SetupScanner {
        #[arg(short, long)]
        port: Option<String>,
        /// Write the port to the config file when a scan is received
        #[arg(long)]
        save: bool,
    },
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    ExitCode::from(commands::exit_status(&result))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    let mut prompt: Box<dyn RetryPrompt> = if cli.no_retry {
        Box::new(AlwaysCancel)
    } else {
        Box::new(StdinPrompt)
    };

    match cli.command {
        Commands::Ports => {
            commands::list_ports(&SystemPorts, &mut stdout)?;
        }
        Commands::SetupScanner { port, save } => {
            let outcome = commands::setup_scanner(
                Arc::new(SystemPorts),
                &cli.config,
                port,
                SCAN_TEST_WINDOW,
                save,
                &mut stdout,
            )
            .await?;
            if !outcome.is_success() {
                anyhow::bail!("Scanner test failed");
            }
        }
        Commands::Weigh { model, count } => {
            let mut session = open_session(&cli.config)?;
            commands::require_connected(session.connect_scales(prompt.as_mut()).await)?;
            let kind = match model {
                Some(model) => model.into(),
                None => commands::default_scale(session.status())
                    .ok_or_else(|| anyhow::anyhow!("No scale connected"))?,
            };
            commands::weigh(&session, kind, count, &mut stdout).await?;
            session.shutdown().await;
        }
        Commands::Scan { count } => {
            let mut session = open_session(&cli.config)?;
            if cli.test {
                session.use_simulated_scanner();
            } else {
                commands::require_connected(session.connect_scanner(prompt.as_mut()))?;
            }
            commands::scan(&mut session, count, &mut stdout).await?;
        }
        Commands::Status { watch } => {
            let mut session = open_session(&cli.config)?;
            // A missing device is reported, not fatal
            if let Err(e) = commands::require_connected(session.connect_scales(prompt.as_mut()).await) {
                log::warn!("{}", e);
            }
            if cli.test {
                session.use_simulated_scanner();
            } else if let Err(e) = commands::require_connected(session.connect_scanner(prompt.as_mut())) {
                log::warn!("{}", e);
            }

            if watch {
                commands::watch_status(&session, None, &mut stdout).await?;
            } else {
                commands::print_status(session.status(), &mut stdout)?;
            }
            session.shutdown().await;
        }
    }
    Ok(())
}

fn open_session(config_path: &std::path::Path) -> anyhow::Result<HardwareSession> {
    let config = HardwareConfig::load_or_default(config_path)?;
    Ok(HardwareSession::with_system_ports(config))
}
