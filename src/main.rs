use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vcan_sim::config::DEFAULT_INTERFACE;
use vcan_sim::{Iterations, SimulateOptions, SimulatorConfig, VirtualizeOptions};

// Use mimalloc as the global allocator for the binary (non-Windows only)
#[cfg(not(windows))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "vcan_sim",
    author,
    version,
    disable_version_flag = true,
    arg_required_else_help = true,
    about = "Virtual CAN interface provisioning and traffic replay"
)]
struct Cli {
    /// Print the version and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    print_version: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Load the vcan module, create INTERFACE and bring it up
    Virtualize(VirtualizeArgs),
    /// Replay a candump log onto a CAN interface until it ends or Ctrl+C
    Simulate(SimulateArgs),
    /// GPS simulation (not implemented yet)
    Gps,
}

#[derive(Args, Debug)]
struct VirtualizeArgs {
    /// Interface to create
    #[arg(default_value = DEFAULT_INTERFACE)]
    interface: String,
    /// Echo command output and status lines
    #[arg(long)]
    verbose: bool,
    /// Run modprobe/ip directly instead of through sudo
    #[arg(long = "no-sudo")]
    no_sudo: bool,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// candump log to replay (defaults to the bundled sample log)
    source: Option<PathBuf>,
    /// Interface the frames are written to
    #[arg(short, long, default_value = DEFAULT_INTERFACE)]
    interface: String,
    /// Number of passes over the log, or "inf" to loop until stopped
    #[arg(short = 'l', long, default_value = "inf")]
    iterations: Iterations,
    /// Ignore recorded timestamps and replay as fast as possible
    #[arg(short = 't', long = "no-timing")]
    no_timing: bool,
    /// Provision the interface before replaying
    #[arg(long)]
    provision: bool,
    /// With --provision: run modprobe/ip directly instead of through sudo
    #[arg(long = "no-sudo")]
    no_sudo: bool,
    /// Show player output and status lines
    #[arg(long)]
    verbose: bool,
    /// Replay binary (overrides VCAN_SIM_PLAYER)
    #[arg(long)]
    player: Option<PathBuf>,
    /// How long to wait for the player to exit after SIGTERM
    #[arg(long = "stop-timeout-ms")]
    stop_timeout_ms: Option<u64>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if cli.print_version {
        println!(
            "{} ({}@{}{}) [{}]",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_BRANCH"),
            env!("GIT_HASH"),
            env!("GIT_DIRTY"),
            env!("CARGO_PKG_NAME")
        );
        return Ok(());
    }

    match cli.command {
        Some(Cmd::Virtualize(args)) => run_virtualize(args).await,
        Some(Cmd::Simulate(args)) => run_simulate(args).await,
        Some(Cmd::Gps) => {
            vcan_sim::simulate_gps().await;
            Ok(())
        }
        None => Ok(()),
    }
}

async fn run_virtualize(args: VirtualizeArgs) -> Result<()> {
    let options = VirtualizeOptions {
        silent: !args.verbose,
        sudo: !args.no_sudo,
    };
    let outcome = vcan_sim::virtualize_can(Some(&args.interface), &options)
        .await
        .with_context(|| format!("virtualize {}", args.interface))?;

    if args.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(())
}

async fn run_simulate(args: SimulateArgs) -> Result<()> {
    if args.provision {
        let options = VirtualizeOptions {
            silent: !args.verbose,
            sudo: !args.no_sudo,
        };
        let outcome = vcan_sim::virtualize_can(Some(&args.interface), &options)
            .await
            .with_context(|| format!("virtualize {}", args.interface))?;
        info!(interface = %args.interface, %outcome, "interface ready");
    }

    let mut config = SimulatorConfig::global().clone();
    if let Some(player) = args.player {
        config.player = player;
    }
    if let Some(ms) = args.stop_timeout_ms {
        config.stop_timeout = Duration::from_millis(ms);
    }

    let options = SimulateOptions {
        silent: !args.verbose,
        interface: args.interface,
        iterations: args.iterations,
        simulate_time: !args.no_timing,
    };

    let instance = vcan_sim::simulate_can_with(&config, args.source.as_deref(), &options)
        .await
        .context("start replay")?;
    info!(
        pid = instance.pid(),
        interface = instance.interface(),
        iterations = %options.iterations,
        "replay running (terminate with Ctrl+C)"
    );

    tokio::select! {
        finished = instance.wait() => {
            let record = finished.context("wait for player")?;
            if record.code != Some(0) {
                bail!("player exited with {record}");
            }
            info!("replay finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for Ctrl+C")?;
            info!("Ctrl+C received; stopping replay");
            if let Err(e) = instance.stop().await {
                warn!(error = %e, "replay did not stop cleanly; killing process group");
                instance.kill()?;
                return Err(e).context("stop replay");
            }
        }
    }

    Ok(())
}
