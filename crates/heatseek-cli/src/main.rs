//! `heatseek` – HeatSeek command line interface.
//!
//! Subcommands:
//!
//! - `heatseek init` writes a default `~/.heatseek/config.toml`.
//! - `heatseek run` wires the control loop to the simulated sensor and GPIO
//!   and runs it until the frames run out, `--ticks` is reached, or Ctrl-C.
//!   Ctrl-C stops the motors, returns the servo to neutral and releases the
//!   pins before exiting.
//! - `heatseek classify` classifies a frame file offline and prints the tags.

mod config;
mod frames;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use tokio::sync::watch;
use tracing::{debug, warn};

use heatseek_hal::{ActuatorController, ReplaySensor, SimGpio};
use heatseek_middleware::{EventBus, Topic, TopicReceiver};
use heatseek_perception::HeatClassifier;
use heatseek_runtime::{ControlLoop, LoopStats};
use heatseek_types::{Decision, EventPayload, HeatError};

#[derive(Parser)]
#[command(name = "heatseek")]
#[command(about = "Thermal heat-source seeker and launcher", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Target path (default: ~/.heatseek/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the control loop against simulated hardware
    Run {
        /// Configuration file (default: ~/.heatseek/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON array of 8×8 frames to replay (default: built-in demo, looped)
        #[arg(short, long)]
        frames: Option<PathBuf>,

        /// Stop after this many ticks
        #[arg(short = 'n', long)]
        ticks: Option<u64>,
    },

    /// Classify every frame in a file and print the decision tags
    Classify {
        /// Configuration file (default: ~/.heatseek/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON array of 8×8 frames
        #[arg(short, long)]
        frames: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = heatseek_runtime::init_tracing("heatseek");

    let result = match cli.command {
        Commands::Init { config, force } => init(config, force),
        Commands::Run {
            config,
            frames,
            ticks,
        } => run(config.as_deref(), frames.as_deref(), ticks),
        Commands::Classify { config, frames } => classify(config.as_deref(), &frames),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// init
// ─────────────────────────────────────────────────────────────────────────────

fn init(path: Option<PathBuf>, force: bool) -> Result<(), HeatError> {
    let path = path.unwrap_or_else(config::config_path);
    if path.exists() && !force {
        return Err(HeatError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    config::save_to(&config::Config::default(), &path)?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// classify
// ─────────────────────────────────────────────────────────────────────────────

fn classify(config_path: Option<&Path>, frames_path: &Path) -> Result<(), HeatError> {
    let cfg = config::resolve(config_path)?;
    let classifier = HeatClassifier::new(cfg.thresholds)?;
    let frames = frames::load(frames_path)?;

    for (i, grid) in frames.iter().enumerate() {
        let (decision, zones) = classifier.classify(grid);
        println!(
            "  {:>4}  {:<8} {}",
            i,
            paint(decision),
            format!(
                "right {:5.1}  front {:5.1}  left {:5.1}",
                zones.right, zones.front, zones.left
            )
            .dimmed()
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

fn run(
    config_path: Option<&Path>,
    frames_path: Option<&Path>,
    ticks: Option<u64>,
) -> Result<(), HeatError> {
    let mut cfg = config::resolve(config_path)?;

    let sensor = match frames_path {
        Some(path) => {
            let frames = frames::load(path)?;
            cfg.control.max_ticks = Some(ticks.unwrap_or(frames.len() as u64));
            ReplaySensor::new(path.display().to_string(), frames)
        }
        None => {
            cfg.control.max_ticks = ticks;
            ReplaySensor::new("demo", frames::demo()?).looping()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| HeatError::Config(format!("failed to start async runtime: {e}")))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let ctrlc_tx = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping actuators …".yellow().bold());
        let _ = ctrlc_tx.send(true);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available"
        );
    }

    let stats = runtime.block_on(async move {
        println!("{}", "═══════════════════════════════════════".bold());
        println!("{}", "         HeatSeek Boot Sequence        ".bold().cyan());
        println!("{}", "═══════════════════════════════════════".bold());

        let bus = EventBus::new(cfg.bus_capacity)?;
        // Subscribe before spawning so no event published during boot is missed.
        let decisions = bus.subscribe_to(Topic::HeatLocation);
        let alerts = bus.subscribe_to(Topic::SystemAlerts);
        let printer = tokio::spawn(print_events(decisions, alerts));

        let controller =
            ActuatorController::acquire(Box::new(SimGpio::new("sim_gpio")), cfg.pins, cfg.launch)
                .await?;
        println!("  {} {}", "Actuators:".bold(), "safe".green());

        let classifier = HeatClassifier::new(cfg.thresholds)?;
        let mut control = ControlLoop::new(
            cfg.control.clone(),
            Box::new(sensor),
            classifier,
            Box::new(bus.clone()),
            controller,
        )?
        .with_event_bus(bus);
        println!(
            "  {} every {} ms",
            "Control loop:".bold(),
            cfg.control.tick_interval_ms.to_string().yellow()
        );
        println!("{}", "═══════════════════════════════════════".bold());

        let stats = control.run(shutdown_rx).await;
        // Dropping the loop drops the last bus handles, which ends the printer.
        drop(control);
        match printer.await {
            Ok(printed) => debug!(printed, "event printer finished"),
            Err(e) => warn!(error = %e, "event printer task failed"),
        }
        stats
    })?;

    // Keep the sender alive until the loop has returned.
    drop(shutdown_tx);
    print_summary(&stats);
    Ok(())
}

// Prints decisions and faults until both topics close; returns how many
// lines were printed.
async fn print_events(mut decisions: TopicReceiver, mut alerts: TopicReceiver) -> usize {
    let mut printed = 0;
    let (mut decisions_open, mut alerts_open) = (true, true);
    while decisions_open || alerts_open {
        tokio::select! {
            event = decisions.next(), if decisions_open => match event {
                Some(event) => {
                    if let EventPayload::HeatLocation(decision) = event.payload {
                        println!(
                            "  {}  /heat_location  {}",
                            event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
                            paint(decision)
                        );
                        printed += 1;
                    }
                }
                None => decisions_open = false,
            },
            event = alerts.next(), if alerts_open => match event {
                Some(event) => {
                    if let EventPayload::ActuatorFault { component, message } = event.payload {
                        println!("  {} {}: {}", "FAULT".red().bold(), component, message);
                        printed += 1;
                    }
                }
                None => alerts_open = false,
            },
        }
    }
    printed
}

fn print_summary(stats: &LoopStats) {
    println!();
    println!(
        "  {} {} ticks, {} skipped, {} launches, {} actuation faults, {} publish failures",
        "✓".green().bold(),
        stats.ticks,
        stats.skipped,
        stats.launches_started,
        stats.actuation_faults,
        stats.publish_failures
    );
}

fn paint(decision: Decision) -> ColoredString {
    match decision {
        Decision::Launch => decision.tag().red().bold(),
        Decision::MoveForward => decision.tag().green(),
        Decision::TurnRight | Decision::TurnLeft => decision.tag().cyan(),
        Decision::Idle => decision.tag().dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["heatseek", "run", "--frames", "f.json", "--ticks", "5"])
            .unwrap();
        match cli.command {
            Commands::Run { frames, ticks, config } => {
                assert_eq!(frames, Some(PathBuf::from("f.json")));
                assert_eq!(ticks, Some(5));
                assert!(config.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn classify_requires_frames() {
        assert!(Cli::try_parse_from(["heatseek", "classify"]).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        init(Some(path.clone()), false).unwrap();
        assert!(init(Some(path.clone()), false).is_err());
        init(Some(path), true).unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn event_printer_sees_events_published_before_it_first_runs() {
        let bus = EventBus::default();
        let decisions = bus.subscribe_to(Topic::HeatLocation);
        let alerts = bus.subscribe_to(Topic::SystemAlerts);
        let printer = tokio::spawn(print_events(decisions, alerts));

        // The printer task has not been polled yet on this runtime.
        for decision in [Decision::TurnLeft, Decision::Launch] {
            let event = heatseek_types::Event::new("test", EventPayload::HeatLocation(decision));
            bus.publish_to(Topic::HeatLocation, event).unwrap();
        }
        let fault = EventPayload::ActuatorFault {
            component: "sim_gpio".to_string(),
            message: "write failed".to_string(),
        };
        bus.publish_to(Topic::SystemAlerts, heatseek_types::Event::new("test", fault))
            .unwrap();
        drop(bus);

        assert_eq!(printer.await.unwrap(), 3);
    }

    #[test]
    fn run_replays_frame_file_to_completion() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg_path = dir.path().join("config.toml");
        let cfg = config::Config {
            control: heatseek_runtime::LoopConfig {
                tick_interval_ms: 5,
                ..Default::default()
            },
            launch: heatseek_hal::LaunchProfile {
                step_interval_ms: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        config::save_to(&cfg, &cfg_path).unwrap();

        let frames_path = dir.path().join("frames.json");
        std::fs::write(&frames_path, serde_json::to_string(&frames::demo().unwrap()).unwrap())
            .unwrap();

        run(Some(&cfg_path), Some(&frames_path), None).unwrap();
    }
}
