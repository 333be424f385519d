use anyhow::Result;
use clap::Parser;
use helm_sens::sources::SimulatedSource;
use helm_sens::{AppConfig, MonitorService, SensorReading};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// helm-sens - engine and tank sensor monitor
#[derive(Parser, Debug, Clone)]
#[command(name = "helm-sens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Config file to use instead of the one in the user config directory
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Exit after this many seconds instead of waiting for Ctrl+C
    #[arg(long = "duration", value_name = "SECS")]
    duration: Option<u64>,

    /// Print one JSON snapshot per line instead of the table
    #[arg(long = "json")]
    json: bool,

    /// Probability (0-1) that a simulated read fails
    #[arg(long = "dropout", value_name = "P", default_value = "0.0")]
    dropout: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info, 2: debug, 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting helm-sens v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let policies = config.policy_table()?;

    warn!("No hardware driver linked, polling simulated sensors");
    let source = SimulatedSource::engine().with_dropout(cli.dropout);
    let monitor = MonitorService::new(policies, source);
    monitor.start()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_display(&monitor, &cli, config.display_interval()));

    // Stop polling before reporting the display result
    monitor.stop();
    result
}

/// Print readings every `interval` until Ctrl+C or the requested duration
async fn run_display(monitor: &MonitorService, cli: &Cli, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let deadline = cli.duration.map(Duration::from_secs);
    let expiry = async move {
        match deadline {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    let sensors: Vec<String> = monitor.available_sensors().into_iter().collect();
    if !cli.json {
        print_header(&sensors);
    }

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                info!("Interrupted, stopping sensor monitor");
                break;
            }
            _ = &mut expiry => break,
            _ = ticker.tick() => {
                if cli.json {
                    println!("{}", serde_json::to_string(&monitor.latest_values())?);
                } else {
                    print_row(monitor, &sensors);
                }
            }
        }
    }

    Ok(())
}

fn print_header(sensors: &[String]) {
    let mut header = format!("{:<8}", "Time");
    for sensor in sensors {
        header.push_str(&format!(" | {:^18}", sensor));
    }
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));
}

fn print_row(monitor: &MonitorService, sensors: &[String]) {
    let readings = monitor.get_all_readings();
    let mut row = chrono::Local::now().format("%H:%M:%S").to_string();
    for sensor in sensors {
        row.push_str(&format!(
            " | {:^18}",
            format_reading(sensor, readings.get(sensor))
        ));
    }
    println!("{}", row);
}

/// Format a reading with the unit of its sensor
fn format_reading(sensor: &str, reading: Option<&SensorReading>) -> String {
    let Some(reading) = reading else {
        return "N/A".to_string();
    };

    let value = reading.value;
    let formatted = match sensor {
        "fuel_level" => format!("{:.1}%", value),
        "rpm" => format!("{:.0} RPM", value),
        "battery" => format!("{:.2}V", value),
        "temperature" => format!("{:.1}°C", value),
        _ => format!("{:.2}", value),
    };

    if reading.stale {
        format!("{} (stale)", formatted)
    } else {
        formatted
    }
}
