//! Campanile: alarm scheduler host
//!
//! Main binary with subcommands:
//! - `run`: Host loop driving the scheduler from the wall clock
//! - `list`, `stats`: Inspect the persisted alarms
//! - `add`, `modify`, `delete`, `enable`, `disable`: Edit customizable alarms

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod admin;
mod daemon;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "campanile")]
#[command(about = "Fixed-capacity alarm scheduler", long_about = None)]
struct Cli {
    /// Directory holding the customizable alarm document
    #[arg(long, global = true, env = "CAMPANILE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the host loop until ctrl-c
    Run {
        /// Milliseconds between clock checks
        #[arg(long, default_value_t = daemon::DEFAULT_TICK_MS)]
        tick_ms: u64,

        /// Minutes between heartbeat log lines (0 disables)
        #[arg(long, default_value_t = daemon::DEFAULT_HEARTBEAT_MINUTES)]
        heartbeat_minutes: u16,

        /// Chime at the top of every hour.
        /// Accepts "1", "true", "yes", or "on".
        #[arg(long, env = "CAMPANILE_HOURLY_CHIME", value_parser = parse_bool_env, default_value = "false")]
        hourly_chime: bool,
    },

    /// Print the customizable alarm document
    List {
        /// Also dump every alarm slot, system alarms included
        #[arg(long)]
        verbose: bool,
    },

    /// Print alarm counts and clock status
    Stats,

    /// Add a customizable alarm
    Add {
        #[command(flatten)]
        alarm: admin::AlarmArgs,
    },

    /// Replace the fields of a customizable alarm
    Modify {
        /// Alarm id
        id: u32,

        #[command(flatten)]
        alarm: admin::AlarmArgs,
    },

    /// Delete a customizable alarm
    Delete {
        /// Alarm id
        id: u32,
    },

    /// Enable a customizable alarm
    Enable {
        /// Alarm id
        id: u32,
    },

    /// Disable a customizable alarm
    Disable {
        /// Alarm id
        id: u32,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campanile")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "campanile=info,campanile_scheduler=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Run {
            tick_ms,
            heartbeat_minutes,
            hourly_chime,
        } => {
            daemon::run(daemon::DaemonConfig {
                data_dir,
                tick: Duration::from_millis(tick_ms.max(1)),
                heartbeat_minutes,
                hourly_chime,
            })
            .await
        }

        Commands::List { verbose } => admin::list(&data_dir, verbose),
        Commands::Stats => admin::stats(&data_dir),
        Commands::Add { alarm } => admin::add(&data_dir, &alarm),
        Commands::Modify { id, alarm } => admin::modify(&data_dir, id, &alarm),
        Commands::Delete { id } => admin::delete(&data_dir, id),
        Commands::Enable { id } => admin::set_enabled(&data_dir, id, true),
        Commands::Disable { id } => admin::set_enabled(&data_dir, id, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1", true ; "one")]
    #[test_case("YES", true ; "upper yes")]
    #[test_case("off", false ; "off")]
    #[test_case("", false ; "empty")]
    fn test_parse_bool_env(input: &str, expected: bool) {
        assert_eq!(parse_bool_env(input), Ok(expected));
    }

    #[test]
    fn test_parse_bool_env_rejects_garbage() {
        assert!(parse_bool_env("maybe").is_err());
    }

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from([
            "campanile",
            "--data-dir",
            "/tmp/bells",
            "add",
            "--name",
            "Morning",
            "--hour",
            "7",
            "--minute",
            "15",
            "--day",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/bells")));
        match cli.command {
            Commands::Add { alarm } => {
                assert_eq!(alarm.name, "Morning");
                assert_eq!((alarm.hour, alarm.minute, alarm.day), (7, 15, 2));
                assert_eq!(alarm.type_tag, "BELL");
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_cli_rejects_out_of_range_hour() {
        assert!(
            Cli::try_parse_from(["campanile", "add", "--name", "x", "--hour", "24", "--minute", "0"])
                .is_err()
        );
    }
}
