use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use humantime::parse_duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Container runtime event notifier", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read the event stream once, process what arrived, then exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,

    /// Override the drain interval (e.g. "500ms").
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Host identity added to every scope as `host.mac=<ID>`.
    #[arg(long, value_name = "ID")]
    pub machine_id: Option<String>,

    /// Log notifications instead of delivering them.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Emit JSON logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "runtime_events=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
