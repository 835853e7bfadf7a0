use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use serialtap_lib::history::DataDirection;
use serialtap_lib::tui::{self, MonitorOptions};

/// Time allowed for the stdin reader to wind down after the UI exits
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial traffic monitor: shows a byte stream as timestamped hex and text rows.
#[derive(Parser, Debug)]
#[command(name = "serialtap", version, about)]
struct Args {
    /// Read from this file, FIFO or device instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Direction recorded for received bytes (a_to_b, b_to_a, a_to_pc, b_to_pc, pc_to_a, pc_to_b)
    #[arg(short, long, default_value = "a_to_b")]
    direction: DataDirection,

    /// Direction recorded for bytes typed into the send line
    #[arg(long, default_value = "pc_to_a")]
    send_direction: DataDirection,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write a log file to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let options = MonitorOptions {
        input: args.input,
        incoming_direction: args.direction,
        send_direction: args.send_direction,
        settings_path: args.settings,
        log_dir: args.log_dir,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(tui::run(options));
    // A blocked stdin read would otherwise keep the process alive
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        eprintln!("serialtap: {}", e);
        std::process::exit(1);
    }
}
