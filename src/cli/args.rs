use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vwp-fetcher")]
#[command(about = "Fetch archived NVW wind profiles and stage them for hodograph and VWP plotting")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress and log only warnings")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file [default: vwp-fetcher.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and plot a window of profiles, or re-plot a local archive
    Run {
        #[arg(help = "Radar site id, e.g. KTLX or TORD")]
        station: String,

        #[arg(short, long, help = "Window start, YYYYMMDD/HH (UTC)")]
        start: Option<String>,

        #[arg(short, long, help = "Window end, YYYYMMDD/HH (UTC)")]
        end: Option<String>,

        #[arg(
            short,
            long,
            help = "Directory of previously inflated products (used when no window is given)"
        )]
        archive_dir: Option<PathBuf>,

        #[arg(long, help = "Surface wind, DDD/SS")]
        surface_wind: Option<String>,

        #[arg(
            long,
            default_value = "BRM",
            help = "Storm motion: DDD/SS, BRM (right mover) or BLM (left mover)"
        )]
        storm_motion: String,

        #[arg(long, help = "Print the run summary as JSON")]
        json: bool,
    },

    /// Show the oldest and newest scans the remote archive holds for a site
    Availability {
        #[arg(help = "Radar site id, e.g. KTLX or TORD")]
        station: String,

        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },
}
