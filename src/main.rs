use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rangevisor::{Config, LogWriter, Subscribe, Supervisor};

// --- Command Line Arguments ---

#[derive(Debug, Parser)]
#[command(name = "rangevisor")]
#[command(about = "Segmented parallel search over a numeric range")]
#[command(version)]
struct Args {
    /// First value of the search range.
    #[arg(long, default_value_t = Config::default().range_start)]
    start: u64,

    /// Last value of the search range (inclusive).
    #[arg(long, default_value_t = Config::default().range_end)]
    end: u64,

    /// Number of segments (one engine process each).
    #[arg(short = 'n', long, default_value_t = Config::default().segments)]
    segments: usize,

    /// Overlap margin added to both sides of every segment.
    #[arg(long, default_value_t = Config::default().overlap)]
    overlap: u64,

    /// Engine executable.
    #[arg(long, default_value_os_t = Config::default().engine)]
    engine: PathBuf,

    /// Extra engine arguments, placed before the segment arguments.
    #[arg(last = true)]
    engine_args: Vec<String>,

    /// Directory for per-segment checkpoint files.
    #[arg(long, default_value_os_t = Config::default().checkpoint_dir)]
    checkpoint_dir: PathBuf,

    /// Seconds between engine checkpoints.
    #[arg(long, default_value_t = Config::default().checkpoint_interval.as_secs())]
    checkpoint_interval: u64,

    /// Log every K-th progress line.
    #[arg(long, default_value_t = Config::default().progress_throttle)]
    progress_throttle: u64,

    /// Milliseconds granted to workers after a termination request.
    #[arg(long, default_value_t = Config::default().grace.as_millis() as u64)]
    grace_ms: u64,

    /// Leave workers running after the grace period instead of killing them.
    #[arg(long)]
    no_force_kill: bool,

    /// Milliseconds granted to killed workers to be reaped.
    #[arg(long, default_value_t = Config::default().kill_wait.as_millis() as u64)]
    kill_wait_ms: u64,

    /// Disable CPU pinning.
    #[arg(long)]
    no_pin: bool,

    /// CPUs used for pinning (0 = detect).
    #[arg(long, default_value_t = Config::default().cpu_count)]
    cpus: usize,

    /// Milliseconds between consecutive worker launches.
    #[arg(long, default_value_t = Config::default().launch_stagger.as_millis() as u64)]
    stagger_ms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            range_start: args.start,
            range_end: args.end,
            segments: args.segments,
            overlap: args.overlap,
            engine: args.engine,
            engine_args: args.engine_args,
            checkpoint_dir: args.checkpoint_dir,
            checkpoint_interval: Duration::from_secs(args.checkpoint_interval),
            progress_throttle: args.progress_throttle,
            grace: Duration::from_millis(args.grace_ms),
            force_kill: !args.no_force_kill,
            kill_wait: Duration::from_millis(args.kill_wait_ms),
            pin_cpus: !args.no_pin,
            cpu_count: args.cpus,
            launch_stagger: Duration::from_millis(args.stagger_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from(Args::parse());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let report = Supervisor::new(cfg, subs)
        .run()
        .await
        .context("search failed to start")?;

    tracing::info!(
        stop = ?report.stop,
        progress = report.progress_events,
        "search finished"
    );
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let cfg = Config::from(Args::parse_from(["rangevisor"]));
        let default = Config::default();
        assert_eq!(cfg.range_start, default.range_start);
        assert_eq!(cfg.range_end, default.range_end);
        assert_eq!(cfg.segments, default.segments);
        assert_eq!(cfg.grace, default.grace);
        assert_eq!(cfg.kill_wait, default.kill_wait);
        assert_eq!(cfg.launch_stagger, default.launch_stagger);
        assert_eq!(cfg.checkpoint_interval, default.checkpoint_interval);
        assert_eq!(cfg.engine, default.engine);
        assert_eq!(cfg.checkpoint_dir, default.checkpoint_dir);
        assert_eq!(cfg.cpu_count, default.cpu_count);
        assert!(cfg.force_kill && cfg.pin_cpus);
    }

    #[test]
    fn test_engine_args_after_separator() {
        let args = Args::parse_from([
            "rangevisor", "--start", "10", "--end", "99", "-n", "3", "--no-pin", "--engine", "sh",
            "--", "-c", "exit 0",
        ]);
        let cfg = Config::from(args);
        assert_eq!((cfg.range_start, cfg.range_end, cfg.segments), (10, 99, 3));
        assert_eq!(cfg.engine_args, vec!["-c", "exit 0"]);
        assert!(!cfg.pin_cpus);
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
