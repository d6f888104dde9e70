//! Command line configuration for the replay tool.

use std::path::PathBuf;

use clap::Parser;

/// Replays decoded consensus records through the importer.
///
/// Records are projected in file order into an in-memory ledger; every mutation is also
/// logged under the `mirror::sinks::log` target.
#[derive(Parser, Debug)]
#[command(name = "mirror-replay")]
#[command(about = "Replay decoded record items through the mirror importer", long_about = None)]
pub struct Config {
    /// JSON file of record items: either an array or an object with a `records` field
    #[arg(long, env = "MIRROR_REPLAY_RECORDS")]
    pub records: PathBuf,

    /// Importer configuration file (TOML); `MIRROR_IMPORTER_*` variables override it
    #[arg(long, env = "MIRROR_IMPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of recent mutations kept for the summary
    #[arg(long, default_value = "100")]
    pub max_logs: usize,

    /// Only log mutations of this kind (e.g. `token`, `crypto_allowance`)
    #[arg(long)]
    pub kind: Option<String>,

    /// Check that every entity history in the resulting ledger is non-overlapping
    #[arg(long)]
    pub validate: bool,
}
