use clap::Parser;
use std::path::PathBuf;

/// Frequency-based Rowhammer fuzzer.
#[derive(Debug, Parser, Clone)]
#[command(name = "rh-fuzz", version, about)]
pub struct CliArgs {
    /// JSON device configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Fuzzing deadline, in hours.
    #[arg(short = 't', long = "runtime-limit", default_value_t = 3)]
    pub runtime_limit_hours: u64,

    /// Log destination.
    #[arg(short = 'l', long = "logfile", default_value = "run.log")]
    pub logfile: PathBuf,

    /// Mappers created per pattern before moving on.
    #[arg(short = 'p', long = "probes", default_value_t = 3)]
    pub probes: usize,

    /// After the run, sweep the best pattern over a larger contiguous area.
    #[arg(long = "sweeping")]
    pub sweeping: bool,

    /// Generate N patterns with no memory present (dry run) and exit.
    #[arg(long = "generate-patterns")]
    pub generate_patterns: Option<usize>,

    /// Load a previously recorded `fuzz-summary.json` instead of fuzzing.
    #[arg(long = "load-json")]
    pub load_json: Option<PathBuf>,

    /// Replay the patterns loaded via `--load-json` instead of fuzzing fresh.
    #[arg(long = "replay-patterns")]
    pub replay_patterns: bool,

    /// Hugetlbfs mount point backing the allocation.
    #[arg(long = "hugetlbfs-mount", default_value = "/mnt/huge")]
    pub hugetlbfs_mount: PathBuf,

    /// Size of the hugepage allocation, in GiB.
    #[arg(long = "alloc-size-gib", default_value_t = 4)]
    pub alloc_size_gib: usize,

    /// RAS event database to poll for corrected bit flips.
    #[arg(long = "ras-db", default_value = "/var/lib/rasdaemon/ras-mc_event.db")]
    pub ras_db: PathBuf,

    /// CPU core to pin the fuzzing loop to.
    #[arg(long = "cpu", default_value_t = 0)]
    pub cpu: usize,
}
