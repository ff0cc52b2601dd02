//! CLI for jitternoise — inspect, read and benchmark the CPU jitter noise source.

mod commands;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jitternoise")]
#[command(about = "jitternoise — CPU timing jitter noise source with honest entropy accounting")]
#[command(version = jitternoise_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file ({"entropy_bits": .., "security_strength_bits": ..})
    #[arg(long, global = true)]
    config: Option<String>,

    /// Entropy bits credited to a full-size read (overrides config and environment)
    #[arg(long, global = true)]
    entropy_bits: Option<u32>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration, entropy ceiling and collector lifecycle
    Status {
        /// Perform one full-size read first so the collector gets constructed
        #[arg(long)]
        sample: bool,
    },

    /// Read bytes from the noise source and report the credited entropy
    Read {
        /// Number of bytes to read
        #[arg(long, default_value = "32")]
        bytes: usize,

        /// Write the raw bytes to this file instead of printing hex
        #[arg(long)]
        output: Option<String>,
    },

    /// Repeated reads: success rate, credited bits, throughput, raw quality
    Bench {
        /// Number of reads
        #[arg(long, default_value = "100")]
        rounds: usize,

        /// Bytes per read
        #[arg(long, default_value = "32")]
        bytes: usize,
    },

    /// Gather a SHA-256 conditioned seed from the noise source
    Seed {
        /// Seed length in bytes
        #[arg(long, default_value = "32")]
        bytes: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let opts = commands::GlobalOptions {
        config_path: cli.config.as_deref(),
        entropy_bits: cli.entropy_bits,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Status { sample } => commands::status::run(&opts, sample),
        Commands::Read { bytes, output } => commands::read::run(&opts, bytes, output.as_deref()),
        Commands::Bench { rounds, bytes } => commands::bench::run(&opts, rounds, bytes),
        Commands::Seed { bytes } => commands::seed::run(&opts, bytes),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
