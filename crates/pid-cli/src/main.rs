//! pidcal CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod convert;
mod make_hists;
mod ref_calib;

#[derive(Parser)]
#[command(name = "pidcal")]
#[command(about = "pidcal - binned PID efficiency histograms and reference-sample scoring")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create sWeighted PID efficiency histograms from a calibration sample
    MakeEffHists {
        /// Calibration sample name (Turbo18, Electron16, ...)
        #[arg(short, long)]
        sample: String,

        /// Magnet polarity
        #[arg(short, long, value_parser = ["up", "down"])]
        magnet: String,

        /// Particle type (K, Pi, Mu, ...)
        #[arg(short, long)]
        particle: String,

        /// PID cut string, e.g. 'DLLK > 4' (repeat for multiple cuts)
        #[arg(short = 'i', long = "pid-cut", required = true)]
        pid_cuts: Vec<String>,

        /// Arbitrary cut string, e.g. 'IsMuon == 0' (repeat for multiple cuts)
        #[arg(short = 'c', long = "cut")]
        cuts: Vec<String>,

        /// Binning variable (repeat for multiple variables; order defines the axes)
        #[arg(short = 'b', long = "bin-var", required = true)]
        bin_vars: Vec<String>,

        /// JSON file with alternative binnings {particle: {variable: [edges]}}
        #[arg(short = 'g', long)]
        binning_file: Option<PathBuf>,

        /// Calibration catalog JSON with per-sample file lists
        #[arg(short = 'a', long)]
        catalog: Option<PathBuf>,

        /// Read calibration file paths from a text file, one per line
        #[arg(short = 'f', long)]
        file_list: Option<PathBuf>,

        /// Read a single local calibration table (CSV) directly
        #[arg(short = 'd', long)]
        local_dataframe: Option<PathBuf>,

        /// Maximum number of calibration files to read (testing only)
        #[arg(short = 'n', long)]
        max_files: Option<usize>,

        /// Directory where to save output files
        #[arg(short, long, default_value = "pidcal_output")]
        output_dir: PathBuf,
    },

    /// Assign per-track and per-event PID efficiencies to a reference sample
    RefCalib {
        /// Calibration sample name the efficiency histograms were made from
        #[arg(short, long)]
        sample: String,

        /// Magnet polarity
        #[arg(short, long, value_parser = ["up", "down"])]
        magnet: String,

        /// Reference sample file (CSV)
        #[arg(short = 'f', long)]
        ref_file: PathBuf,

        /// Tracked particle spec 'PREFIX=PARTICLE:PID_CUT',
        /// e.g. 'Bach=K:DLLK>4' (repeat for multiple particles)
        #[arg(short = 'p', long = "ref-par", required = true)]
        ref_pars: Vec<String>,

        /// Binning variable spec 'VAR=BRANCH' mapping a binning variable to
        /// its reference-sample branch name, e.g. 'P=mom' (repeat; order
        /// must match the efficiency histograms)
        #[arg(short = 'b', long = "bin-var", required = true)]
        bin_vars: Vec<String>,

        /// Treat empty efficiency bins as zero efficiency (legacy convention)
        #[arg(long)]
        compatibility: bool,

        /// Directory with the efficiency histograms; the output table is
        /// written next to them
        #[arg(short, long, default_value = "pidcal_output")]
        output_dir: PathBuf,
    },

    /// Convert an efficiency artifact to native 1D/2D/3D histogram objects
    Convert {
        /// Efficiency artifact file (effhists-*.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file. Defaults to the input with a `.native.json` suffix.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::MakeEffHists {
            sample,
            magnet,
            particle,
            pid_cuts,
            cuts,
            bin_vars,
            binning_file,
            catalog,
            file_list,
            local_dataframe,
            max_files,
            output_dir,
        } => make_hists::run(&make_hists::Config {
            sample,
            magnet,
            particle,
            pid_cuts,
            cuts,
            bin_vars,
            binning_file,
            catalog,
            file_list,
            local_dataframe,
            max_files,
            output_dir,
        }),
        Commands::RefCalib {
            sample,
            magnet,
            ref_file,
            ref_pars,
            bin_vars,
            compatibility,
            output_dir,
        } => ref_calib::run(&ref_calib::Config {
            sample,
            magnet,
            ref_file,
            ref_pars,
            bin_vars,
            compatibility,
            output_dir,
        }),
        Commands::Convert { input, output } => convert::run(&input, output.as_deref()),
        Commands::Version => {
            println!("pidcal {}", pid_core::VERSION);
            Ok(())
        }
    }
}
