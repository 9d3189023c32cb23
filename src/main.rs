//! somgrid CLI - Self-Organizing Map training
//!
//! Command-line interface for training maps on sample files or random data.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::error;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use somgrid::normalize::normalize_columns;
use somgrid::{Result, SomConfig, SomError, Topology};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "somgrid")]
#[command(version)]
#[command(about = "Self-Organizing Map trainer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyArg {
    Square,
    Hex,
    HexAlt,
    Cube,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a map and write the resulting grid as JSON
    Train {
        /// JSON configuration file (overrides the grid flags below)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Grid topology
        #[arg(short, long, value_enum, default_value = "square")]
        topology: TopologyArg,

        /// Number of grid rows
        #[arg(long, default_value = "10")]
        height: usize,

        /// Number of grid columns
        #[arg(long, default_value = "10")]
        width: usize,

        /// Number of grid layers (cube topology only)
        #[arg(long, default_value = "1")]
        layers: usize,

        /// Feature depth of the random samples
        #[arg(short, long, default_value = "3")]
        features: usize,

        /// Number of epochs
        #[arg(short, long, default_value = "5")]
        epochs: usize,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Keep sample order fixed across epochs
        #[arg(long)]
        no_shuffle: bool,

        /// Sample file (one sample per line, comma or whitespace separated)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of uniform random samples when no input file is given
        #[arg(short, long, default_value = "1000")]
        random: usize,

        /// Rescale every feature column to [0, 1] before training
        #[arg(long)]
        normalize: bool,

        /// Output file for the trained grid
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = match cli.command {
        Commands::Train {
            config,
            topology,
            height,
            width,
            layers,
            features,
            epochs,
            seed,
            no_shuffle,
            input,
            random,
            normalize,
            output,
        } => {
            let config = match config {
                Some(path) => SomConfig::from_json_file(path),
                None => Ok(SomConfig {
                    topology: match topology {
                        TopologyArg::Square => Topology::Square { height, width },
                        TopologyArg::Hex => Topology::Hex { height, width },
                        TopologyArg::HexAlt => Topology::HexAlt { height, width },
                        TopologyArg::Cube => Topology::Cube {
                            height,
                            width,
                            depth: layers,
                        },
                    },
                    feature_depth: features,
                    epochs,
                    shuffle: !no_shuffle,
                    seed,
                    ..Default::default()
                }),
            };
            config.and_then(|c| train(c, input, random, normalize, output))
        }

        Commands::Config => show_default_config(),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Reads samples from a text file. Blank lines and lines starting with `#` are skipped.
fn load_samples(path: &Path) -> Result<Vec<Vec<f64>>> {
    if !path.exists() {
        return Err(SomError::FileNotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);

    let mut samples = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let sample = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f64>().map_err(|e| {
                    SomError::Parse(format!("line {}: '{}': {}", line_no + 1, t, e))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        samples.push(sample);
    }

    Ok(samples)
}

fn random_samples(count: usize, depth: usize, seed: Option<u64>) -> Vec<Vec<f64>> {
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s ^ 0xA5A5_A5A5),
        None => ChaCha8Rng::from_entropy(),
    };
    (0..count)
        .map(|_| (0..depth).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

fn train(
    mut config: SomConfig,
    input: Option<PathBuf>,
    random: usize,
    normalize: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let start_time = Instant::now();

    let mut samples = match &input {
        Some(path) => {
            let samples = load_samples(path)?;
            if let Some(first) = samples.first() {
                config.feature_depth = first.len();
            }
            println!("✓ Loaded {} samples from {}", samples.len(), path.display());
            samples
        }
        None => {
            let samples = random_samples(random, config.feature_depth, config.seed);
            println!("✓ Generated {} random samples", samples.len());
            samples
        }
    };

    if normalize {
        normalize_columns(&mut samples)?;
    }

    let mut som = config.build()?;
    println!(
        "✓ Initialized {:?} grid with {} nodes",
        config.topology,
        som.grid().len()
    );

    let bar_style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .map_err(|e| SomError::Config(e.to_string()))?
        .progress_chars("█▓▒░  ");

    let pb = ProgressBar::new(config.epochs as u64);
    pb.set_style(bar_style);
    pb.set_message("Training...");

    for epoch in 0..config.epochs {
        som.train_epoch(&samples, epoch, config.epochs, config.shuffle)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    if !samples.is_empty() {
        println!(
            "✓ Quantization error: {:.5}",
            som.quantization_error(&samples)?
        );
        println!(
            "✓ Topographic error:  {:.5}",
            som.topographic_error(&samples)?
        );
    }

    let snapshot = som.grid().snapshot();
    let json = serde_json::to_string_pretty(&snapshot)?;
    match output {
        Some(path) => {
            fs::write(&path, json)?;
            println!("✓ Wrote grid to {}", path.display());
        }
        None => println!("{}", json),
    }

    println!("Done in {}", HumanDuration(start_time.elapsed()));
    Ok(())
}

fn show_default_config() -> Result<()> {
    println!("{}", SomConfig::default().to_json_string()?);
    Ok(())
}
