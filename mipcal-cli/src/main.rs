//! mipcal command-line interface.
//!
//! Reads calorimeter hit files, reconstructs MIP tracks, and writes them out.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use log::{debug, info};
use mipcal_algorithms::{run_pipeline, TrackFinder};
use mipcal_core::{
    AmbiguityPolicy, EventHits, HitSource, RunStatistics, Section, SeedPolicy, TrackingConfig,
};
use mipcal_io::{CsvHitReader, TrackFileWriter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    MipcalIo(#[from] mipcal_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] mipcal_core::Error),

    #[error("Config error in {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Seed layer fallback selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeedLayer {
    /// Lowest remaining layer
    Lowest,
    /// Lower median of the remaining layers
    Median,
}

/// Choice among several clusters in one extension window.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ambiguity {
    /// Lowest (layer, strip) key
    LowestKey,
    /// Closest to the projected track centre
    NearestCenter,
}

/// MIP track finder for segmented sampling calorimeters.
#[derive(Parser)]
#[command(name = "mipcal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Tracking parameters; each flag overrides the config file.
#[derive(Args, Debug, Default)]
struct TrackingArgs {
    /// JSON tracking configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of layers per section
    #[arg(long)]
    num_layers: Option<u32>,

    /// Highest strip index
    #[arg(long)]
    num_strips: Option<u32>,

    /// Key modulus; defaults to the next power of ten above the strip count
    #[arg(long)]
    layer_modulus: Option<u32>,

    /// Layer tried first when seeding a section
    #[arg(long)]
    first_seed_layer: Option<u32>,

    /// Photo-electron threshold; hits at or below it are noise
    #[arg(long)]
    min_pe: Option<f32>,

    /// Energy ceiling of a MIP cluster
    #[arg(long)]
    max_energy: Option<f32>,

    /// Layers on each side of the seed scanned by the cone
    #[arg(long)]
    cone_depth: Option<u32>,

    /// Full strip opening of the cone at its far end
    #[arg(long)]
    cone_angle: Option<f64>,

    /// Hits the cone must collect
    #[arg(long)]
    min_cone_hits: Option<usize>,

    /// Extension window width (strips)
    #[arg(long)]
    track_width: Option<u32>,

    /// A track must hit more than this many layers
    #[arg(long)]
    min_layer_hits: Option<usize>,

    /// Maximum tracks per event
    #[arg(long)]
    max_tracks: Option<usize>,

    /// Seed layer fallback
    #[arg(long, value_enum)]
    seed_policy: Option<SeedLayer>,

    /// Extension ambiguity resolution
    #[arg(long, value_enum)]
    ambiguity: Option<Ambiguity>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct tracks from CSV hit files
    Reconstruct {
        /// Input hit file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path (.csv for CSV, anything else for binary)
        #[arg(short, long)]
        output: PathBuf,

        /// Events reconstructed in parallel per batch
        #[arg(long, default_value = "256")]
        batch_size: usize,

        #[command(flatten)]
        tracking: TrackingArgs,
    },

    /// Show information about a hit file
    Info {
        /// Input hit file
        input: PathBuf,
    },

    /// Time reconstruction of a hit file
    Benchmark {
        /// Input hit file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,

        #[command(flatten)]
        tracking: TrackingArgs,
    },
}

fn load_config(path: &Path) -> Result<TrackingConfig> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })
}

impl TrackingArgs {
    fn resolve(&self) -> Result<TrackingConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => TrackingConfig::default(),
        };

        if let Some(value) = self.num_layers {
            config.num_layers = value;
        }
        if let Some(value) = self.num_strips {
            config.num_strips = value;
        }
        if let Some(value) = self.layer_modulus {
            config.layer_modulus = Some(value);
        }
        if let Some(value) = self.first_seed_layer {
            config.first_seed_layer = value;
        }
        if let Some(value) = self.min_pe {
            config.min_pe = value;
        }
        if let Some(value) = self.max_energy {
            config.max_energy = value;
        }
        if let Some(value) = self.cone_depth {
            config.cone_depth = value;
        }
        if let Some(value) = self.cone_angle {
            config.cone_angle = value;
        }
        if let Some(value) = self.min_cone_hits {
            config.min_cone_hits = value;
        }
        if let Some(value) = self.track_width {
            config.track_width = value;
        }
        if let Some(value) = self.min_layer_hits {
            config.min_track_layer_hits = value;
        }
        if let Some(value) = self.max_tracks {
            config.max_track_count = value;
        }
        if let Some(policy) = self.seed_policy {
            config.seed_policy = match policy {
                SeedLayer::Lowest => SeedPolicy::Lowest,
                SeedLayer::Median => SeedPolicy::Median,
            };
        }
        if let Some(policy) = self.ambiguity {
            config.ambiguity_policy = match policy {
                Ambiguity::LowestKey => AmbiguityPolicy::LowestKey,
                Ambiguity::NearestCenter => AmbiguityPolicy::NearestCenter,
            };
        }

        config.validate()?;
        Ok(config)
    }
}

fn print_statistics(stats: &RunStatistics) {
    let totals = &stats.totals;
    println!("Events: {}", stats.events);
    println!("Tracks: {}", totals.tracks_found);
    println!("Mean tracks per event: {:.3}", stats.mean_tracks_per_event());
    println!("Hits indexed: {}", totals.hits_loaded);
    println!("Hits claimed by tracks: {}", totals.hits_claimed);
    println!("Noise hits: {}", totals.noise_hits);
    println!("Out-of-range hits: {}", totals.out_of_range_hits);
    println!("Overwritten hits: {}", totals.overwritten_hits);
    println!(
        "Seeds tried: {} (cone failures {}, rejected tracks {})",
        totals.seeds_tried, totals.cone_failures, totals.acceptance_failures
    );
    println!("Ambiguous extensions: {}", totals.ambiguous_matches);
    if totals.erase_violations > 0 {
        println!("Erase violations: {}", totals.erase_violations);
    }
    for (tracks, events) in &stats.tracks_per_event {
        println!("  {:>4} tracks: {} events", tracks, events);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Reconstruct {
            input,
            output,
            batch_size,
            tracking,
        } => {
            let config = tracking.resolve()?;
            debug!("Tracking configuration: {:?}", config);
            let finder = TrackFinder::new(config)?;

            let start = Instant::now();
            let mut writer = TrackFileWriter::create(&output)?;
            info!(
                "Writing {:?} output to {}",
                writer.format(),
                output.display()
            );

            let mut stats = RunStatistics::new();
            for path in &input {
                info!("Reading {}", path.display());
                let mut reader = CsvHitReader::open(path)?;
                let file_stats = run_pipeline(&finder, &mut reader, &mut writer, batch_size)?;
                debug!(
                    "{}: {} events, {} tracks",
                    path.display(),
                    file_stats.events,
                    file_stats.totals.tracks_found
                );
                stats.merge(&file_stats);
            }

            let elapsed = start.elapsed();
            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                elapsed.as_secs_f64()
            );
            print_statistics(&stats);
        }

        Commands::Info { input } => {
            let mut reader = CsvHitReader::open(&input)?;
            let file_size = reader.file_size();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );
            println!("Positions: {}", if reader.has_positions() { "yes" } else { "no" });

            let mut events = 0usize;
            let mut hits = 0usize;
            let mut sections: BTreeMap<Section, usize> = BTreeMap::new();
            let mut layers: Option<(u32, u32)> = None;
            let mut strips: Option<(u32, u32)> = None;

            while let Some(event) = reader.next_event()? {
                events += 1;
                hits += event.len();
                for hit in &event.hits {
                    *sections.entry(hit.section).or_insert(0) += 1;
                    layers = Some(layers.map_or((hit.layer, hit.layer), |(lo, hi)| {
                        (lo.min(hit.layer), hi.max(hit.layer))
                    }));
                    strips = Some(strips.map_or((hit.strip, hit.strip), |(lo, hi)| {
                        (lo.min(hit.strip), hi.max(hit.strip))
                    }));
                }
            }

            println!("Events: {}", events);
            println!("Hits: {}", hits);
            for (section, count) in &sections {
                println!("  {:<7} {} hits", section.name(), count);
            }
            if let (Some((min_layer, max_layer)), Some((min_strip, max_strip))) = (layers, strips) {
                println!("Layer range: {} - {}", min_layer, max_layer);
                println!("Strip range: {} - {}", min_strip, max_strip);
            }
        }

        Commands::Benchmark {
            input,
            iterations,
            tracking,
        } => {
            let finder = TrackFinder::new(tracking.resolve()?)?;
            let events = CsvHitReader::open(&input)?.read_all()?;
            let hit_count: usize = events.iter().map(EventHits::len).sum();

            println!(
                "Benchmarking with {} events ({} hits), {} iterations",
                events.len(),
                hit_count,
                iterations
            );
            println!(
                "{:<12} | {:<15} | {:<15} | {:<15}",
                "Mode", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<65}", "");

            for (name, parallel) in [("Sequential", false), ("Parallel", true)] {
                let mut times = Vec::with_capacity(iterations);
                let mut tracks = 0usize;

                for _ in 0..iterations.max(1) {
                    let batch = events.clone();
                    let start = Instant::now();
                    let results = if parallel {
                        mipcal_algorithms::reconstruct_events(&finder, batch)
                    } else {
                        batch
                            .into_iter()
                            .map(|event| finder.reconstruct(event))
                            .collect()
                    };
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                    tracks = results.iter().map(|event| event.tracks.len()).sum();
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;

                println!(
                    "{:<12} | {:<15.2} | {:<15.2} | {:<15.2}",
                    name, mean_time, min_time, max_time
                );
                debug!("{}: {} tracks", name, tracks);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_reconstruct() {
        let cli = Cli::try_parse_from([
            "mipcal",
            "-v",
            "reconstruct",
            "a.csv",
            "b.csv",
            "-o",
            "out.csv",
            "--cone-depth",
            "2",
            "--seed-policy",
            "median",
            "--ambiguity",
            "nearest-center",
        ])
        .unwrap();
        assert!(cli.verbose);

        let Commands::Reconstruct {
            input,
            batch_size,
            tracking,
            ..
        } = cli.command
        else {
            panic!("expected reconstruct");
        };
        assert_eq!(input.len(), 2);
        assert_eq!(batch_size, 256);

        let config = tracking.resolve().unwrap();
        assert_eq!(config.cone_depth, 2);
        assert_eq!(config.seed_policy, SeedPolicy::Median);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::NearestCenter);
        assert_eq!(config.num_layers, 81);
    }

    #[test]
    fn test_config_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(
            &path,
            r#"{ "num_layers": 40, "track_width": 4, "seed_policy": "median" }"#,
        )
        .unwrap();

        let args = TrackingArgs {
            config: Some(path),
            track_width: Some(8),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.num_layers, 40);
        assert_eq!(config.track_width, 8);
        assert_eq!(config.seed_policy, SeedPolicy::Median);
        assert_eq!(config.num_strips, 34);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = TrackingArgs {
            cone_depth: Some(0),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Core(_))));
    }

    #[test]
    fn test_key_and_seed_layer_overrides() {
        let cli = Cli::try_parse_from([
            "mipcal",
            "benchmark",
            "hits.csv",
            "--layer-modulus",
            "64",
            "--first-seed-layer",
            "7",
        ])
        .unwrap();
        let Commands::Benchmark { tracking, .. } = cli.command else {
            panic!("expected benchmark");
        };

        let config = tracking.resolve().unwrap();
        assert_eq!(config.layer_modulus, Some(64));
        assert_eq!(config.first_seed_layer, 7);
        assert_eq!(config.key_scheme().unwrap().modulus(), 64);
    }

    #[test]
    fn test_unkeyable_strip_count_is_rejected() {
        let args = TrackingArgs {
            num_strips: Some(u32::MAX),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Core(_))));

        let args = TrackingArgs {
            layer_modulus: Some(34),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Core(_))));
    }

    #[test]
    fn test_bad_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, "{ not json").unwrap();

        let args = TrackingArgs {
            config: Some(path),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Config { .. })));
    }
}
