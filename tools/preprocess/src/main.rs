//! Data preparation tool for the pet breed dataset.
//!
//! This tool provides the dataset operations around the external classifier:
//! - Full preprocessing run (scan, validate, dedup, label map, split, reports)
//! - Dataset check without writing anything
//! - Label map creation and inspection
//! - Dataset statistics
//! - Scoring a predictions file against the test split

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use breed_core::cli::{load_toml_config, setup_cli_logging};
use breed_core::{DataSplit, PipelineConfig};
use breed_dataset::prelude::*;
use breed_dataset::{deduplicate, run_preprocess};

#[derive(Parser, Debug)]
#[command(name = "breed-preprocess")]
#[command(version)]
#[command(about = "Prepare the pet breed image dataset for training", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan, clean and split the dataset, then write tables, label map and reports
    Run {
        /// Dataset root with one folder per class (repeatable)
        #[arg(short, long)]
        data_dir: Vec<PathBuf>,

        /// Fraction held out at each split stage
        #[arg(long)]
        test_size: Option<f64>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Minimum width and height in pixels
        #[arg(long)]
        min_dimension: Option<u32>,

        /// Number of parallel workers (default: num_cpus)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Validate every image and report problems without writing anything
    Check {
        /// Dataset root with one folder per class
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Create or inspect the label map
    LabelMap {
        #[command(subcommand)]
        action: LabelMapAction,
    },

    /// Analyze dataset and print class statistics
    Stats {
        /// Dataset root with one folder per class
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output file for statistics (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a predictions CSV (image,predicted) against the test split
    Evaluate {
        /// Predictions file produced by the classifier
        #[arg(short, long)]
        predictions: PathBuf,

        /// Test split table (default: <splits_dir>/test_data.csv)
        #[arg(long)]
        test_table: Option<PathBuf>,

        /// Label map (default: <metadata_dir>/label_map.json)
        #[arg(long)]
        label_map: Option<PathBuf>,

        /// Model directory whose size is added to the assessment
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum LabelMapAction {
    /// Build the label map from the class folder names
    Create {
        /// Dataset root with one folder per class
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output file (default: <metadata_dir>/label_map.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a persisted label map
    Show {
        /// Label map file (default: <metadata_dir>/label_map.json)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_cli_logging(cli.verbose).context("Failed to set up logging")?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            data_dir,
            test_size,
            seed,
            min_dimension,
            workers,
        } => {
            let config = apply_run_overrides(
                config,
                RunOverrides {
                    data_dirs: data_dir,
                    test_size,
                    seed,
                    min_dimension,
                },
            );
            configure_workers(workers)?;
            cmd_run(&config)
        }
        Commands::Check { data_dir } => cmd_check(&config, &first_root(&config, data_dir)?),
        Commands::LabelMap { action } => match action {
            LabelMapAction::Create { data_dir, output } => {
                let root = first_root(&config, data_dir)?;
                let output = output.unwrap_or_else(|| config.label_map_path());
                cmd_label_map_create(&config, &root, &output)
            }
            LabelMapAction::Show { path } => {
                cmd_label_map_show(&path.unwrap_or_else(|| config.label_map_path()))
            }
        },
        Commands::Stats { data_dir, output } => {
            cmd_stats(&config, &first_root(&config, data_dir)?, output.as_deref())
        }
        Commands::Evaluate {
            predictions,
            test_table,
            label_map,
            model_dir,
        } => {
            let test_table = test_table
                .unwrap_or_else(|| table_path(&config.paths.splits_dir, DataSplit::Test));
            let label_map = label_map.unwrap_or_else(|| config.label_map_path());
            cmd_evaluate(
                &config,
                &predictions,
                &test_table,
                &label_map,
                model_dir.as_deref(),
            )
        }
    }
}

/// Defaults, overlaid with the config file when one is given
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_toml_config::<PipelineConfig>(path)?
        }
        None => PipelineConfig::default(),
    };
    Ok(config)
}

/// Flag values of `run` that take precedence over the loaded configuration
#[derive(Debug, Default)]
struct RunOverrides {
    data_dirs: Vec<PathBuf>,
    test_size: Option<f64>,
    seed: Option<u64>,
    min_dimension: Option<u32>,
}

fn apply_run_overrides(mut config: PipelineConfig, overrides: RunOverrides) -> PipelineConfig {
    if !overrides.data_dirs.is_empty() {
        config.paths.data_dirs = overrides.data_dirs;
    }
    if let Some(test_size) = overrides.test_size {
        config.split.test_size = test_size;
    }
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if let Some(min_dimension) = overrides.min_dimension {
        config.scan.min_dimension = min_dimension;
    }
    config
}

fn configure_workers(workers: Option<usize>) -> Result<()> {
    if let Some(num_workers) = workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build_global()
            .context("Failed to configure worker pool")?;
        info!("Using {} workers", num_workers);
    }
    Ok(())
}

fn first_root(config: &PipelineConfig, data_dir: Option<PathBuf>) -> Result<PathBuf> {
    data_dir
        .or_else(|| config.paths.data_dirs.first().cloned())
        .context("No data directory given")
}

fn cmd_run(config: &PipelineConfig) -> Result<()> {
    let output = run_preprocess(config, true).context("Preprocessing failed")?;
    let stats = &output.statistics;

    println!();
    println!("{}", "Dataset Summary:".cyan().bold());
    println!("  Total images:       {}", stats.total_images);
    println!("  Categories:         {}", stats.num_classes);
    println!("  Duplicates removed: {}", stats.duplicates_removed);
    println!("  Rejected files:     {}", stats.total_rejected());
    println!(
        "  Class sizes:        min {} / max {} / mean {:.1} / std {:.1}",
        stats.min_class_size, stats.max_class_size, stats.mean_class_size, stats.std_class_size
    );
    if stats.is_imbalanced() {
        println!(
            "  {} class imbalance detected (ratio: {:.1})",
            "Warning:".yellow(),
            stats.imbalance_ratio
        );
    }

    println!();
    println!("{}", output.tables.summary());

    println!();
    println!("{}", "Written:".green().bold());
    for path in output.table_paths.values() {
        println!("  {}", path.display());
    }
    println!("  {}", output.label_map_path.display());
    for path in &output.report_paths {
        println!("  {}", path.display());
    }

    Ok(())
}

fn cmd_check(config: &PipelineConfig, root: &Path) -> Result<()> {
    let scanner = ImageScanner::new(config.scan.clone())?.with_progress(true);
    let outcome = scanner
        .scan(&[root.to_path_buf()])
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    println!("{}", "Per-class results:".cyan().bold());
    for summary in outcome.class_summaries() {
        let counts = format!("{}/{}", summary.valid, summary.total());
        let counts = if summary.rejected == 0 {
            counts.green()
        } else {
            counts.yellow()
        };
        println!("  {:40} {}", summary.class_name, counts);
    }

    if !outcome.rejected.is_empty() {
        println!();
        println!("{}", "Rejected files:".yellow().bold());
        for rejected in &outcome.rejected {
            println!("  {} ({})", rejected.path.display(), rejected.reason);
        }
    }

    println!();
    println!(
        "Valid images: {}/{} ({:.1}%)",
        outcome.records.len(),
        outcome.candidates(),
        outcome.success_rate() * 100.0
    );

    Ok(())
}

fn cmd_label_map_create(config: &PipelineConfig, root: &Path, output: &Path) -> Result<()> {
    let label_map = LabelMap::from_folders(root, config.scan.skip_hidden)
        .with_context(|| format!("Failed to read class folders in {}", root.display()))?;
    label_map.save(output)?;

    println!(
        "{} {} classes written to {}",
        "Label map:".green().bold(),
        label_map.len(),
        output.display()
    );
    print!("{}", label_map);
    Ok(())
}

fn cmd_label_map_show(path: &Path) -> Result<()> {
    let label_map =
        LabelMap::load(path).with_context(|| format!("Failed to load label map {}", path.display()))?;

    println!("{} ({} classes)", path.display().to_string().cyan().bold(), label_map.len());
    for (idx, name) in label_map.names().iter().enumerate() {
        let display = label_map.display_name(idx).unwrap_or_default();
        println!("  {:3}: {:30} {}", idx, name, display.dimmed());
    }
    Ok(())
}

fn cmd_stats(config: &PipelineConfig, root: &Path, output: Option<&Path>) -> Result<()> {
    let scanner = ImageScanner::new(config.scan.clone())?.with_progress(true);
    let outcome = scanner
        .scan(&[root.to_path_buf()])
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    let (records, duplicates_removed) = deduplicate(outcome.records);
    let stats = DatasetStatistics::new(&records, duplicates_removed, &outcome.rejected);

    println!("{}", "Dataset Statistics:".cyan().bold());
    println!("{}", stats);
    println!();
    println!("{}", "Samples per class:".cyan().bold());
    for line in stats.distribution_lines() {
        println!("  {}", line);
    }

    if let Some(output) = output {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(output, json)
            .with_context(|| format!("Failed to write statistics to {}", output.display()))?;
        info!("Statistics saved to: {}", output.display());
    }

    Ok(())
}

fn cmd_evaluate(
    config: &PipelineConfig,
    predictions: &Path,
    test_table: &Path,
    label_map: &Path,
    model_dir: Option<&Path>,
) -> Result<()> {
    let label_map =
        LabelMap::load(label_map).with_context(|| format!("Failed to load label map {}", label_map.display()))?;
    let test_rows =
        read_table(test_table).with_context(|| format!("Failed to read {}", test_table.display()))?;
    let predictions = read_predictions(predictions)
        .with_context(|| format!("Failed to read {}", predictions.display()))?;

    let evaluation = score_predictions(&test_rows, &predictions, &label_map)?;

    let model_size = model_dir
        .map(|dir| ModelSize::measure(dir).with_context(|| format!("Failed to measure {}", dir.display())))
        .transpose()?;

    let written = write_evaluation_reports(
        &config.paths.outputs_dir,
        &evaluation.metrics,
        label_map.names(),
        model_size.as_ref(),
    )?;

    println!("{}", "Evaluation Results:".cyan().bold());
    println!("{}", evaluation.metrics);
    if !evaluation.missing_predictions.is_empty() {
        println!(
            "{} {} test images had no prediction ({:.1}% coverage)",
            "Warning:".yellow(),
            evaluation.missing_predictions.len(),
            evaluation.coverage() * 100.0
        );
    }
    if !evaluation.unknown_images.is_empty() {
        println!(
            "{} {} predictions did not match a test image",
            "Warning:".yellow(),
            evaluation.unknown_images.len()
        );
    }
    if let Some(size) = &model_size {
        println!();
        println!("{}", size);
    }

    println!();
    println!("{}", "Written:".green().bold());
    for path in written {
        println!("  {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "breed-preprocess",
            "run",
            "--data-dir",
            "a",
            "--data-dir",
            "b",
            "--test-size",
            "0.25",
            "--seed",
            "7",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                data_dir,
                test_size,
                seed,
                ..
            } => {
                assert_eq!(data_dir, vec![PathBuf::from("a"), PathBuf::from("b")]);
                assert_eq!(test_size, Some(0.25));
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_label_map_show_parses() {
        let cli = Cli::try_parse_from(["breed-preprocess", "label-map", "show", "--path", "m.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::LabelMap {
                action: LabelMapAction::Show { path: Some(_) }
            }
        ));
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.toml");
        fs::write(
            &path,
            r#"
            seed = 7

            [split]
            test_size = 0.3

            [scan]
            min_dimension = 32
            "#,
        )
        .unwrap();

        let from_file = load_config(Some(path.as_path())).unwrap();
        assert_eq!(from_file.seed, 7);
        assert_eq!(from_file.split.test_size, 0.3);
        assert_eq!(from_file.paths, PipelineConfig::default().paths);

        let config = apply_run_overrides(
            from_file,
            RunOverrides {
                data_dirs: vec![PathBuf::from("other/breeds")],
                seed: Some(99),
                ..RunOverrides::default()
            },
        );

        assert_eq!(config.seed, 99);
        assert_eq!(config.paths.data_dirs, vec![PathBuf::from("other/breeds")]);
        assert_eq!(config.split.test_size, 0.3);
        assert_eq!(config.scan.min_dimension, 32);
        assert!(config.split.stratified);
    }

    #[test]
    fn test_no_flags_keep_config_file_values() {
        let mut file_config = PipelineConfig::default();
        file_config.seed = 5;

        let config = apply_run_overrides(file_config.clone(), RunOverrides::default());
        assert_eq!(config, file_config);
    }
}
