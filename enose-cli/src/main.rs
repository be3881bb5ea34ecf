//! E-Nose - offline odor classification
//! Command-line interface for checking artifacts and classifying readings

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::*;
use enose_core::{demo, ArtifactStore, Capability, EnsembleConfig, PredictionOrchestrator, SensorReading};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "enose")]
#[command(author = "E-Nose Contributors")]
#[command(version)]
#[command(about = "E-Nose - stacked-ensemble odor classification", long_about = None)]
struct Cli {
    /// Ensemble configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = "artifacts/enose.toml",
        env = "ENOSE_CONFIG"
    )]
    config: PathBuf,

    /// Log loading progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one sensor reading
    Predict {
        /// Raw channel values in configured order (space or comma separated)
        #[arg(
            value_name = "VALUES",
            required = true,
            num_args = 1..,
            value_delimiter = ',',
            allow_negative_numbers = true
        )]
        values: Vec<f64>,

        /// Print the response body as JSON
        #[arg(long)]
        json: bool,
    },

    /// List loaded models under their public aliases
    Models,

    /// Show the configured channel layout
    Sensors,

    /// Load every artifact and report consistency problems
    Check,

    /// Write the reference artifact set and an enose.toml into a directory
    Init {
        /// Target directory
        #[arg(value_name = "DIR", default_value = "artifacts")]
        dir: PathBuf,

        /// Overwrite an existing enose.toml
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match &cli.command {
        Commands::Predict { values, json } => predict_command(&cli.config, values, *json),
        Commands::Models => models_command(&cli.config),
        Commands::Sensors => sensors_command(&cli.config),
        Commands::Check => check_command(&cli.config),
        Commands::Init { dir, force } => init_command(dir, *force),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "enose_core=debug" } else { "enose_core=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load(config: &Path) -> anyhow::Result<PredictionOrchestrator> {
    let config = EnsembleConfig::from_file(config)
        .with_context(|| format!("loading {}", config.display()))?;
    Ok(ArtifactStore::new(config).load()?)
}

// ============================================================================
// Inference
// ============================================================================

fn predict_command(config: &Path, values: &[f64], json: bool) -> anyhow::Result<()> {
    let pipeline = load(config)?;
    let result = pipeline.run(&SensorReading::new(values.to_vec()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", "Input:".bold());
    for (name, value) in pipeline.masked_channels().iter().zip(result.input_data()) {
        println!("  {:<10} {}", name.cyan(), value);
    }
    println!();

    println!("{}", "Base models:".bold());
    for p in result.base() {
        println!(
            "  {:<10} {:<24} {}",
            p.model.cyan(),
            p.class_label,
            format_probability(p.probability)
        );
    }
    println!();

    if let Some(meta) = result.meta() {
        println!(
            "{} {} {}",
            "Prediction:".green().bold(),
            meta.class_label.bold(),
            format_probability(meta.probability)
        );
    }

    Ok(())
}

fn format_probability(probability: Option<f64>) -> String {
    match probability {
        Some(p) => format!("{:.4}", p),
        None => "-".dimmed().to_string(),
    }
}

// ============================================================================
// Introspection
// ============================================================================

fn models_command(config: &Path) -> anyhow::Result<()> {
    let pipeline = load(config)?;

    println!("{}", "Models:".bold());
    for m in pipeline.models() {
        let capability = match m.capability {
            Capability::Probabilistic => m.capability.name().green(),
            Capability::Scoring => m.capability.name().yellow(),
        };
        println!(
            "  {:<10} {:<5} {:<14} {} classes",
            m.name.cyan(),
            m.role,
            capability,
            m.classes
        );
    }
    println!();

    println!("{}", "Labels:".bold());
    for (i, label) in pipeline.codec().labels().iter().enumerate() {
        println!("  {:>2}  {}", i, label);
    }

    Ok(())
}

fn sensors_command(config: &Path) -> anyhow::Result<()> {
    let config = EnsembleConfig::from_file(config)
        .with_context(|| format!("loading {}", config.display()))?;
    let masker = config.masker()?;

    println!("{}", "Channels (input order):".bold());
    for (i, channel) in config.channels.iter().enumerate() {
        println!(
            "  {:>2}  {:<10} {:<7} {}",
            i,
            masker.mask_channel(channel).cyan(),
            channel.name(),
            channel.description().dimmed()
        );
    }

    Ok(())
}

fn check_command(config: &Path) -> anyhow::Result<()> {
    println!("{} {}", "Checking".green().bold(), config.display().to_string().cyan());

    let pipeline = load(config)?;

    println!("{} {} channels", "        ok".green().bold(), pipeline.n_features());
    println!(
        "{} {} base models, meta width {}",
        "        ok".green().bold(),
        pipeline.pool().len(),
        pipeline.pool().layout().total_width()
    );
    println!("{} {} labels", "        ok".green().bold(), pipeline.codec().len());

    let uncovered = pipeline.uncovered_classes();
    if !uncovered.is_empty() {
        println!(
            "{} classes {:?} have no label; predicting them will fail",
            "   warning".yellow().bold(),
            uncovered
        );
    }

    println!();
    println!("{}", "Artifacts are consistent.".bold());
    Ok(())
}

// ============================================================================
// Scaffolding
// ============================================================================

fn init_command(dir: &Path, force: bool) -> anyhow::Result<()> {
    let manifest = dir.join("enose.toml");
    if manifest.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", manifest.display());
    }

    println!(
        "{} reference artifacts in '{}'",
        "Writing".green().bold(),
        dir.display().to_string().cyan()
    );

    let config = demo::write(dir)?;

    let mut files = vec![config.scaler.clone(), config.labels.clone()];
    files.extend(config.base_models.iter().map(|e| e.artifact.clone()));
    files.push(config.meta.clone());
    files.push("enose.toml".to_string());
    for file in &files {
        println!("{} {}", "   Created".green().bold(), file.cyan());
    }

    println!();
    println!("{}", "To classify a reading, run:".bold());
    println!("  enose --config {} predict {}", manifest.display(), join_values(&demo::PROTOTYPES[3]));

    Ok(())
}

fn join_values(values: &[f64]) -> String {
    values.iter().map(f64::to_string).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_accepts_commas_and_negatives() {
        let cli = Cli::try_parse_from(["enose", "predict", "1,2.5", "-3", "4"]).unwrap();
        match cli.command {
            Commands::Predict { values, json } => {
                assert_eq!(values, vec![1.0, 2.5, -3.0, 4.0]);
                assert!(!json);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_predict_requires_values() {
        assert!(Cli::try_parse_from(["enose", "predict"]).is_err());
        assert!(Cli::try_parse_from(["enose", "predict", "abc"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["enose", "models", "--config", "x/enose.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("x/enose.toml"));
    }

    #[test]
    fn test_init_then_predict_and_check() {
        let dir = tempfile::tempdir().unwrap();
        init_command(dir.path(), false).unwrap();

        let manifest = dir.path().join("enose.toml");
        check_command(&manifest).unwrap();
        predict_command(&manifest, &demo::PROTOTYPES[0], false).unwrap();
        predict_command(&manifest, &demo::PROTOTYPES[0], true).unwrap();

        let err = predict_command(&manifest, &demo::PROTOTYPES[0][..7], false).unwrap_err();
        assert!(format!("{:#}", err).contains("expected 8"));
    }

    #[test]
    fn test_init_refuses_existing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        init_command(dir.path(), false).unwrap();

        let err = init_command(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        init_command(dir.path(), true).unwrap();
    }

    #[test]
    fn test_join_values() {
        assert_eq!(join_values(&[815.0, 36.5]), "815 36.5");
    }
}
