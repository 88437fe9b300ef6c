//! Command-line interface: train, predict and serve

use crate::config::PipelineConfig;
use crate::inference::{PredictPipeline, RequestRecord};
use crate::logging::PipelineLogger;
use crate::pipeline::{TrainingPipeline, TrainingSummary};
use crate::schema;
use crate::server::{self, AppState};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scorecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, select and serve student math score regressors")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Artifact directory (overrides the configuration)
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Log directory (overrides the configuration)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest the dataset, fit the transformer and select the best model
    Train {
        /// Raw dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Minimum held-out R² for the best model
        #[arg(long)]
        threshold: Option<f64>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Predict the math score of one student
    Predict {
        #[arg(long)]
        gender: String,

        #[arg(long, alias = "ethnicity")]
        race_ethnicity: String,

        #[arg(long)]
        parental_level_of_education: String,

        #[arg(long)]
        lunch: String,

        #[arg(long)]
        test_preparation_course: String,

        #[arg(long)]
        reading_score: String,

        #[arg(long)]
        writing_score: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Serve predictions over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Configuration from file or defaults, then environment, then command-line overrides
pub fn load_config(common: &CommonArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides();

    if let Some(root) = &common.artifacts {
        config = config.with_artifact_root(root);
    }
    if let Some(dir) = &common.log_dir {
        config = config.with_log_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

fn init_logger(config: &PipelineConfig) -> anyhow::Result<PipelineLogger> {
    PipelineLogger::init(&config.logging).context("initialize logging")
}

pub fn cmd_train(data: Option<&Path>, threshold: Option<f64>, common: &CommonArgs) -> anyhow::Result<()> {
    let mut config = load_config(common)?;
    if let Some(path) = data {
        config = config.with_source(path);
    }
    if let Some(threshold) = threshold {
        config.training = config.training.with_acceptance_threshold(threshold);
    }
    let logger = init_logger(&config)?;

    section("Train");
    kv("Dataset", &config.ingestion.source_path.display().to_string());
    kv("Artifacts", &config.artifacts.root.display().to_string());
    if let Some(log_file) = logger.log_file() {
        kv("Log", &log_file.display().to_string());
    }
    println!();

    let summary = TrainingPipeline::new(config, logger).run()?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &TrainingSummary) {
    step_ok(&format!(
        "Ingested {} train / {} test rows",
        summary.ingestion.train_rows, summary.ingestion.test_rows
    ));
    step_ok(&format!("Saved transformer to {}", summary.transformer_path.display()));

    section("Candidates");
    println!(
        "  {:<24} {:>8} {:>9} {:>8}",
        muted("Model"),
        muted("CV R²"),
        muted("Train R²"),
        muted("Test R²")
    );
    for entry in &summary.report.entries {
        let line = format!(
            "{:<24} {:>8.4} {:>9.4} {:>8.4}",
            entry.name, entry.cv_score, entry.train_r2, entry.test_r2
        );
        if entry.name == summary.best_model {
            println!("  {}", accent(&line).bold());
        } else {
            println!("  {}", line);
        }
    }

    section("Best model");
    kv("Model", &summary.best_model);
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", summary.best_score).white().bold());
    kv("Saved to", &summary.model_path.display().to_string());
    kv("Time", &format!("{:.2}s", summary.elapsed_secs));
    println!();
}

pub fn cmd_predict(fields: HashMap<String, String>, common: &CommonArgs) -> anyhow::Result<()> {
    let config = load_config(common)?;
    let logger = init_logger(&config)?;

    let record = RequestRecord::from_fields(&fields)?;
    let pipeline = PredictPipeline::new(config.artifacts.clone(), logger);
    let predictions = pipeline.predict(std::slice::from_ref(record.features()))?;
    let prediction = predictions
        .first()
        .copied()
        .context("model returned no prediction")?;

    section("Predict");
    println!("  {:<16} {}", muted("math_score"), format!("{:.2}", prediction).white().bold());
    println!();
    Ok(())
}

pub async fn cmd_serve(host: Option<String>, port: Option<u16>, common: &CommonArgs) -> anyhow::Result<()> {
    let mut config = load_config(common)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let logger = init_logger(&config)?;

    section("Serve");
    kv("Address", &format!("http://{}:{}", config.server.host, config.server.port));
    kv("Artifacts", &config.artifacts.root.display().to_string());
    println!();

    let state = AppState::new(config.artifacts.clone(), logger);
    server::run_server(&config.server, state).await
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train { data, threshold, common } => cmd_train(data.as_deref(), threshold, &common),
        Commands::Predict {
            gender,
            race_ethnicity,
            parental_level_of_education,
            lunch,
            test_preparation_course,
            reading_score,
            writing_score,
            common,
        } => {
            let fields = [
                (schema::GENDER, gender),
                (schema::RACE_ETHNICITY, race_ethnicity),
                (schema::PARENTAL_EDUCATION, parental_level_of_education),
                (schema::LUNCH, lunch),
                (schema::TEST_PREPARATION, test_preparation_course),
                (schema::READING_SCORE, reading_score),
                (schema::WRITING_SCORE, writing_score),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
            cmd_predict(fields, &common)
        }
        Commands::Serve { host, port, common } => cmd_serve(host, port, &common).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_predict_with_alias() {
        let cli = Cli::try_parse_from([
            "scorecast",
            "predict",
            "--gender",
            "female",
            "--ethnicity",
            "group B",
            "--parental-level-of-education",
            "bachelor's degree",
            "--lunch",
            "standard",
            "--test-preparation-course",
            "none",
            "--reading-score",
            "72",
            "--writing-score",
            "74",
            "--artifacts",
            "/tmp/run",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { race_ethnicity, common, .. } => {
                assert_eq!(race_ethnicity, "group B");
                assert_eq!(common.artifacts, Some(PathBuf::from("/tmp/run")));
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let common = CommonArgs {
            config: None,
            artifacts: Some(PathBuf::from("/tmp/run")),
            log_dir: Some(PathBuf::from("/tmp/logs")),
        };
        let config = load_config(&common).unwrap();
        assert_eq!(config.artifacts.root, PathBuf::from("/tmp/run"));
        assert_eq!(config.logging.log_dir, PathBuf::from("/tmp/logs"));
    }
}
