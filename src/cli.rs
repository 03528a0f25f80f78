use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use diabetes_risk::config::{
    CONFIG_FILE_PATH, ConfigurationManager, PARAMS_FILE_PATH, SCHEMA_FILE_PATH,
};
use diabetes_risk::logging::DEFAULT_LOG_DIR;
use diabetes_risk::pipeline::{EncodingPolicy, runner};
use diabetes_risk::prediction::{PatientRecord, PredictionPipeline};
use diabetes_risk::web::{self, AppState, DEFAULT_ADDR};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "diabetes-risk",
    version,
    about = "Train, evaluate and serve a diabetes risk model"
)]
pub struct Cli {
    /// Stage paths and tracking settings
    #[arg(long, global = true, default_value = CONFIG_FILE_PATH)]
    pub config: PathBuf,

    /// Model hyperparameters
    #[arg(long, global = true, default_value = PARAMS_FILE_PATH)]
    pub params: PathBuf,

    /// Declared columns and target
    #[arg(long, global = true, default_value = SCHEMA_FILE_PATH)]
    pub schema: PathBuf,

    /// Directory for rolling log files
    #[arg(long, global = true, env = "DIABETES_RISK_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download or copy the raw dataset
    Ingest,
    /// Check the dataset against the schema and write the status file
    Validate,
    /// Encode and split the dataset into train.csv / test.csv
    Transform {
        /// Categorical encoding: `semantic` or `one-hot`. Defaults to config.yaml.
        #[arg(long)]
        encoding: Option<EncodingPolicy>,
    },
    /// Fit the model on train.csv
    Train,
    /// Score the model on test.csv and log the run
    Evaluate,
    /// Run every stage in order
    Run,
    /// Predict one patient from eight encoded values
    Predict {
        /// 0 = male, 1 = female
        gender: i64,
        age: f64,
        hypertension: f64,
        heart_disease: f64,
        /// 0 = never, 1 = any other history
        smoking_history: i64,
        bmi: f64,
        hba1c_level: f64,
        blood_glucose_level: f64,

        /// Model file. Defaults to the trainer's output.
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Serve the prediction form
    Serve {
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: SocketAddr,

        /// Model file. Defaults to the trainer's output.
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

pub fn run_command(cli: Cli) -> Result<()> {
    let manager = ConfigurationManager::load(&cli.config, &cli.params, &cli.schema)
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Ingest => {
            let outcome = runner::run_ingestion(&manager)?;
            println!("Ingestion: {outcome:?}");
        }
        Commands::Validate => {
            let status = runner::run_validation(&manager)?;
            println!("{}", status.status_line());
        }
        Commands::Transform { encoding } => {
            let report = runner::run_transformation(&manager, None, encoding)?;
            println!("{}", report.summary());
        }
        Commands::Train => {
            let report = runner::run_training(&manager)?;
            println!(
                "Trained {} (train R² {:.4}), saved to {}",
                report.model_kind.as_str(),
                report.r2_score,
                report.model_path.display()
            );
        }
        Commands::Evaluate => {
            let mut tracker = runner::configured_tracker(&manager)?;
            let report = runner::run_evaluation(&manager, tracker.as_mut())?;
            println!(
                "RMSE {:.4}, MAE {:.4}, R² {:.4} (run {})",
                report.metrics.rmse, report.metrics.mae, report.metrics.r2, report.run_id
            );
        }
        Commands::Run => {
            let report = runner::run_all(&manager)?;
            println!("{}", report.summary());
        }
        Commands::Predict {
            gender,
            age,
            hypertension,
            heart_disease,
            smoking_history,
            bmi,
            hba1c_level,
            blood_glucose_level,
            model,
        } => {
            let model_path = model.unwrap_or_else(|| manager.model_trainer_config().model_path());
            let pipeline = PredictionPipeline::from_path(&model_path)?;
            let record = PatientRecord {
                gender,
                age,
                hypertension,
                heart_disease,
                smoking_history,
                bmi,
                hba1c_level,
                blood_glucose_level,
            };
            println!("{:.4}", pipeline.predict(&record)?);
        }
        Commands::Serve { addr, model } => {
            let model_path = model.unwrap_or_else(|| manager.model_trainer_config().model_path());
            let state = AppState::new(PredictionPipeline::from_path(&model_path)?);
            tokio::runtime::Runtime::new()?.block_on(web::serve(addr, state))?;
        }
    }

    Ok(())
}
