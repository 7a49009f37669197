// ============================================================
// Layer 1 — Commands
// ============================================================
// clap derive definitions and the subcommand → use case dispatch.
// Arguments carry the same defaults as the config structs they
// feed, so `pipeline` with no flags reproduces the reference run.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::Path;

use crate::application::clean_use_case::CleanUseCase;
use crate::application::features_use_case::{FeaturesConfig, FeaturesUseCase};
use crate::application::pipeline_use_case::PipelineUseCase;
use crate::application::query_use_case::QueryUseCase;
use crate::application::simulate_use_case::SimulateUseCase;
use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::data::simulator::SimConfig;
use crate::domain::traits::RetentionScorer;

#[derive(Parser)]
#[command(
    name = "retention-predictor",
    version,
    about = "Customer retention prediction: synthetic data, RFM features, \
             a dense network and a query agent"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Simulate(args) => {
                let lake_root = args.lake_root.clone();
                SimulateUseCase::new(&lake_root, args.into()).run()
            }
            Command::Clean(args) => {
                CleanUseCase::new(&args.lake_root).run()?;
                Ok(())
            }
            Command::Features(args) => {
                FeaturesUseCase::new(args.into()).run()?;
                Ok(())
            }
            Command::Train(args) => {
                TrainUseCase::new(args.into()).run()?;
                Ok(())
            }
            Command::Predict(args) => {
                let agent =
                    QueryUseCase::load(&args.serving.lake_root, Path::new(&args.serving.models_dir))?;
                let p = agent.probability(args.customer)?;
                println!("customer {} → repurchase probability {:.4}", args.customer, p);
                Ok(())
            }
            Command::Top(args) => {
                let agent =
                    QueryUseCase::load(&args.serving.lake_root, Path::new(&args.serving.models_dir))?;
                let ranked = agent.top_n(args.n)?;
                println!("rank  customer_id  probability");
                for (rank, (id, p)) in ranked.iter().enumerate() {
                    println!("{:>4}  {:>11}  {:.4}", rank + 1, id, p);
                }
                Ok(())
            }
            Command::Pipeline(args) => {
                args.into_use_case().run()?;
                Ok(())
            }
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate the synthetic raw layer (customers, products, transactions)
    Simulate(SimulateArgs),
    /// Validate and repair the raw layer into the stage layer
    Clean(CleanArgs),
    /// Build RFM features and repurchase labels from the stage layer
    Features(FeaturesArgs),
    /// Train the dense retention network on the processed layer
    Train(TrainArgs),
    /// Repurchase probability for one customer id
    Predict(PredictArgs),
    /// Top-N customers by repurchase probability
    Top(TopArgs),
    /// simulate → clean → features → train in one go
    Pipeline(PipelineArgs),
}

#[derive(Args, Clone)]
struct SimulateArgs {
    #[arg(long, default_value = "data")]
    lake_root: String,
    #[arg(long, default_value_t = 1_000)]
    customers: usize,
    #[arg(long, default_value_t = 200)]
    products: usize,
    #[arg(long, default_value_t = 10_000)]
    transactions: usize,
    /// First possible registration / purchase date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01")]
    start_date: NaiveDate,
    /// Last possible purchase date (YYYY-MM-DD)
    #[arg(long, default_value = "2025-12-31")]
    end_date: NaiveDate,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Fraction of rows the noise pass may corrupt, in [0.0, 0.5]
    #[arg(long, default_value_t = 0.02)]
    noise: f64,
}

impl From<SimulateArgs> for SimConfig {
    fn from(args: SimulateArgs) -> Self {
        Self {
            customers: args.customers,
            products: args.products,
            transactions: args.transactions,
            start_date: args.start_date,
            end_date: args.end_date,
            seed: args.seed,
            noise: args.noise,
        }
    }
}

#[derive(Args)]
struct CleanArgs {
    #[arg(long, default_value = "data")]
    lake_root: String,
}

#[derive(Args, Clone)]
struct FeaturesArgs {
    #[arg(long, default_value = "data")]
    lake_root: String,
    /// Feature cutoff (YYYY-MM-DD); defaults to max(txn date) − horizon
    #[arg(long)]
    as_of: Option<NaiveDate>,
    /// Repurchase horizon in days
    #[arg(long, default_value_t = 30)]
    horizon_days: i64,
}

impl From<FeaturesArgs> for FeaturesConfig {
    fn from(args: FeaturesArgs) -> Self {
        Self {
            lake_root: args.lake_root,
            as_of: args.as_of,
            horizon_days: args.horizon_days,
        }
    }
}

#[derive(Args, Clone)]
struct TrainArgs {
    #[arg(long, default_value = "data")]
    lake_root: String,
    #[arg(long, default_value = "models")]
    models_dir: String,
    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_value = "256,128,64,32")]
    hidden_sizes: Vec<usize>,
    #[arg(long, default_value_t = 0.3)]
    dropout: f64,
    #[arg(long, default_value_t = 100)]
    epochs: usize,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,
    /// Multiplicative per-epoch learning-rate decay
    #[arg(long, default_value_t = 0.97)]
    lr_decay: f64,
    /// L2 penalty via Adam weight decay
    #[arg(long, default_value_t = 1e-4)]
    weight_decay: f32,
    /// Early-stopping patience in epochs
    #[arg(long, default_value_t = 10)]
    patience: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 0.70)]
    train_fraction: f64,
    #[arg(long, default_value_t = 0.15)]
    val_fraction: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(args: TrainArgs) -> Self {
        Self {
            lake_root: args.lake_root,
            models_dir: args.models_dir,
            input_dim: crate::domain::features::FEATURE_DIM,
            hidden_sizes: args.hidden_sizes,
            dropout: args.dropout,
            epochs: args.epochs,
            batch_size: args.batch_size,
            lr: args.lr,
            lr_decay: args.lr_decay,
            weight_decay: args.weight_decay,
            patience: args.patience,
            seed: args.seed,
            train_fraction: args.train_fraction,
            val_fraction: args.val_fraction,
        }
    }
}

#[derive(Args)]
struct ServingArgs {
    #[arg(long, default_value = "data")]
    lake_root: String,
    #[arg(long, default_value = "models")]
    models_dir: String,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    serving: ServingArgs,
    /// Customer id to score
    #[arg(long)]
    customer: u32,
}

#[derive(Args)]
struct TopArgs {
    #[command(flatten)]
    serving: ServingArgs,
    /// How many customers to list
    #[arg(long, default_value_t = 10)]
    n: usize,
}

#[derive(Args)]
struct PipelineArgs {
    #[command(flatten)]
    simulate: SimulateArgs,
    #[command(flatten)]
    features_window: WindowArgs,
    #[command(flatten)]
    train: TrainOnlyArgs,
}

/// The features-stage temporal knobs, without a second --lake-root.
#[derive(Args, Clone)]
struct WindowArgs {
    /// Feature cutoff (YYYY-MM-DD); defaults to max(txn date) − horizon
    #[arg(long)]
    as_of: Option<NaiveDate>,
    /// Repurchase horizon in days
    #[arg(long, default_value_t = 30)]
    horizon_days: i64,
}

/// The train-stage knobs, without a second --lake-root / --seed.
#[derive(Args, Clone)]
struct TrainOnlyArgs {
    #[arg(long, default_value = "models")]
    models_dir: String,
    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_value = "256,128,64,32")]
    hidden_sizes: Vec<usize>,
    #[arg(long, default_value_t = 0.3)]
    dropout: f64,
    #[arg(long, default_value_t = 100)]
    epochs: usize,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,
    /// Multiplicative per-epoch learning-rate decay
    #[arg(long, default_value_t = 0.97)]
    lr_decay: f64,
    /// L2 penalty via Adam weight decay
    #[arg(long, default_value_t = 1e-4)]
    weight_decay: f32,
    /// Early-stopping patience in epochs
    #[arg(long, default_value_t = 10)]
    patience: usize,
    #[arg(long, default_value_t = 0.70)]
    train_fraction: f64,
    #[arg(long, default_value_t = 0.15)]
    val_fraction: f64,
}

impl PipelineArgs {
    fn into_use_case(self) -> PipelineUseCase {
        let lake_root = self.simulate.lake_root.clone();
        let seed = self.simulate.seed;
        PipelineUseCase {
            sim: self.simulate.into(),
            features: FeaturesConfig {
                lake_root: lake_root.clone(),
                as_of: self.features_window.as_of,
                horizon_days: self.features_window.horizon_days,
            },
            train: TrainConfig {
                lake_root,
                models_dir: self.train.models_dir,
                input_dim: crate::domain::features::FEATURE_DIM,
                hidden_sizes: self.train.hidden_sizes,
                dropout: self.train.dropout,
                epochs: self.train.epochs,
                batch_size: self.train.batch_size,
                lr: self.train.lr,
                lr_decay: self.train.lr_decay,
                weight_decay: self.train.weight_decay,
                patience: self.train.patience,
                seed,
                train_fraction: self.train.train_fraction,
                val_fraction: self.train.val_fraction,
            },
        }
    }
}
