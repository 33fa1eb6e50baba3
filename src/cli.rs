// ============================================================
// CLI — shared training flags
// ============================================================
// Every train binary exposes the same core hyperparameter flags;
// clap's derive macros generate the parsing, help text, and type
// conversion, and `#[command(flatten)]` splices these flags into
// each script's own argument struct.
//
// The struct also derives Serialize so the experiment tracker can
// record the full configuration at run start.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;
use serde::Serialize;

use crate::ml::trainer::TrainerConfig;

/// Hyperparameter flags common to all training scripts.
#[derive(Args, Debug, Clone, Serialize)]
pub struct TrainArgs {
    /// Number of full passes over the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Number of samples processed together in one forward/backward pass
    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    /// Run a validation pass (and checkpoint) every N epochs
    #[arg(long, default_value_t = 1)]
    pub validation_intervals: usize,

    /// Optimizer learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Consecutive non-improving validation checks before training stops
    #[arg(long, default_value_t = 10)]
    pub early_stop_patience: usize,

    /// Record this run with the experiment tracker
    #[arg(long, default_value_t = false)]
    pub tracking: bool,

    /// Data-loading worker threads (defaults to the available cores)
    #[arg(long)]
    pub num_workers: Option<usize>,
}

impl TrainArgs {
    /// Convert the CLI flags into the training-loop configuration.
    /// This is the boundary between argument parsing and the ML
    /// layer — the trainer never sees clap types.
    pub fn trainer_config(&self, project: &str) -> TrainerConfig {
        TrainerConfig {
            project: project.to_string(),
            epochs: self.epochs,
            validation_intervals: self.validation_intervals,
            early_stop_patience: self.early_stop_patience,
            learning_rate: self.learning_rate,
        }
    }

    /// Worker count for the dataloader: the flag if given, otherwise
    /// whatever parallelism the machine reports.
    pub fn workers(&self) -> usize {
        self.num_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Install the fmt subscriber with an env-filter so RUST_LOG works,
/// defaulting this crate to info.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("burn_lab=info".parse().expect("static directive parses")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Probe {
        #[command(flatten)]
        train: TrainArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = Probe::parse_from(["probe"]);
        assert_eq!(cli.train.epochs, 100);
        assert_eq!(cli.train.batch_size, 256);
        assert_eq!(cli.train.validation_intervals, 1);
        assert_eq!(cli.train.early_stop_patience, 10);
        assert!(!cli.train.tracking);
    }

    #[test]
    fn test_flag_override() {
        let cli = Probe::parse_from([
            "probe",
            "--epochs", "5",
            "--batch-size", "32",
            "--learning-rate", "0.01",
            "--tracking",
        ]);
        assert_eq!(cli.train.epochs, 5);
        assert_eq!(cli.train.batch_size, 32);
        assert!((cli.train.learning_rate - 0.01).abs() < f64::EPSILON);
        assert!(cli.train.tracking);
    }

    #[test]
    fn test_workers_fallback_is_positive() {
        let cli = Probe::parse_from(["probe"]);
        assert!(cli.train.workers() >= 1);
    }
}
