// ============================================================
// burn-lab — deep-learning teaching scripts on Burn
// ============================================================
// A small collection of end-to-end training/evaluation programs:
//
//   mnist_train / mnist_test     — fully-connected digit classifier
//   cifar10_train / cifar10_test — CNN with augmentation + batch norm
//   bikes_train                  — recurrent hourly-demand regressor
//
// Everything hard (batching, shuffling, parallel loading, autodiff,
// optimizer steps, record serialisation) is a thin call into Burn's
// own machinery. This crate contributes the dataset file adapters,
// the per-batch transform pipeline, and the train/validate loop with
// early stopping and latest/best checkpointing that every script
// shares.
//
// Reference: Burn Book §4 (Datasets and Dataloaders), §5 (Training)

/// Shared command-line arguments and logging setup
pub mod cli;

/// Dataset adapters, batchers, and the train/validation splitter
pub mod data;

/// Checkpoint store, experiment tracker, and metrics CSV logger
pub mod infra;

/// Model architectures, the training loop, and the testers
pub mod ml;

/// Per-batch tensor transform pipeline (normalize, augment, flatten)
pub mod transform;
