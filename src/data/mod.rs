// ============================================================
// Data pipeline
// ============================================================
// Everything between the raw files on disk and the tensor batches
// the training loop consumes:
//
//   raw files (IDX / CIFAR binaries / hour.csv)
//       │
//       ▼
//   dataset adapters   → parse files into (features, label) samples
//       │               and implement Burn's Dataset trait
//       ▼
//   splitter           → shuffle + split into train/validation(/test)
//       │
//       ▼
//   batchers           → stack samples into [N,C,H,W] or [N,T,F]
//       │               tensors via Burn's Batcher trait
//       ▼
//   DataLoader         → batch size, shuffling, and worker threads,
//                        all delegated to Burn's DataLoaderBuilder
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Bike-sharing hourly CSV adapter (one sample per full day)
pub mod bikes;

/// Burn Batcher implementations for image and sequence samples
pub mod batcher;

/// CIFAR-10 binary-batch file adapter
pub mod cifar10;

/// MNIST IDX file adapter
pub mod mnist;

/// Shuffled train/validation(/test) splitting
pub mod splitter;
