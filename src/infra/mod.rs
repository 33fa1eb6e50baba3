// ============================================================
// Infrastructure
// ============================================================
// Cross-cutting persistence concerns shared by every script:
//
//   checkpoint.rs — latest/best model snapshots per project,
//                   serialised with Burn's CompactRecorder plus a
//                   JSON sidecar recording epoch and validation loss
//
//   tracker.rs    — experiment tracking: hyperparameters at run
//                   start, scalar metrics per step, one JSON file
//                   per run (or nothing at all when disabled)
//
//   metrics.rs    — per-project CSV log of epoch-level losses for
//                   plotting learning curves
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Latest/best checkpoint persistence
pub mod checkpoint;

/// Epoch metrics CSV logger
pub mod metrics;

/// Experiment run tracker
pub mod tracker;
