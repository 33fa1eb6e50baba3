// ============================================================
// ML layer (Burn)
// ============================================================
// All Burn-module code lives here:
//
//   model.rs   — the three reference architectures and their
//                TrainStep/ValidStep wiring
//   trainer.rs — the shared train/validate loop with early stopping
//                and latest/best checkpointing
//   tester.rs  — held-out evaluation and single-sample inference
//
// Training runs on the autodiff WGPU backend; validation and
// testing run on the inner backend (no gradient tape). Device
// placement is decided once per run, at startup.

/// Reference model architectures
pub mod model;

/// Held-out evaluation and single-sample inference
pub mod tester;

/// The shared training loop
pub mod trainer;

/// Backend used for training (gradients enabled)
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend used for validation, testing, and inference
pub type InferBackend = burn::backend::Wgpu;

/// Pick the compute device for this run. WGPU resolves to the best
/// available accelerator and falls back to the CPU adapter, so the
/// choice is static for the whole process.
pub fn default_device() -> burn::backend::wgpu::WgpuDevice {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Training on device {:?}", device);
    println!("Training on device {device:?}.");
    device
}
