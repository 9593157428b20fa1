use burn::prelude::*;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 42;

/// Execution context shared by the model builder and the training
/// driver: the device parameters live on and the seed that drives
/// initialisation, dropout masks and per-epoch shuffling.
///
/// Constructed once by the caller and passed by reference. Note that
/// `B::seed` reseeds the backend's process-wide RNG: two sessions on
/// the same backend share one generator, so runs are only reproducible
/// when sessions are not interleaved across threads.
#[derive(Debug, Clone)]
pub struct Session<B: Backend> {
    device: B::Device,
    seed: u64,
}

impl<B: Backend> Session<B> {
    /// Create a session and reseed the backend's global RNG.
    pub fn new(device: B::Device, seed: u64) -> Self {
        B::seed(&device, seed);
        tracing::debug!("Session on {:?} seeded with {}", device, seed);
        Self { device, seed }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl<B: Backend> Default for Session<B> {
    fn default() -> Self {
        Self::new(B::Device::default(), DEFAULT_SEED)
    }
}
