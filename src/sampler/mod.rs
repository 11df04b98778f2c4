//! The sampler contract (§4.A): the narrow interface every concrete
//! transition kernel must satisfy for the drivers in [`crate::driver`] and
//! the NRPT engine in [`crate::tempering`] to run it.
//!
//! A small trait with associated types tying together the family of objects
//! (model, state, sample, buffer, chain) that cooperate during a run.

use rand::SeedableRng;

/// Concrete RNG used throughout the crate. Seedable from a 64-bit integer
/// and cheaply `Clone`-able (deep-copyable), matching §6's RNG interface.
pub type Rng = rand::rngs::SmallRng;

pub fn seeded_rng(seed: u64) -> Rng {
    Rng::seed_from_u64(seed)
}

/// Opaque sampler state. The only observable the driver and the swap engine
/// require is the current log-density at the replica's point.
pub trait SamplerState: Clone {
    fn log_density(&self) -> crate::LogDensity;
}

/// Wall-clock bookkeeping threaded through to `bundle`.
#[derive(Debug, Clone, Copy)]
pub struct ChainStats {
    pub start: std::time::Instant,
    pub stop: std::time::Instant,
    pub iterations: usize,
}

impl ChainStats {
    pub fn duration(&self) -> std::time::Duration {
        self.stop.duration_since(self.start)
    }
}

/// Every concrete sampler implements these five operations (§4.A).
///
/// Buffers are append-only with respect to `index`; passing indices out of
/// order is a programmer error, not a recoverable one, so implementations
/// are free to assert rather than return a `Result`.
pub trait Sampler {
    type Model;
    type State: SamplerState;
    type Sample;
    type Buffer;
    type Chain;

    fn initial_step(&mut self, rng: &mut Rng, model: &Self::Model) -> (Self::Sample, Self::State);

    fn next_step(
        &mut self,
        rng: &mut Rng,
        model: &Self::Model,
        state: &Self::State,
    ) -> (Self::Sample, Self::State);

    fn new_buffer(&self, sample: &Self::Sample, model: &Self::Model, n_hint: usize)
    -> Self::Buffer;

    fn save(
        &self,
        buffer: Self::Buffer,
        sample: Self::Sample,
        index: usize,
        model: &Self::Model,
        n_hint: usize,
    ) -> Self::Buffer;

    /// May post-process (thinning metadata, warm-up flagging) but must not
    /// re-execute the chain.
    fn bundle(
        &self,
        buffer: Self::Buffer,
        model: &Self::Model,
        final_state: Self::State,
        stats: ChainStats,
    ) -> Self::Chain;

    /// Re-anchor this sampler (and the given state) at a new β. Mutates the
    /// sampler's own β field and returns a state recomputed at the new β for
    /// the current point, so future `next_step` calls see the update. Never
    /// shares β storage across replicas: each call operates on one owned
    /// sampler/state pair.
    fn set_beta(&mut self, model: &Self::Model, state: &Self::State, beta: f64) -> Self::State;
}
