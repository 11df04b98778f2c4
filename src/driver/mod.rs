//! Driving a single sampler for a fixed count (§4.B, the Sequential
//! Driver) or until a convergence predicate fires (§4.C, the Convergence
//! Driver).
//!
//! The execution order follows §4.B exactly: `initial_step` produces
//! iteration 1, `discard_initial` further `next_step` calls are taken
//! (none of them saved), the state that remains is retained as sample 1,
//! and thereafter every `thinning`-th `next_step` result is saved. This
//! keeps `Ntotal = thinning*(N-1) + discard_initial + 1` an invariant in
//! every branch, including `discard_initial == 0` and `N == 1`.

use crate::McmcError;
use crate::error::Result;
use crate::sampler::{ChainStats, Rng, Sampler};

/// Callback invoked once per *retained* sample, i.e. after thinning and
/// warm-up have been applied. A returned error is fatal: tempering and
/// sequential semantics both forbid silently skipping a replica.
pub type Callback<'a, S> = dyn FnMut(
        &Rng,
        &<S as Sampler>::Model,
        &S,
        &<S as Sampler>::Sample,
        &<S as Sampler>::State,
        usize,
    ) -> anyhow::Result<()>
    + 'a;

/// Options recognised by both drivers (§6).
pub struct DriverOptions<'a, S: Sampler> {
    pub discard_initial: usize,
    pub thinning: usize,
    pub callback: Option<Box<Callback<'a, S>>>,
    pub progress: bool,
    pub progressname: String,
}

impl<'a, S: Sampler> Default for DriverOptions<'a, S> {
    fn default() -> Self {
        Self {
            discard_initial: 0,
            thinning: 1,
            callback: None,
            progress: crate::progress::progress_enabled(),
            progressname: "chain".to_string(),
        }
    }
}

impl<'a, S: Sampler> DriverOptions<'a, S> {
    fn validate(&self, n: usize) -> Result<()> {
        if n < 1 {
            return Err(McmcError::invalid("N must be >= 1"));
        }
        if self.thinning < 1 {
            return Err(McmcError::invalid("thinning must be >= 1"));
        }
        Ok(())
    }
}

/// Run `sampler` for exactly `n` retained samples (§4.B).
pub fn run<S: Sampler>(
    rng: &mut Rng,
    model: &S::Model,
    sampler: &mut S,
    n: usize,
    mut options: DriverOptions<S>,
) -> Result<S::Chain> {
    options.validate(n)?;
    let ntotal = options.thinning * n.saturating_sub(1) + options.discard_initial + 1;
    log::debug!(
        "sequential driver '{}' starting: n={n} discard_initial={} thinning={} ntotal={ntotal}",
        options.progressname,
        options.discard_initial,
        options.thinning,
    );
    let start = std::time::Instant::now();
    let bar = options
        .progress
        .then(|| crate::progress::progress_bar(ntotal as u64, &options.progressname))
        .flatten();

    let (mut sample, mut state) = sampler.initial_step(rng, model);
    if let Some(bar) = &bar {
        bar.inc(1);
    }
    for _ in 0..options.discard_initial {
        (sample, state) = sampler.next_step(rng, model, &state);
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(cb) = options.callback.as_mut() {
        cb(rng, model, sampler, &sample, &state, 1)
            .map_err(McmcError::SamplerFailure)?;
    }
    let mut buffer = sampler.new_buffer(&sample, model, n);
    buffer = sampler.save(buffer, sample, 1, model, n);

    for i in 2..=n {
        for _ in 0..options.thinning - 1 {
            (sample, state) = sampler.next_step(rng, model, &state);
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }
        (sample, state) = sampler.next_step(rng, model, &state);
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        if let Some(cb) = options.callback.as_mut() {
            cb(rng, model, sampler, &sample, &state, i)
                .map_err(McmcError::SamplerFailure)?;
        }
        buffer = sampler.save(buffer, sample, i, model, n);
    }

    if let Some(bar) = &bar {
        bar.finish();
    }
    let stats = ChainStats {
        start,
        stop: std::time::Instant::now(),
        iterations: ntotal,
    };
    log::debug!(
        "sequential driver '{}' finished in {:?}",
        options.progressname,
        stats.duration()
    );
    Ok(sampler.bundle(buffer, model, state, stats))
}

/// Run `sampler` until `isdone` reports completion (§4.C). Discard and
/// thinning behave exactly as in [`run`]; the total iteration count is not
/// known up front so progress is reported against an indeterminate bar.
pub fn run_until<S, F>(
    rng: &mut Rng,
    model: &S::Model,
    sampler: &mut S,
    mut isdone: F,
    mut options: DriverOptions<S>,
) -> Result<S::Chain>
where
    S: Sampler,
    F: FnMut(&Rng, &S::Model, &S, &S::Buffer, &S::State, usize) -> bool,
{
    if options.thinning < 1 {
        return Err(McmcError::invalid("thinning must be >= 1"));
    }
    log::debug!(
        "convergence driver '{}' starting: discard_initial={} thinning={}",
        options.progressname,
        options.discard_initial,
        options.thinning,
    );
    let start = std::time::Instant::now();
    let bar = options
        .progress
        .then(|| crate::progress::progress_bar(u64::MAX, &options.progressname))
        .flatten();

    let (mut sample, mut state) = sampler.initial_step(rng, model);
    for _ in 0..options.discard_initial {
        (sample, state) = sampler.next_step(rng, model, &state);
    }

    if let Some(cb) = options.callback.as_mut() {
        cb(rng, model, sampler, &sample, &state, 1)
            .map_err(McmcError::SamplerFailure)?;
    }
    let mut buffer = sampler.new_buffer(&sample, model, 0);
    buffer = sampler.save(buffer, sample, 1, model, 0);

    let mut i = 1usize;
    while !isdone(rng, model, sampler, &buffer, &state, i) {
        for _ in 0..options.thinning - 1 {
            (sample, state) = sampler.next_step(rng, model, &state);
        }
        (sample, state) = sampler.next_step(rng, model, &state);
        i += 1;
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        if let Some(cb) = options.callback.as_mut() {
            cb(rng, model, sampler, &sample, &state, i)
                .map_err(McmcError::SamplerFailure)?;
        }
        buffer = sampler.save(buffer, sample, i, model, 0);
    }

    if let Some(bar) = &bar {
        bar.finish();
    }
    let stats = ChainStats {
        start,
        stop: std::time::Instant::now(),
        iterations: i,
    };
    Ok(sampler.bundle(buffer, model, state, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{GaussianModel, RandomWalkMetropolis};
    use crate::sampler::seeded_rng;

    #[test]
    fn run_returns_exactly_n_samples() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(7);
        let chain = run(&mut rng, &model, &mut sampler, 25, DriverOptions::default()).unwrap();
        assert_eq!(chain.samples.len(), 25);
    }

    #[test]
    fn discard_initial_and_thinning_are_honored() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(11);
        let options = DriverOptions {
            discard_initial: 10,
            thinning: 3,
            ..DriverOptions::default()
        };
        let chain = run(&mut rng, &model, &mut sampler, 5, options).unwrap();
        assert_eq!(chain.samples.len(), 5);
        assert_eq!(chain.stats.iterations, 3 * (5 - 1) + 10 + 1);
    }

    #[test]
    fn n_equal_one_calls_no_next_step_beyond_warmup() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(3);
        let chain = run(&mut rng, &model, &mut sampler, 1, DriverOptions::default()).unwrap();
        assert_eq!(chain.samples.len(), 1);
        assert_eq!(chain.stats.iterations, 1);
    }

    #[test]
    fn invalid_n_is_rejected_before_any_sampler_call() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(1);
        let err = run(&mut rng, &model, &mut sampler, 0, DriverOptions::default()).unwrap_err();
        assert!(matches!(err, McmcError::InvalidArgument { .. }));
    }

    #[test]
    fn convergence_driver_stops_at_predicate() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(42);
        let chain = run_until(
            &mut rng,
            &model,
            &mut sampler,
            |_, _, _, _, _, i| i >= 50,
            DriverOptions::default(),
        )
        .unwrap();
        assert_eq!(chain.samples.len(), 50);
    }
}
