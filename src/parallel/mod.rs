//! Parallel drivers over independent chains (§4.D). Three substrates share
//! one contract: draw `nchains` seeds once from the parent rng, run the
//! Sequential Driver once per seed, and collect results into a chain per
//! index. Substrates differ only in how work is distributed across
//! threads; results must not depend on which substrate ran them.

use rand::RngCore;

use crate::McmcError;
use crate::driver::{self, DriverOptions};
use crate::error::Result;
use crate::sampler::{Rng, Sampler, seeded_rng};

/// Options shared by all three substrates. Per-chain callbacks are not
/// supported here: a callback closure would need to be `Send + Sync` across
/// worker threads, which the Sequential Driver's callback type does not
/// require of itself.
#[derive(Debug, Clone, Copy)]
pub struct ParallelOptions {
    pub discard_initial: usize,
    pub thinning: usize,
    pub progress: bool,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            discard_initial: 0,
            thinning: 1,
            progress: crate::progress::progress_enabled(),
        }
    }
}

/// Draw `nchains` seeds from the parent rng, once, before any dispatch.
/// Given the same parent seed, this is identical regardless of which
/// substrate ultimately consumes the result.
pub fn draw_seeds(rng: &mut Rng, nchains: usize) -> Vec<u64> {
    (0..nchains).map(|_| rng.next_u64()).collect()
}

fn driver_options_for<'a, S: Sampler>(options: &ParallelOptions, index: usize) -> DriverOptions<'a, S> {
    DriverOptions {
        discard_initial: options.discard_initial,
        thinning: options.thinning,
        callback: None,
        progress: false,
        progressname: format!("chain-{index}"),
    }
}

/// Collect per-index `(index, Result<Chain>)` messages off a channel into a
/// dense result vector, draining to completion even after the first error
/// so that every already-dispatched worker settles before this returns.
fn collect<C>(
    rx: crossbeam_channel::Receiver<(usize, Result<C>)>,
    nchains: usize,
    bar: Option<indicatif::ProgressBar>,
) -> Result<Vec<C>> {
    let mut results: Vec<Option<C>> = (0..nchains).map(|_| None).collect();
    let mut first_error = None;
    let mut received = 0;
    while received < nchains {
        let Ok((i, result)) = rx.recv() else { break };
        received += 1;
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        match result {
            Ok(chain) => results[i] = Some(chain),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(bar) = &bar {
        bar.finish();
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    if received < nchains {
        return Err(McmcError::worker(format!(
            "worker channel closed early: received {received} of {nchains} results, likely a worker panic"
        )));
    }
    Ok(results
        .into_iter()
        .map(|c| c.expect("every dispatched index reports exactly once"))
        .collect())
}

fn partition(nchains: usize, workers: usize) -> Vec<Vec<usize>> {
    let chunk_size = nchains.div_ceil(workers.max(1));
    (0..nchains)
        .collect::<Vec<_>>()
        .chunks(chunk_size.max(1))
        .map(|c| c.to_vec())
        .collect()
}

/// Bounded pool of workers = min(nchains, hardware-threads); each worker
/// owns a deep-copied rng/sampler and writes into a disjoint slice of
/// chain indices assigned up front.
pub fn run_threaded<S, F>(
    rng: &mut Rng,
    model: &S::Model,
    make_sampler: F,
    nchains: usize,
    n: usize,
    options: ParallelOptions,
) -> Result<Vec<S::Chain>>
where
    S: Sampler + Send,
    S::Model: Sync,
    S::Chain: Send,
    F: Fn() -> S + Sync,
{
    if nchains == 0 {
        return Err(McmcError::invalid("nchains must be >= 1"));
    }
    let seeds = draw_seeds(rng, nchains);
    let hardware = num_cpus::get();
    let workers = nchains.min(hardware).max(1);
    if workers == 1 {
        log::warn!("threaded parallel driver running with a single worker");
    }
    if nchains > hardware {
        log::warn!("nchains ({nchains}) exceeds hardware-thread count ({hardware})");
    }
    log::debug!("threaded parallel driver: {nchains} chains across {workers} workers");

    let bar = options
        .progress
        .then(|| crate::progress::progress_bar(nchains as u64, "parallel-threaded"))
        .flatten();
    let (tx, rx) = crossbeam_channel::unbounded();

    std::thread::scope(|scope| {
        for chunk in partition(nchains, workers) {
            let tx = tx.clone();
            let seeds = &seeds;
            let make_sampler = &make_sampler;
            let model = &model;
            let options = &options;
            scope.spawn(move || {
                for &i in &chunk {
                    let mut chain_rng = seeded_rng(seeds[i]);
                    let mut sampler = make_sampler();
                    let result = driver::run(&mut chain_rng, model, &mut sampler, n, driver_options_for(options, i));
                    let _ = tx.send((i, result));
                }
            });
        }
        drop(tx);
        collect(rx, nchains, bar)
    })
}

/// Worker processes modeled as a pool of long-lived threads pulling jobs
/// off a shared `crossbeam-channel` job queue, an in-process stand-in for
/// an out-of-process worker pool (documented in DESIGN.md). Unlike
/// [`run_threaded`]'s static partition, load is balanced dynamically.
pub fn run_distributed<S, F>(
    rng: &mut Rng,
    model: &S::Model,
    make_sampler: F,
    nchains: usize,
    n: usize,
    options: ParallelOptions,
) -> Result<Vec<S::Chain>>
where
    S: Sampler + Send,
    S::Model: Sync,
    S::Chain: Send,
    F: Fn() -> S + Sync,
{
    if nchains == 0 {
        return Err(McmcError::invalid("nchains must be >= 1"));
    }
    let seeds = draw_seeds(rng, nchains);
    let hardware = num_cpus::get();
    let workers = nchains.min(hardware).max(1);
    if workers == 1 {
        log::warn!("distributed parallel driver running with a single worker");
    }
    if nchains > hardware {
        log::warn!("nchains ({nchains}) exceeds hardware-thread count ({hardware})");
    }
    log::debug!("distributed parallel driver: {nchains} jobs across {workers} workers");

    let bar = options
        .progress
        .then(|| crate::progress::progress_bar(nchains as u64, "parallel-distributed"))
        .flatten();

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
    for i in 0..nchains {
        let _ = job_tx.send(i);
    }
    drop(job_tx);
    let (result_tx, result_rx) = crossbeam_channel::unbounded();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let seeds = &seeds;
            let make_sampler = &make_sampler;
            let model = &model;
            let options = &options;
            scope.spawn(move || {
                while let Ok(i) = job_rx.recv() {
                    let mut chain_rng = seeded_rng(seeds[i]);
                    let mut sampler = make_sampler();
                    let result = driver::run(&mut chain_rng, model, &mut sampler, n, driver_options_for(options, i));
                    let _ = result_tx.send((i, result));
                }
            });
        }
        drop(result_tx);
        collect(result_rx, nchains, bar)
    })
}

/// Map `nchains` over the Sequential Driver one at a time, annotating
/// progress names with the chain index.
pub fn run_serial<S, F>(
    rng: &mut Rng,
    model: &S::Model,
    make_sampler: F,
    nchains: usize,
    n: usize,
    options: ParallelOptions,
) -> Result<Vec<S::Chain>>
where
    S: Sampler,
    F: Fn() -> S,
{
    if nchains == 0 {
        return Err(McmcError::invalid("nchains must be >= 1"));
    }
    let seeds = draw_seeds(rng, nchains);
    log::debug!("serial parallel driver: {nchains} chains");
    let bar = options
        .progress
        .then(|| crate::progress::progress_bar(nchains as u64, "parallel-serial"))
        .flatten();

    let mut chains = Vec::with_capacity(nchains);
    for (i, &seed) in seeds.iter().enumerate() {
        let mut chain_rng = seeded_rng(seed);
        let mut sampler = make_sampler();
        let chain = driver::run(&mut chain_rng, model, &mut sampler, n, driver_options_for(&options, i))?;
        chains.push(chain);
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = &bar {
        bar.finish();
    }
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{GaussianModel, RandomWalkMetropolis};
    use crate::sampler::seeded_rng;

    #[test]
    fn seeds_are_drawn_once_before_dispatch() {
        let mut rng_a = seeded_rng(42);
        let mut rng_b = seeded_rng(42);
        let seeds_a = draw_seeds(&mut rng_a, 4);
        let seeds_b = draw_seeds(&mut rng_b, 4);
        assert_eq!(seeds_a, seeds_b);
    }

    #[test]
    fn threaded_and_serial_drivers_agree() {
        let model = GaussianModel::new(0.0, 1.0);
        let make_sampler = || RandomWalkMetropolis::new(1.0, 0.5);

        let mut rng_threaded = seeded_rng(7);
        let threaded = run_threaded(&mut rng_threaded, &model, make_sampler, 4, 20, ParallelOptions {
            progress: false,
            ..ParallelOptions::default()
        })
        .unwrap();

        let mut rng_serial = seeded_rng(7);
        let serial = run_serial(&mut rng_serial, &model, make_sampler, 4, 20, ParallelOptions {
            progress: false,
            ..ParallelOptions::default()
        })
        .unwrap();

        assert_eq!(threaded.len(), serial.len());
        for (t, s) in threaded.iter().zip(serial.iter()) {
            assert_eq!(t.samples, s.samples);
        }
    }

    #[test]
    fn zero_chains_is_rejected() {
        let model = GaussianModel::new(0.0, 1.0);
        let make_sampler = || RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(1);
        let err = run_serial(&mut rng, &model, make_sampler, 0, 10, ParallelOptions::default()).unwrap_err();
        assert!(matches!(err, McmcError::InvalidArgument { .. }));
    }
}
