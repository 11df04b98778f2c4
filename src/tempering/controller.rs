//! The NRPT controller (§4.G): drives TUNE, then SAMPLE, then bundles.

use crate::error::{McmcError, Result};
use crate::progress;
use crate::sampler::{ChainStats, Rng, Sampler};
use crate::tempering::ladder;
use crate::tempering::replica::Replica;
use crate::tempering::swap::{self, Parity};

/// Options governing one NRPT run, beyond the β-ladder itself.
#[derive(Debug, Clone, Copy)]
pub struct NrptOptions {
    /// Attempt a swap sweep every `swap_every` DEO iterations.
    pub swap_every: usize,
    /// Tuning budget; `Maxround = floor(log2(n_tune))`.
    pub n_tune: usize,
    /// Number of DEO iterations (and retained samples per β) in SAMPLE.
    pub n_sample: usize,
    pub progress: bool,
}

impl Default for NrptOptions {
    fn default() -> Self {
        Self {
            swap_every: 1,
            n_tune: 16,
            n_sample: 1000,
            progress: progress::progress_enabled(),
        }
    }
}

impl NrptOptions {
    fn validate(&self) -> Result<()> {
        if self.n_tune < 2 {
            return Err(McmcError::invalid("N_tune must be at least 2"));
        }
        if self.n_sample < 1 {
            return Err(McmcError::invalid("N_sample must be at least 1"));
        }
        if self.swap_every < 1 {
            return Err(McmcError::invalid("swap_every must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of a full NRPT run: one bundled chain per ladder rung, plus the
/// `2·Λ(1)` diagnostic reported at the TUNE→SAMPLE transition.
pub struct NrptOutcome<S: Sampler> {
    pub chains: Vec<(f64, S::Chain)>,
    pub diagnostic: f64,
}

/// floor(log2(n)) for n ≥ 1, computed without floating-point rounding.
fn floor_log2(n: usize) -> usize {
    (usize::BITS - 1 - (n as u32).leading_zeros()) as usize
}

/// Run one DEO iteration: local exploration of every replica, then (if the
/// global iteration count is due) a swap attempt. Returns the per-replica
/// samples produced by this iteration's local exploration, in slot order.
fn deo_iteration<S: Sampler>(
    replicas: &mut [Replica<S>],
    model: &S::Model,
    rng: &mut Rng,
    global_iteration: &mut usize,
    swap_attempt: &mut usize,
    swap_every: usize,
    rejections: &mut [f64],
) -> Vec<S::Sample> {
    let mut samples = Vec::with_capacity(replicas.len());
    for replica in replicas.iter_mut() {
        let (sample, next) = replica.sampler.next_step(rng, model, &replica.state);
        replica.state = next;
        samples.push(sample);
    }

    *global_iteration += 1;
    if *global_iteration % swap_every == 0 {
        *swap_attempt += 1;
        let parity = Parity::for_sweep(*swap_attempt);
        swap::sweep(replicas, model, parity, rng, rejections);
    }
    samples
}

/// Re-equidistribute the β-ladder from one phase's accumulated rejection,
/// writing the new βs back onto the replicas by rank (not slot). Returns
/// `None` (no-op) when the phase attempted no swaps, since an all-zero
/// rejection vector in that case carries no information; otherwise returns
/// this phase's Λ_total, which becomes the SAMPLE-transition diagnostic.
fn refresh_ladder<S: Sampler>(
    replicas: &mut [Replica<S>],
    model: &S::Model,
    rejections: &[f64],
    attempts_in_phase: usize,
) -> Result<Option<f64>> {
    if attempts_in_phase == 0 {
        return Ok(None);
    }
    let n = replicas.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| replicas[b].beta.partial_cmp(&replicas[a].beta).unwrap());

    let current_ladder: Vec<f64> = order.iter().map(|&i| replicas[i].beta).collect();
    let averaged: Vec<f64> = rejections.iter().map(|r| r / attempts_in_phase as f64).collect();
    let spline = ladder::communication_barrier(&current_ladder, &averaged)?;
    let lambda_total = spline.total();
    let new_ladder = ladder::update_betas(&current_ladder, &averaged)?;

    for (rank, &slot) in order.iter().enumerate() {
        replicas[slot].set_beta(model, new_ladder[rank]);
    }
    Ok(Some(lambda_total))
}

/// Run the full TUNE → SAMPLE → DONE state machine (§4.G).
///
/// `samplers` and `betas` must have the same length (N ≥ 2 replicas);
/// `betas` must be strictly decreasing with `betas[0] == 1.0` and
/// `betas[N-1] == 0.0`. Each sampler is expected to already be configured
/// at its corresponding β (as `RandomWalkMetropolis::new` does).
pub fn run<S: Sampler>(
    model: &S::Model,
    samplers: Vec<S>,
    betas: Vec<f64>,
    rng: &mut Rng,
    options: &NrptOptions,
) -> Result<NrptOutcome<S>> {
    options.validate()?;
    let n = samplers.len();
    if n < 2 || betas.len() != n {
        return Err(McmcError::invalid(
            "NRPT requires at least two replicas with a matching β-ladder",
        ));
    }
    for w in betas.windows(2) {
        if !(w[0] > w[1]) {
            return Err(McmcError::invalid("β-ladder must be strictly decreasing"));
        }
    }
    if betas[0] != 1.0 || *betas.last().unwrap() != 0.0 {
        return Err(McmcError::invalid("β-ladder must run from 1.0 to 0.0"));
    }

    let mut replicas = Vec::with_capacity(n);
    for (mut sampler, beta) in samplers.into_iter().zip(betas.iter().copied()) {
        let (_, state) = sampler.initial_step(rng, model);
        replicas.push(Replica::new(sampler, state, beta));
    }

    let maxround = floor_log2(options.n_tune);
    let tune_phase_sizes: Vec<usize> = (1..=maxround).flat_map(|r| (1..=r).map(|phase| 1usize << (phase - 1))).collect();
    let total_iterations: usize = tune_phase_sizes.iter().sum::<usize>() + options.n_sample;

    log::debug!(
        "NRPT starting: N={n} N_tune={} (Maxround={maxround}) N_sample={} swap_every={}",
        options.n_tune,
        options.n_sample,
        options.swap_every
    );

    let bar = if options.progress {
        progress::progress_bar(total_iterations as u64, "nrpt")
    } else {
        None
    };

    let mut global_iteration = 0usize;
    let mut swap_attempt = 0usize;
    let mut last_lambda_total = 0.0;

    let mut round = 1;
    for &phase_size in &tune_phase_sizes {
        log::info!("entering TUNE round {round}, phase of {phase_size} DEO iteration(s)");
        let mut rejections = vec![0.0; n - 1];
        let mut attempts_in_phase = 0usize;
        for _ in 0..phase_size {
            let before = swap_attempt;
            deo_iteration(
                &mut replicas,
                model,
                rng,
                &mut global_iteration,
                &mut swap_attempt,
                options.swap_every,
                &mut rejections,
            );
            attempts_in_phase += swap_attempt - before;
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }
        match refresh_ladder(&mut replicas, model, &rejections, attempts_in_phase)? {
            Some(lambda_total) => last_lambda_total = lambda_total,
            None => log::debug!("skipping ladder refresh: no swap attempts in this phase"),
        }
        round += 1;
    }

    let mut final_ladder: Vec<f64> = replicas.iter().map(|r| r.beta).collect();
    final_ladder.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let diagnostic = 2.0 * last_lambda_total;
    log::info!("entering SAMPLE phase, 2*Lambda(1) = {diagnostic}");

    let mut buffers: Vec<Option<S::Buffer>> = (0..n).map(|_| None).collect();
    let mut counts = vec![0usize; n];
    let start = std::time::Instant::now();

    for _ in 0..options.n_sample {
        let mut rejections = vec![0.0; n - 1];
        let samples = deo_iteration(
            &mut replicas,
            model,
            rng,
            &mut global_iteration,
            &mut swap_attempt,
            options.swap_every,
            &mut rejections,
        );
        if let Some(bar) = &bar {
            bar.inc(1);
        }

        for (slot, sample) in samples.into_iter().enumerate() {
            // exact float equality is intentional: swaps only ever copy one
            // of the N fixed ladder values between slots, never recompute one
            let beta = replicas[slot].beta;
            let rank = final_ladder
                .iter()
                .position(|&b| b == beta)
                .expect("replica β must be one of the final ladder rungs");
            let buffer = buffers[rank]
                .take()
                .unwrap_or_else(|| replicas[slot].sampler.new_buffer(&sample, model, options.n_sample));
            counts[rank] += 1;
            buffers[rank] = Some(replicas[slot].sampler.save(buffer, sample, counts[rank], model, options.n_sample));
        }
    }

    let stop = std::time::Instant::now();
    let stats = ChainStats {
        start,
        stop,
        iterations: options.n_sample,
    };

    let mut chains = Vec::with_capacity(n);
    for (rank, beta) in final_ladder.iter().copied().enumerate() {
        let slot = replicas
            .iter()
            .position(|r| r.beta == beta)
            .expect("every rung is held by exactly one replica at SAMPLE's end");
        let buffer = buffers[rank]
            .take()
            .expect("every rank receives a sample on every SAMPLE iteration, and N_sample >= 1");
        let final_state = replicas[slot].state.clone();
        let chain = replicas[slot].sampler.bundle(buffer, model, final_state, stats);
        chains.push((beta, chain));
    }

    log::debug!("NRPT finished: {} chains bundled", chains.len());
    Ok(NrptOutcome { chains, diagnostic })
}
