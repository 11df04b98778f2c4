//! A minimal concrete instantiation of the sampler contract: a
//! random-walk Metropolis kernel targeting a Gaussian, tempered against a
//! standard-normal reference. A small worked example exercised by the
//! crate's own tests and demo binary, not a production model.

use rand::Rng as _;
use rand_distr::{Distribution, Normal};

use crate::sampler::{ChainStats, Rng, Sampler, SamplerState};

/// Tempered Gaussian target: `log_density(x, beta) = beta * log N(x; mean, sd)
/// + (1-beta) * log N(x; 0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct GaussianModel {
    pub target_mean: f64,
    pub target_sd: f64,
}

impl GaussianModel {
    pub fn new(target_mean: f64, target_sd: f64) -> Self {
        Self {
            target_mean,
            target_sd,
        }
    }

    fn log_normal(x: f64, mean: f64, sd: f64) -> f64 {
        let z = (x - mean) / sd;
        -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
    }

    pub fn log_density_at(&self, x: f64, beta: f64) -> f64 {
        let target = Self::log_normal(x, self.target_mean, self.target_sd);
        let reference = Self::log_normal(x, 0.0, 1.0);
        beta * target + (1.0 - beta) * reference
    }
}

/// Opaque sampler state: the current point, the replica's β, and the
/// cached log-density (the only observable the swap engine requires).
#[derive(Debug, Clone, Copy)]
pub struct State {
    pub x: f64,
    pub beta: f64,
    log_density: f64,
}

impl SamplerState for State {
    fn log_density(&self) -> f64 {
        self.log_density
    }
}

/// Produced chain: the retained samples plus the bookkeeping from §4.A.
#[derive(Debug, Clone)]
pub struct MarkovChain {
    pub samples: Vec<f64>,
    pub stats: ChainStats,
}

/// Symmetric-proposal random-walk Metropolis kernel.
#[derive(Debug, Clone)]
pub struct RandomWalkMetropolis {
    pub beta: f64,
    pub step_size: f64,
}

impl RandomWalkMetropolis {
    pub fn new(beta: f64, step_size: f64) -> Self {
        Self { beta, step_size }
    }

    fn propose(&self, rng: &mut Rng, model: &GaussianModel, from: f64) -> State {
        let proposal = Normal::new(from, self.step_size)
            .expect("step_size must be positive")
            .sample(rng);
        State {
            x: proposal,
            beta: self.beta,
            log_density: model.log_density_at(proposal, self.beta),
        }
    }

    fn accept(&self, rng: &mut Rng, current: &State, proposed: &State) -> bool {
        let log_alpha = proposed.log_density - current.log_density;
        if log_alpha >= 0.0 {
            return true;
        }
        rng.random::<f64>().ln() < log_alpha
    }
}

impl Sampler for RandomWalkMetropolis {
    type Model = GaussianModel;
    type State = State;
    type Sample = f64;
    type Buffer = Vec<f64>;
    type Chain = MarkovChain;

    fn initial_step(&mut self, rng: &mut Rng, model: &GaussianModel) -> (f64, State) {
        let x = rng.random::<f64>() * 2.0 - 1.0;
        let state = State {
            x,
            beta: self.beta,
            log_density: model.log_density_at(x, self.beta),
        };
        (state.x, state)
    }

    fn next_step(&mut self, rng: &mut Rng, model: &GaussianModel, state: &State) -> (f64, State) {
        let proposed = self.propose(rng, model, state.x);
        let next = if self.accept(rng, state, &proposed) {
            proposed
        } else {
            *state
        };
        (next.x, next)
    }

    fn new_buffer(&self, _sample: &f64, _model: &GaussianModel, n_hint: usize) -> Vec<f64> {
        Vec::with_capacity(n_hint)
    }

    fn save(
        &self,
        mut buffer: Vec<f64>,
        sample: f64,
        index: usize,
        _model: &GaussianModel,
        _n_hint: usize,
    ) -> Vec<f64> {
        assert_eq!(
            index,
            buffer.len() + 1,
            "samples must be saved in strictly increasing order"
        );
        buffer.push(sample);
        buffer
    }

    fn bundle(
        &self,
        buffer: Vec<f64>,
        _model: &GaussianModel,
        _final_state: State,
        stats: ChainStats,
    ) -> MarkovChain {
        MarkovChain {
            samples: buffer,
            stats,
        }
    }

    fn set_beta(&mut self, model: &GaussianModel, state: &State, beta: f64) -> State {
        self.beta = beta;
        State {
            x: state.x,
            beta,
            log_density: model.log_density_at(state.x, beta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::seeded_rng;

    #[test]
    fn log_density_is_symmetric_in_beta_endpoints() {
        let model = GaussianModel::new(2.0, 1.0);
        assert!((model.log_density_at(0.0, 0.0) - GaussianModel::log_normal(0.0, 0.0, 1.0)).abs() < 1e-12);
        assert!((model.log_density_at(2.0, 1.0) - GaussianModel::log_normal(2.0, 2.0, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn kernel_explores_without_panicking() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
        let mut rng = seeded_rng(5);
        let (_, mut state) = sampler.initial_step(&mut rng, &model);
        for _ in 0..1000 {
            let (_, next) = sampler.next_step(&mut rng, &model, &state);
            state = next;
        }
        assert!(state.x.is_finite());
    }
}
