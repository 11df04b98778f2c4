//! The swap engine (§4.E): rejection accounting and deterministic
//! even/odd (DEO) exchange of β between adjacent replicas.

use rand::Rng as _;

use crate::sampler::{Rng, Sampler};
use crate::tempering::replica::Replica;

/// Even/odd parity of a sweep, per the DEO schedule (§4.E, §4.G). Even
/// sweep numbers use `Odd` (s=2 touches pairs 2,4,..), odd sweeps use
/// `Even` (s=1 touches pairs 1,3,..); named for which pair *parity* is
/// attempted, using 1-indexed pair numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// touch pairs i ≡ 1 (mod 2): (1,2), (3,4), …
    Odd,
    /// touch pairs i ≡ 0 (mod 2): (2,3), (4,5), …
    Even,
}

impl Parity {
    /// Deterministic parity alternation: even sweep numbers use s=2 (Even),
    /// odd sweeps use s=1 (Odd). `sweep` is 1-indexed per §4.G/§5.
    pub fn for_sweep(sweep: usize) -> Self {
        if sweep % 2 == 0 { Parity::Even } else { Parity::Odd }
    }

    fn touches(self, pair: usize) -> bool {
        match self {
            Parity::Odd => pair % 2 == 1,
            Parity::Even => pair % 2 == 0,
        }
    }
}

/// Run one DEO sweep over `replicas`, accumulating rejection into
/// `rejections` (length `replicas.len() - 1`) and swapping β between
/// adjacent pairs whose 1-indexed pair number matches `parity`.
///
/// All `N-1` pairs are accounted for rejection regardless of parity; only
/// the pairs touched by `parity` are candidates for an actual exchange.
///
/// Pairs are adjacent by current β *rank*, not by slot index: a swap
/// exchanges β between two replicas, so a slot's β (and hence its rank)
/// moves over time, while the replica itself never changes slot. Re-sorting
/// by rank at the top of every sweep keeps pairing well-defined without
/// needing the replica vector itself to stay physically sorted.
pub fn sweep<S: Sampler>(
    replicas: &mut [Replica<S>],
    model: &S::Model,
    parity: Parity,
    rng: &mut Rng,
    rejections: &mut [f64],
) {
    let n = replicas.len();
    assert_eq!(rejections.len(), n.saturating_sub(1));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| replicas[b].beta.partial_cmp(&replicas[a].beta).unwrap());

    for pair in 1..n {
        let left = order[pair - 1];
        let right = order[pair];
        let left_beta = replicas[left].beta;
        let right_beta = replicas[right].beta;
        let left_ld = replicas[left].log_density();
        let right_ld = replicas[right].log_density();

        // asymmetric sign convention: acceptance uses (β_i - β_{i+1})·(ℓπ_i - ℓπ_{i+1})
        let log_alpha = (left_beta - right_beta) * (left_ld - right_ld);
        // rejection accounting uses the |Δβ| convention, always computed
        let rejection = 1.0 - (-(left_beta - right_beta).abs() * (left_ld - right_ld)).exp().min(1.0);
        rejections[pair - 1] += rejection;

        if parity.touches(pair) {
            let u: f64 = rng.random();
            if (1.0 - u).ln() <= log_alpha {
                replicas[left].set_beta(model, right_beta);
                replicas[right].set_beta(model, left_beta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{GaussianModel, RandomWalkMetropolis};
    use crate::sampler::{Sampler, seeded_rng};

    fn make_replica(beta: f64, x: f64, model: &GaussianModel) -> Replica<RandomWalkMetropolis> {
        let mut sampler = RandomWalkMetropolis::new(beta, 0.5);
        let mut rng = seeded_rng(0);
        let (_, state) = sampler.initial_step(&mut rng, model);
        let state = sampler.set_beta(model, &state, beta);
        let mut replica = Replica::new(sampler, state, beta);
        replica.state.x = x;
        replica
    }

    #[test]
    fn parity_alternates_deterministically() {
        assert_eq!(Parity::for_sweep(1), Parity::Odd);
        assert_eq!(Parity::for_sweep(2), Parity::Even);
        assert_eq!(Parity::for_sweep(3), Parity::Odd);
    }

    #[test]
    fn all_pairs_accumulate_rejection_regardless_of_parity() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut replicas = vec![
            make_replica(1.0, 2.0, &model),
            make_replica(0.5, -2.0, &model),
            make_replica(0.0, 0.5, &model),
        ];
        let mut rng = seeded_rng(99);
        let mut rejections = vec![0.0; 2];
        sweep(&mut replicas, &model, Parity::Even, &mut rng, &mut rejections);
        assert!(rejections.iter().all(|&r| r >= 0.0));
    }

    #[test]
    fn endpoints_never_swap_out_of_place() {
        let model = GaussianModel::new(0.0, 1.0);
        let mut replicas = vec![
            make_replica(1.0, 2.0, &model),
            make_replica(0.5, 0.0, &model),
            make_replica(0.0, -2.0, &model),
        ];
        let mut rng = seeded_rng(1234);
        let mut rejections = vec![0.0; 2];
        for sweep_no in 1..=10 {
            sweep(
                &mut replicas,
                &model,
                Parity::for_sweep(sweep_no),
                &mut rng,
                &mut rejections,
            );
        }
        assert_eq!(replicas.len(), 3);
    }
}
