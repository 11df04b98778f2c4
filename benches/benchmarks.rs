use nrpt::driver::{self, DriverOptions};
use nrpt::gaussian::{GaussianModel, RandomWalkMetropolis};
use nrpt::sampler::Sampler as _;
use nrpt::sampler::seeded_rng;
use nrpt::tempering::{self, NrptOptions};

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        sequential_driver_1000_samples,
        swap_sweep_ten_replicas,
        ladder_update_ten_replicas,
        nrpt_run_five_replicas,
}

fn sequential_driver_1000_samples(c: &mut criterion::Criterion) {
    let model = GaussianModel::new(0.0, 1.0);
    c.bench_function("run 1000 Metropolis samples", |b| {
        b.iter(|| {
            let mut sampler = RandomWalkMetropolis::new(1.0, 0.5);
            let mut rng = seeded_rng(0);
            driver::run(
                &mut rng,
                &model,
                &mut sampler,
                1000,
                DriverOptions {
                    progress: false,
                    ..DriverOptions::default()
                },
            )
            .unwrap()
        })
    });
}

fn swap_sweep_ten_replicas(c: &mut criterion::Criterion) {
    let model = GaussianModel::new(0.0, 1.0);
    c.bench_function("DEO sweep over 10 replicas", |b| {
        b.iter(|| {
            let mut rng = seeded_rng(1);
            let mut replicas: Vec<_> = (0..10)
                .map(|i| {
                    let beta = 1.0 - i as f64 / 9.0;
                    let mut sampler = RandomWalkMetropolis::new(beta, 0.5);
                    let (_, state) = sampler.initial_step(&mut rng, &model);
                    tempering::Replica::new(sampler, state, beta)
                })
                .collect();
            let mut rejections = vec![0.0; 9];
            tempering::sweep(&mut replicas, &model, tempering::Parity::Odd, &mut rng, &mut rejections);
        })
    });
}

fn ladder_update_ten_replicas(c: &mut criterion::Criterion) {
    let ladder: Vec<f64> = (0..10).map(|i| 1.0 - i as f64 / 9.0).collect();
    let rejections = vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.1, 0.05, 0.15, 0.0];
    c.bench_function("equidistribute a 10-rung ladder", |b| {
        b.iter(|| tempering::update_betas(&ladder, &rejections).unwrap())
    });
}

fn nrpt_run_five_replicas(c: &mut criterion::Criterion) {
    let model = GaussianModel::new(1.0, 1.0);
    c.bench_function("full NRPT run, 5 replicas", |b| {
        b.iter(|| {
            let betas: Vec<f64> = (0..5).map(|i| 1.0 - i as f64 / 4.0).collect();
            let samplers: Vec<_> = betas.iter().map(|&beta| RandomWalkMetropolis::new(beta, 0.5)).collect();
            let mut rng = seeded_rng(2);
            let options = NrptOptions {
                swap_every: 1,
                n_tune: 8,
                n_sample: 200,
                progress: false,
            };
            tempering::run(&model, samplers, betas, &mut rng, &options).unwrap()
        })
    });
}
