use {
    barotropic::{
        model::Model,
        parameters::Parameters,
        stepper::Scheme,
    },
    criterion::{criterion_group, criterion_main, Benchmark, Criterion},
};

fn parameters(scheme: Scheme) -> Parameters {
    let mut params = Parameters::default();
    params.numerical.scheme = scheme;
    params.numerical.snapshot_interval = 0.0;
    params
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench(
        "step",
        Benchmark::new("rk4", |b| {
            let mut model = Model::from_parameters(&parameters(Scheme::Rk4)).unwrap();

            b.iter(|| model.step().unwrap())
        })
        .sample_size(10),
    );
    c.bench(
        "step",
        Benchmark::new("leapfrog", |b| {
            let mut model = Model::from_parameters(&parameters(Scheme::Leapfrog)).unwrap();

            b.iter(|| model.step().unwrap())
        })
        .sample_size(10),
    );
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
