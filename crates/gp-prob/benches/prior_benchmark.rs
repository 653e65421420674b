use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use gp_prob::{ParamStore, Parameter, Prior, Transform};

fn bench_log_prior(c: &mut Criterion) {
    let xs: Vec<f64> = (1..=1_000).map(|i| i as f64 * 0.01).collect();
    let prior = Arc::new(Prior::gamma(2.0, 1.5).unwrap());
    let p = Parameter::from_value(Transform::Positive, xs.clone(), Some(prior)).unwrap();

    c.bench_function("positive_gamma_get_prior_1k", |b| {
        b.iter(|| black_box(p.get_prior().unwrap()))
    });

    c.bench_function("positive_gamma_grad_log_prior_1k", |b| {
        b.iter(|| black_box(p.grad_log_prior().unwrap()))
    });

    let mut store = ParamStore::new();
    store.insert("x", p.clone()).unwrap();
    let state = store.free_state();
    c.bench_function("free_state_roundtrip_1k", |b| {
        b.iter(|| {
            store.set_free_state(black_box(&state)).unwrap();
            black_box(store.free_state())
        })
    });
}

fn bench_lower_triangular(c: &mut Criterion) {
    let n = 50;
    let flat: Vec<f64> = (0..n * (n + 1) / 2).map(|i| i as f64).collect();
    let raw = ndarray::arr1(&flat).into_dyn();
    c.bench_function("lower_triangular_forward_50", |b| {
        b.iter(|| black_box(Transform::LowerTriangular.forward(&raw).unwrap()))
    });
}

criterion_group!(benches, bench_log_prior, bench_lower_triangular);
criterion_main!(benches);
