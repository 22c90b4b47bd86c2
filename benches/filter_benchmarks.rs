//! Filter benchmarks using Criterion.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{DMatrix, DVector};

use sailtrack_kalman::{presets, CovarianceUpdate, FilterConfig, KalmanFilter, StateSpaceModel};

/// 3-axis position/velocity model sampled at 5 Hz.
fn vehicle_model() -> Arc<StateSpaceModel> {
    Arc::new(
        presets::constant_velocity(3, 0.2, 0.1)
            .expect("valid preset")
            .measurement_noise(DMatrix::identity(6, 6) * 0.25)
            .build()
            .expect("valid model"),
    )
}

fn vehicle_filter(covariance_update: CovarianceUpdate) -> KalmanFilter {
    let mut config = FilterConfig::new(covariance_update);
    config.verify_consistency = false;
    KalmanFilter::new(vehicle_model(), DVector::zeros(6), None, config).expect("valid filter")
}

fn benchmark_predict_6_states(c: &mut Criterion) {
    let mut filter = vehicle_filter(CovarianceUpdate::Simple);
    let accel = DVector::from_vec(vec![0.1, 0.0, -0.02]);

    c.bench_function("predict_6_states", |b| {
        b.iter(|| {
            filter.predict(Some(black_box(&accel)), None).unwrap();
        })
    });
}

fn benchmark_cycle_6_states_simple(c: &mut Criterion) {
    let mut filter = vehicle_filter(CovarianceUpdate::Simple);
    let accel = DVector::from_vec(vec![0.1, 0.0, -0.02]);
    let measurement = DVector::from_vec(vec![1.0, 2.0, 0.5, 0.1, 0.0, 0.0]);

    c.bench_function("cycle_6_states_simple", |b| {
        b.iter(|| {
            filter.predict(Some(black_box(&accel)), None).unwrap();
            filter.correct(black_box(&measurement)).unwrap();
        })
    });
}

fn benchmark_cycle_6_states_joseph(c: &mut Criterion) {
    let mut filter = vehicle_filter(CovarianceUpdate::Joseph);
    let accel = DVector::from_vec(vec![0.1, 0.0, -0.02]);
    let measurement = DVector::from_vec(vec![1.0, 2.0, 0.5, 0.1, 0.0, 0.0]);

    c.bench_function("cycle_6_states_joseph", |b| {
        b.iter(|| {
            filter.predict(Some(black_box(&accel)), None).unwrap();
            filter.correct(black_box(&measurement)).unwrap();
        })
    });
}

fn benchmark_cycle_with_runtime_noise(c: &mut Criterion) {
    let mut filter = vehicle_filter(CovarianceUpdate::Simple);
    let accel = DVector::from_vec(vec![0.1, 0.0, -0.02]);
    let measurement = DVector::from_vec(vec![1.0, 2.0, 0.5, 0.1, 0.0, 0.0]);
    let accuracies = [1.2, 1.2, 2.0, 0.1, 0.1, 0.15];

    c.bench_function("cycle_with_runtime_noise", |b| {
        b.iter(|| {
            let r = presets::noise_from_accuracy(black_box(&accuracies)).unwrap();
            filter.set_measurement_noise(r).unwrap();
            filter.predict(Some(&accel), None).unwrap();
            filter.correct(&measurement).unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_predict_6_states,
    benchmark_cycle_6_states_simple,
    benchmark_cycle_6_states_joseph,
    benchmark_cycle_with_runtime_noise,
);
criterion_main!(benches);
