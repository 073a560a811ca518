//! Benchmarks for signal processing modules

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array2, Array3};

use cortex_mi_core::ClassLabel;
use cortex_mi_native::processing::{
    covariance::estimate_covariances, csp::CommonSpatialPattern, filters::filtfilt_rows,
};

/// Generate synthetic EEG epochs (sinusoids with pseudo-noise, class-dependent gain)
fn generate_epochs(n_epochs: usize, n_channels: usize, n_samples: usize) -> (Array3<f64>, Vec<ClassLabel>) {
    use std::f64::consts::PI;

    let labels: Vec<ClassLabel> = (0..n_epochs).map(|e| 1 + (e % 2) as ClassLabel).collect();
    let epochs = Array3::from_shape_fn((n_epochs, n_channels, n_samples), |(e, c, s)| {
        let t = s as f64 / 160.0;
        let gain = if c == e % 2 { 3.0 } else { 1.0 };
        let signal = (2.0 * PI * (8.0 + c as f64) * t).sin();
        let noise = ((e * 31 + c * 17 + s) as f64 * 0.123).sin() * 0.5; // Pseudo-noise
        gain * (signal + noise) * 20e-6
    });
    (epochs, labels)
}

fn bench_covariance(c: &mut Criterion) {
    let mut group = c.benchmark_group("covariance");

    for channels in [8, 32, 64].iter() {
        let (epochs, labels) = generate_epochs(45, *channels, 801);

        group.bench_with_input(BenchmarkId::from_parameter(channels), channels, |b, _| {
            b.iter(|| black_box(estimate_covariances(epochs.view(), &labels)));
        });
    }

    group.finish();
}

fn bench_csp_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("csp_fit");

    for channels in [8, 32, 64].iter() {
        let (epochs, labels) = generate_epochs(45, *channels, 801);

        group.bench_with_input(BenchmarkId::from_parameter(channels), channels, |b, _| {
            b.iter(|| {
                let mut csp = CommonSpatialPattern::default();
                black_box(csp.fit(epochs.view(), &labels).is_ok())
            });
        });
    }

    group.finish();
}

fn bench_csp_transform(c: &mut Criterion) {
    let (epochs, labels) = generate_epochs(45, 64, 801);
    let mut csp = CommonSpatialPattern::default();
    if csp.fit(epochs.view(), &labels).is_err() {
        return;
    }

    c.bench_function("csp_transform_64ch", |b| {
        b.iter(|| black_box(csp.transform(epochs.view())));
    });
}

fn bench_filtfilt(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtfilt");

    for samples in [4_000, 20_000, 60_000].iter() {
        let data = Array2::from_shape_fn((64, *samples), |(ch, s)| ((ch * 7 + s) as f64 * 0.05).sin());

        group.bench_with_input(BenchmarkId::from_parameter(samples), samples, |b, _| {
            b.iter(|| {
                let mut work = data.clone();
                filtfilt_rows(&mut work, 160.0, 7.0, 30.0);
                black_box(work)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_covariance, bench_csp_fit, bench_csp_transform, bench_filtfilt);
criterion_main!(benches);
