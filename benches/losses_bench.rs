use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rand::rng;
use rust_tensor_losses::{backend::cpu::CpuBackend, compat, losses, CpuTensor, Reduction, Tensor};

// Values in (0.05, 1.05) keep ln-based losses finite.
fn create_random_cpu(shape: &[usize], requires_grad: bool) -> CpuTensor {
    let size = shape.iter().product();
    let mut rng_instance = rng();
    let data: Vec<f32> = (0..size)
        .map(|_| 0.05 + rng_instance.random::<f32>())
        .collect();
    Tensor::<CpuBackend>::from_vec(data, shape, requires_grad).unwrap()
}

fn bench_regression_losses(c: &mut Criterion) {
    let sizes = [(1024, "1k"), (65536, "64k")];
    let mut group = c.benchmark_group("regression_losses");

    for (size, label) in sizes.iter() {
        let predicted = create_random_cpu(&[*size], false);
        let expected = create_random_cpu(&[*size], false);

        group.bench_function(format!("l2_sum_{}", label), |bencher| {
            bencher.iter(|| {
                black_box(compat::losses::l2_loss(black_box(&predicted), black_box(&expected)))
                    .unwrap();
            });
        });
        group.bench_function(format!("huber_sum_{}", label), |bencher| {
            bencher.iter(|| {
                black_box(compat::losses::huber_loss(
                    black_box(&predicted),
                    black_box(&expected),
                    0.5,
                ))
                .unwrap();
            });
        });
        group.bench_function(format!("log_cosh_mean_{}", label), |bencher| {
            bencher.iter(|| {
                black_box(losses::log_cosh_loss(
                    black_box(&predicted),
                    black_box(&expected),
                    Reduction::Mean,
                ))
                .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_classification_losses(c: &mut Criterion) {
    let shapes = [([64, 10], "64x10"), ([512, 100], "512x100")];
    let mut group = c.benchmark_group("classification_losses");

    for (shape, label) in shapes.iter() {
        let logits = create_random_cpu(shape, false);
        let targets = create_random_cpu(shape, false);

        group.bench_function(format!("softmax_ce_{}", label), |bencher| {
            bencher.iter(|| {
                black_box(compat::losses::softmax_cross_entropy(
                    black_box(&logits),
                    black_box(&targets),
                ))
                .unwrap();
            });
        });
        group.bench_function(format!("categorical_hinge_{}", label), |bencher| {
            bencher.iter(|| {
                black_box(compat::losses::categorical_hinge_loss(
                    black_box(&logits),
                    black_box(&targets),
                ))
                .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_loss_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("loss_backward");
    let expected = create_random_cpu(&[256, 32], false);

    group.bench_function("softmax_ce_forward_backward_256x32", |bencher| {
        bencher.iter(|| {
            let logits = create_random_cpu(&[256, 32], true);
            let loss = losses::softmax_cross_entropy(&logits, &expected, Reduction::Mean).unwrap();
            loss.backward().unwrap();
            black_box(logits.grad().is_some());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_regression_losses,
    bench_classification_losses,
    bench_loss_backward
);
criterion_main!(benches);
