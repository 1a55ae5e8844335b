use criterion::{criterion_group, criterion_main, Criterion};
use meshbatch_ratecontrol::{AdaptiveRateController, RateControllerConfig};
use std::hint::black_box;
use std::time::Duration;

fn bench_steady_state_no_throttle(c: &mut Criterion) {
    c.bench_function("rate_controller_steady_state_get_parallelism", |b| {
        let controller = AdaptiveRateController::new("bench", RateControllerConfig::default());
        controller.get_parallelism(2, 4);

        b.iter(|| black_box(controller.get_parallelism(black_box(2), black_box(4))));
    });
}

fn bench_additive_increase_loop(c: &mut Criterion) {
    c.bench_function("rate_controller_additive_increase_step", |b| {
        let controller = AdaptiveRateController::new(
            "bench",
            RateControllerConfig {
                min_increase_interval: Duration::ZERO,
                stabilization_batches: 0,
                ..RateControllerConfig::default()
            },
        );
        controller.get_parallelism(1, 1);

        b.iter(|| {
            controller.record_batch_completion(black_box(Duration::from_millis(10)));
            black_box(controller.get_parallelism(1, 1))
        });
    });
}

/// Measures how many batch completions it takes the controller to climb back to its
/// pre-throttle parallelism after a single throttle event, under the default configuration.
fn bench_recovery_after_throttle(c: &mut Criterion) {
    c.bench_function("rate_controller_recovery_after_throttle", |b| {
        b.iter(|| {
            let controller = AdaptiveRateController::new(
                "bench",
                RateControllerConfig {
                    min_increase_interval: Duration::ZERO,
                    stabilization_batches: 1,
                    ..RateControllerConfig::default()
                },
            );
            controller.get_parallelism(4, 4);
            for _ in 0..20 {
                controller.record_batch_completion(Duration::from_millis(50));
            }
            let before_throttle = controller.snapshot().current;

            controller.record_throttle(Duration::from_secs(1));

            let mut batches = 0;
            while controller.snapshot().current < before_throttle && batches < 10_000 {
                controller.record_batch_completion(Duration::from_millis(50));
                batches += 1;
            }
            black_box(batches)
        });
    });
}

criterion_group!(
    benches,
    bench_steady_state_no_throttle,
    bench_additive_increase_loop,
    bench_recovery_after_throttle
);
criterion_main!(benches);
