use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use irrigator_core::window::{Sample, SampleWindow};
use std::time::{Duration, Instant};

// Slowly drying tray with a little xorshift jitter
fn synth_weights(n: usize, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut jitter = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / f64::from(u32::MAX) - 0.5
    };
    (0..n).map(|i| 1000.0 - i as f64 * 0.05 + jitter()).collect()
}

pub fn bench_window(c: &mut Criterion) {
    let weights = synth_weights(3600, 7);

    c.bench_function("window_push_emit_1h", |b| {
        b.iter_batched(
            || {
                let t0 = Instant::now();
                let mut w = SampleWindow::new();
                w.arm(t0);
                (t0, w)
            },
            |(t0, mut w)| {
                let mut emitted = 0usize;
                for (i, &g) in weights.iter().enumerate() {
                    let now = t0 + Duration::from_secs(i as u64);
                    w.push(Sample { at: now, weight_g: g });
                    emitted += usize::from(w.try_emit_short(now).is_some());
                    emitted += usize::from(w.try_emit_long(now).is_some());
                }
                black_box(emitted)
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("window_mean_of_latest_60", |b| {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for &g in &weights[..60] {
            w.push(Sample { at: t0, weight_g: g });
        }
        b.iter(|| black_box(w.mean_of_latest(black_box(60))));
    });
}

criterion_group!(benches, bench_window);
criterion_main!(benches);
