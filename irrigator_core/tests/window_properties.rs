use irrigator_core::window::{LONG_N, LONG_WINDOW, SHORT_N, Sample, SampleWindow};
use proptest::prelude::*;
use std::time::{Duration, Instant};

proptest! {
    // Long averages equal the mean of the latest 60 samples and are at
    // least 60 s apart, starting no earlier than 60 s after arming.
    #[test]
    fn long_average_is_mean_of_latest_sixty(
        weights in prop::collection::vec(0.0f64..5000.0, 60..400),
        gaps_ms in prop::collection::vec(200u64..3000, 400),
    ) {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        let mut now = t0;
        let mut pushed: Vec<f64> = Vec::new();
        let mut last_emit: Option<Instant> = None;

        for (i, &g) in weights.iter().enumerate() {
            now += Duration::from_millis(gaps_ms[i]);
            let accepted = w.push(Sample { at: now, weight_g: g });
            prop_assert!(accepted);
            pushed.push(g);

            if let Some(avg) = w.try_emit_long(now) {
                prop_assert!(now >= t0 + LONG_WINDOW);
                prop_assert!(pushed.len() >= LONG_N);
                if let Some(prev) = last_emit {
                    prop_assert!(now.duration_since(prev) >= LONG_WINDOW);
                }
                last_emit = Some(now);
                let tail = &pushed[pushed.len() - LONG_N..];
                let expected = tail.iter().sum::<f64>() / LONG_N as f64;
                prop_assert!((avg - expected).abs() < 1e-6, "avg {avg} expected {expected}");
            }
            prop_assert!(w.len() <= LONG_N);
        }
    }

    #[test]
    fn short_average_needs_ten_samples(
        n in 0usize..SHORT_N,
    ) {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for _ in 0..n {
            w.push(Sample { at: t0, weight_g: 1.0 });
        }
        prop_assert_eq!(w.try_emit_short(t0 + Duration::from_secs(3600)), None);
    }
}

#[test]
fn unarmed_window_never_emits() {
    let t0 = Instant::now();
    let mut w = SampleWindow::new();
    for i in 0..120u64 {
        let now = t0 + Duration::from_secs(i);
        assert!(!w.push(Sample {
            at: now,
            weight_g: 10.0
        }));
        assert_eq!(w.try_emit_short(now), None);
        assert_eq!(w.try_emit_long(now), None);
    }
}

#[test]
fn rearm_delays_next_long_average() {
    let t0 = Instant::now();
    let mut w = SampleWindow::new();
    w.arm(t0);
    for i in 1..=60u64 {
        w.push(Sample {
            at: t0 + Duration::from_secs(i),
            weight_g: 1.0,
        });
    }
    assert!(w.try_emit_long(t0 + Duration::from_secs(60)).is_some());

    let t1 = t0 + Duration::from_secs(61);
    w.arm(t1);
    for i in 1..=59u64 {
        let now = t1 + Duration::from_secs(i);
        w.push(Sample {
            at: now,
            weight_g: 2.0,
        });
        assert_eq!(w.try_emit_long(now), None);
    }
    let now = t1 + Duration::from_secs(60);
    w.push(Sample {
        at: now,
        weight_g: 2.0,
    });
    assert_eq!(w.try_emit_long(now), Some(2.0));
}
