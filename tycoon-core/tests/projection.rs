use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tycoon_core::constants::HOUR_MS;
use tycoon_core::{
    AdTerms, ProjectionError, SpeedSnapshot, Vector, amount, capacity, limited_total,
    project_revenue, project_traffic, rate, reset_at, traffic_amount,
};

const T: i64 = 1_700_000_000_000;
const SEEDS: u64 = 64;

fn random_speed(rng: &mut ChaCha20Rng) -> SpeedSnapshot {
    SpeedSnapshot {
        community_value: rng.gen_range(0.0..1_000.0),
        community_vector: rng.gen_range(-120.0..80.0),
        generic_value: rng.gen_range(0.0..2_000.0),
        generic_vector: rng.gen_range(-150.0..100.0),
        link_value: rng.gen_range(0.0..500.0),
        link_vector: rng.gen_range(-60.0..40.0),
        speed_ratio_value: rng.gen_range(0.0..0.05),
        speed_ratio_vector: rng.gen_range(-0.01..0.005),
        ddos_value: -rng.gen_range(0.0..400.0),
        limit: rng.gen_range(200.0..3_000.0),
        anno: rng.gen_range(0.0..100.0),
        front_ratio: rng.gen_range(0.5..1.5),
        ts: T,
    }
}

/// Trapezoid rule over `f` sampled every `step_ms`.
fn quadrature<F>(from: i64, to: i64, step_ms: i64, f: F) -> f64
where
    F: Fn(i64) -> f64,
{
    let mut total = 0.0;
    let mut at = from;
    let mut prev = f(at);
    while at < to {
        let next = (at + step_ms).min(to);
        let value = f(next);
        total += (prev + value) / 2.0 * (next - at) as f64 / HOUR_MS as f64;
        prev = value;
        at = next;
    }
    total
}

/// Relative comparison with a small absolute floor for near-zero totals.
fn close(actual: f64, expected: f64, rel: f64) -> bool {
    (actual - expected).abs() <= rel * expected.abs().max(1.0) + 1e-3
}

#[test]
fn community_scenario_stays_unclamped() {
    let speed = SpeedSnapshot {
        community_value: 600.0,
        community_vector: -15.0,
        generic_value: 5_000.0,
        generic_vector: 0.0,
        link_value: 9_000.0,
        link_vector: 0.0,
        limit: 25_000.0,
        ddos_value: 0.0,
        ts: T,
        ..SpeedSnapshot::default()
    };
    let result = project_traffic(&speed, T + HOUR_MS).unwrap();
    assert_eq!(result.community_speed, 585.0);
    assert_eq!(result.total_speed, 14_585.0);
}

#[test]
fn traffic_never_exceeds_capacity() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    for _ in 0..SEEDS {
        let speed = random_speed(&mut rng);
        let cap = capacity(&speed).unwrap();
        for hours in [0, 1, 3, 12, 48] {
            let result = project_traffic(&speed, T + hours * HOUR_MS).unwrap();
            assert!(result.total_speed <= cap + 1e-9, "{result:?} over {cap}");
            assert!(result.generic_speed >= 0.0);
            assert!(result.community_speed >= 0.0);
            assert!(result.link_speed >= 0.0);
        }
    }
}

#[test]
fn evaluate_is_monotonic_in_rate_direction() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    for _ in 0..SEEDS {
        let vector = Vector::new(
            rng.gen_range(0.0..100.0),
            rng.gen_range(-20.0..20.0),
            T,
        );
        let t1 = T + rng.gen_range(0..10 * HOUR_MS);
        let t2 = t1 + rng.gen_range(0..10 * HOUR_MS);
        let (a, b) = (vector.evaluate(t1).unwrap(), vector.evaluate(t2).unwrap());
        if vector.rate >= 0.0 {
            assert!(b >= a);
        } else {
            assert!(b <= a);
        }
        assert_eq!(vector.integrate(T).unwrap(), 0.0);
    }
}

#[test]
fn revenue_matches_numerical_quadrature() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    for _ in 0..SEEDS {
        let speed = random_speed(&mut rng);
        let to = T + rng.gen_range(HOUR_MS..48 * HOUR_MS);
        let exact = amount(&speed, to).unwrap();
        let numeric = quadrature(T, to, 20_000, |at| rate(&speed, at).unwrap());
        assert!(
            close(exact, numeric, 1e-4),
            "closed form {exact} vs quadrature {numeric} for {speed:?}"
        );
    }
}

#[test]
fn traffic_amount_matches_numerical_quadrature() {
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    for _ in 0..SEEDS {
        let speed = random_speed(&mut rng);
        let to = T + rng.gen_range(HOUR_MS..48 * HOUR_MS);
        let exact = traffic_amount(&speed, to).unwrap();
        let numeric = quadrature(T, to, 20_000, |at| limited_total(&speed, at).unwrap());
        assert!(
            close(exact, numeric, 1e-4),
            "closed form {exact} vs quadrature {numeric} for {speed:?}"
        );
    }
}

#[test]
fn several_boundaries_in_one_interval() {
    // Over capacity at first, the sum falls through the limit at 2h, the
    // ratio drains at 4h, community at 5h and link at 6h.
    let speed = SpeedSnapshot {
        community_value: 500.0,
        community_vector: -100.0,
        link_value: 600.0,
        link_vector: -100.0,
        limit: 700.0,
        speed_ratio_value: 0.4,
        speed_ratio_vector: -0.1,
        ts: T,
        ..SpeedSnapshot::default()
    };
    let to = T + 8 * HOUR_MS;
    let exact = amount(&speed, to).unwrap();
    let numeric = quadrature(T, to, 1_000, |at| rate(&speed, at).unwrap());
    assert!(close(exact, numeric, 1e-6), "{exact} vs {numeric}");
}

#[test]
fn amount_is_additive_across_a_split() {
    let mut rng = ChaCha20Rng::seed_from_u64(31337);
    for _ in 0..SEEDS {
        let speed = random_speed(&mut rng);
        let t1 = T + rng.gen_range(0..24 * HOUR_MS);
        let t2 = t1 + rng.gen_range(0..24 * HOUR_MS);
        let whole = amount(&speed, t2).unwrap();
        let first = amount(&speed, t1).unwrap();
        let rest = amount(&reset_at(&speed, t1).unwrap(), t2).unwrap();
        assert!(
            close(whole, first + rest, 1e-6),
            "{whole} != {first} + {rest}"
        );
    }
}

#[test]
fn revenue_refuses_bad_input() {
    let speed = SpeedSnapshot {
        generic_value: 10.0,
        limit: 100.0,
        ts: T,
        ..SpeedSnapshot::default()
    };
    let terms = AdTerms {
        ctr_base: 1.0,
        ctr_vector: 0.0,
        start_date: T / 1_000,
        cpc: 100.0,
    };
    assert!(matches!(
        project_revenue(&speed, &terms, T - 1),
        Err(ProjectionError::TimeReversed { .. })
    ));
    let nan = SpeedSnapshot {
        community_vector: f64::NAN,
        ..speed
    };
    assert!(matches!(
        project_revenue(&nan, &terms, T + HOUR_MS),
        Err(ProjectionError::NonFinite { .. })
    ));
    let ddos = SpeedSnapshot {
        ddos_value: 1.0,
        ..speed
    };
    assert!(matches!(
        amount(&ddos, T + HOUR_MS),
        Err(ProjectionError::Positive { .. })
    ));
    assert_eq!(amount(&speed, T).unwrap(), 0.0);
}
