//! End-to-end tests for the factorization pipeline:
//! 1. Synthetic low-rank ratings with missing cells
//! 2. Gradient-descent refinement of seeded factors
//! 3. Reconstruction of observed and unobserved cells

use ndarray::Array2;
use sparse_mf::factorizer::{Factorizer, FactorizerConfig, PenaltyMode};
use sparse_mf::loader;

/// Per-iteration training-error logs show up under RUST_LOG=info.
fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Rank-1 ratings matrix with a fraction of cells blanked out to 0.
fn planted_rank_one(n_rows: usize, n_cols: usize) -> Array2<f64> {
    let mut ratings = Array2::zeros((n_rows, n_cols));
    for u in 0..n_rows {
        for i in 0..n_cols {
            // leave every third cell unobserved
            if (u + i) % 3 != 0 {
                ratings[[u, i]] = (u + 1) as f64 * (i + 1) as f64 * 0.5;
            }
        }
    }
    ratings
}

fn config(rank: usize, max_steps: usize, beta: f64) -> FactorizerConfig {
    FactorizerConfig {
        rank,
        max_steps,
        alpha: 0.005,
        beta,
        tolerance: 1e-3,
        penalty: PenaltyMode::PerObservation,
    }
}

#[test]
fn test_recovers_observed_cells() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    let factorizer = Factorizer::new(config(2, 3000, 0.0)).unwrap();

    let p0 = loader::seeded_factors(6, 2, 7);
    let q0 = loader::seeded_factors(5, 2, 11);
    let result = factorizer.factorize(&ratings, p0, q0).unwrap();

    let reconstruction = result.predict();
    for u in 0..6 {
        for i in 0..5 {
            let r = ratings[[u, i]];
            if r > 0.0 {
                assert!(
                    (reconstruction[[u, i]] - r).abs() < 0.5,
                    "cell ({}, {}): expected ~{}, got {}",
                    u,
                    i,
                    r,
                    reconstruction[[u, i]]
                );
            }
        }
    }
}

#[test]
fn test_imputes_unobserved_cells() {
    init_logs();
    // The planted structure is exactly rank 1, so a converged model should
    // place the blanked cells near their planted values too.
    let ratings = planted_rank_one(6, 5);
    let factorizer = Factorizer::new(config(2, 3000, 0.0)).unwrap();

    let result = factorizer
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 7),
            loader::seeded_factors(5, 2, 11),
        )
        .unwrap();

    let reconstruction = result.predict();
    for u in 0..6 {
        for i in 0..5 {
            if ratings[[u, i]] == 0.0 {
                let planted = (u + 1) as f64 * (i + 1) as f64 * 0.5;
                assert!(
                    (reconstruction[[u, i]] - planted).abs() < planted.max(1.0),
                    "imputed cell ({}, {}) far off: planted {}, got {}",
                    u,
                    i,
                    planted,
                    reconstruction[[u, i]]
                );
            }
        }
    }
}

#[test]
fn test_run_is_deterministic_with_seeded_factors() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    let factorizer = Factorizer::new(config(2, 500, 0.02)).unwrap();

    let first = factorizer
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 42),
            loader::seeded_factors(5, 2, 43),
        )
        .unwrap();
    let second = factorizer
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 42),
            loader::seeded_factors(5, 2, 43),
        )
        .unwrap();

    assert_eq!(first.p, second.p);
    assert_eq!(first.q, second.q);
    assert_eq!(first.error_history, second.error_history);
}

#[test]
fn test_error_trend_is_downward_overall() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    let factorizer = Factorizer::new(config(2, 1000, 0.0)).unwrap();

    let result = factorizer
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 1),
            loader::seeded_factors(5, 2, 2),
        )
        .unwrap();

    let history = &result.error_history;
    assert!(history.len() > 10);
    assert!(history.last().unwrap() < &history[0]);
    // downward at coarse checkpoints, not necessarily every single step
    let quarter = history.len() / 4;
    assert!(history[2 * quarter] < history[quarter]);
    assert!(history[3 * quarter] < history[2 * quarter]);
}

#[test]
fn test_regularization_shrinks_converged_factors() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    let frobenius = |m: &Array2<f64>| m.iter().map(|v| v * v).sum::<f64>().sqrt();

    let run = |beta: f64| {
        Factorizer::new(config(2, 800, beta))
            .unwrap()
            .factorize(
                &ratings,
                loader::seeded_factors(6, 2, 5),
                loader::seeded_factors(5, 2, 6),
            )
            .unwrap()
    };

    let plain = run(0.0);
    let regularized = run(0.3);
    assert!(
        frobenius(&regularized.p) + frobenius(&regularized.q)
            < frobenius(&plain.p) + frobenius(&plain.q)
    );
}

#[test]
fn test_step_limit_reported_as_outcome_not_error() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    // Far too few steps to converge
    let factorizer = Factorizer::new(config(2, 3, 0.0)).unwrap();

    let result = factorizer
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 9),
            loader::seeded_factors(5, 2, 10),
        )
        .unwrap();

    assert!(!result.converged);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.error_history.len(), 3);
}

#[test]
fn test_divergence_is_observable_not_raised() {
    init_logs();
    let ratings = planted_rank_one(6, 5);
    // Excessive learning rate, the loop must still complete and report the
    // blown-up error instead of failing.
    let diverging = FactorizerConfig {
        rank: 2,
        max_steps: 50,
        alpha: 5.0,
        beta: 0.0,
        tolerance: 1e-3,
        penalty: PenaltyMode::PerObservation,
    };
    let result = Factorizer::new(diverging)
        .unwrap()
        .factorize(
            &ratings,
            loader::seeded_factors(6, 2, 3),
            loader::seeded_factors(5, 2, 4),
        )
        .unwrap();

    assert!(result.training_error > 1e3 || !result.training_error.is_finite());
}
