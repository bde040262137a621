//! Gradient-descent factorization of a sparse rating matrix into a dense
//! low-rank factor pair, with the sequential per-cell update order and the
//! per-observation L2 penalty accounting of the reference procedure.

use log::{info, trace};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// How the L2 penalty enters the training error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyMode {
    /// Reference behavior: the penalty for a factor row/column is added once
    /// per observed cell it participates in, so heavily rated rows are
    /// penalized repeatedly in the reported loss.
    PerObservation,
    /// Single Frobenius-norm penalty `(beta/2) * (|P|^2 + |Q|^2)`.
    /// Only the loss accounting changes; the gradient step is identical.
    Global,
}

/// Hyperparameters for one factorization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorizerConfig {
    /// Latent rank K
    pub rank: usize,
    /// Maximum number of outer iterations
    pub max_steps: usize,
    /// Learning rate
    pub alpha: f64,
    /// L2 regularization weight, 0 disables the penalty
    pub beta: f64,
    /// Early-stop threshold on the training error
    pub tolerance: f64,
    pub penalty: PenaltyMode,
}

impl Default for FactorizerConfig {
    fn default() -> Self {
        Self {
            rank: 2,
            max_steps: 5000,
            alpha: 0.0002,
            beta: 0.0,
            tolerance: 1e-3,
            penalty: PenaltyMode::PerObservation,
        }
    }
}

impl FactorizerConfig {
    pub fn validate(&self) -> Result<(), FactorizeError> {
        if self.rank == 0 {
            return Err(FactorizeError::InvalidConfig(
                "rank must be at least 1".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(FactorizeError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if !(self.alpha > 0.0) {
            return Err(FactorizeError::InvalidConfig(format!(
                "alpha must be positive, got {}",
                self.alpha
            )));
        }
        if !(self.beta >= 0.0) {
            return Err(FactorizeError::InvalidConfig(format!(
                "beta must be non-negative, got {}",
                self.beta
            )));
        }
        if !self.tolerance.is_finite() {
            return Err(FactorizeError::InvalidConfig(format!(
                "tolerance must be finite, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a factorization run.
///
/// `p` keeps the caller's (U x K) orientation and `q` is handed back as
/// (I x K), already transposed out of the internal (K x I) layout.
#[derive(Debug, Clone)]
pub struct Factorization {
    pub p: Array2<f64>,
    pub q: Array2<f64>,
    /// Training error after the last completed iteration
    pub training_error: f64,
    /// Number of outer iterations actually run
    pub iterations: usize,
    /// Whether the error dropped below the tolerance before `max_steps`
    pub converged: bool,
    /// Training error after each outer iteration, in order
    pub error_history: Vec<f64>,
}

impl Factorization {
    /// Full dense reconstruction `P * Q^T`, including predictions for cells
    /// that were unobserved in the input.
    pub fn predict(&self) -> Array2<f64> {
        self.p.dot(&self.q.t())
    }

    /// Predicted rating for a single (row, column) cell.
    pub fn predict_entry(&self, row: usize, col: usize) -> f64 {
        self.p.row(row).dot(&self.q.row(col))
    }
}

/// Gradient-descent factorizer for a sparse rating matrix.
///
/// Entries equal to zero are treated as unobserved and contribute nothing to
/// the gradient or the training error. The update order is the contract:
/// observed cells are visited row-major, the P row is rewritten first, and
/// the Q column update reads the freshly written P row. Reorderings change
/// the numerical trajectory and are not equivalent.
pub struct Factorizer {
    config: FactorizerConfig,
}

impl Factorizer {
    pub fn new(config: FactorizerConfig) -> Result<Self, FactorizeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default hyperparameters at the given rank.
    pub fn with_rank(rank: usize) -> Result<Self, FactorizeError> {
        Self::new(FactorizerConfig {
            rank,
            ..FactorizerConfig::default()
        })
    }

    pub fn config(&self) -> &FactorizerConfig {
        &self.config
    }

    /// Refine the factor pair (p, q) against the observed cells of `ratings`.
    ///
    /// `ratings` is (U x I) and read-only, `p` is (U x K), `q` is (I x K).
    /// Ownership of the factors is taken, they are refined in place and
    /// returned inside the [`Factorization`]. Runs until the training error
    /// drops below the tolerance or `max_steps` iterations are exhausted;
    /// exhaustion is reported through `converged`, not as an error.
    /// Divergence under an excessive alpha shows up as a growing or
    /// non-finite training error and is likewise not raised.
    pub fn factorize(
        &self,
        ratings: &Array2<f64>,
        p: Array2<f64>,
        q: Array2<f64>,
    ) -> Result<Factorization, FactorizeError> {
        let (n_rows, n_cols) = ratings.dim();
        let k = self.config.rank;
        Self::check_shape("P", p.dim(), (n_rows, k))?;
        Self::check_shape("Q", q.dim(), (n_cols, k))?;

        let mut p = p;
        // (I x K) -> (K x I) for the duration of the loop
        let mut qt = q.reversed_axes();

        let alpha = self.config.alpha;
        let beta = self.config.beta;

        let mut error_history = Vec::new();
        let mut converged = false;
        let mut iterations = 0;

        for step in 0..self.config.max_steps {
            for u in 0..n_rows {
                trace!("step {}: sweeping row {}", step, u);
                for i in 0..n_cols {
                    let rating = ratings[[u, i]];
                    if rating <= 0.0 {
                        continue;
                    }
                    let eij = rating - p.row(u).dot(&qt.column(i));
                    // The whole P row first. Each entry only depends on its
                    // own previous value, so writing in place matches a
                    // vectorized update of the row.
                    for f in 0..k {
                        p[[u, f]] += alpha * (2.0 * eij * qt[[f, i]] - beta * p[[u, f]]);
                    }
                    // Then the Q column, reading the P row as just rewritten.
                    for f in 0..k {
                        qt[[f, i]] += alpha * (2.0 * eij * p[[u, f]] - beta * qt[[f, i]]);
                    }
                }
            }

            let e = self.training_error(ratings, &p, &qt);
            iterations = step + 1;
            info!("iteration {}: training error {:.6}", step, e);
            error_history.push(e);

            if e < self.config.tolerance {
                converged = true;
                break;
            }
        }

        let training_error = *error_history
            .last()
            .ok_or_else(|| FactorizeError::InvalidConfig("max_steps must be at least 1".into()))?;

        Ok(Factorization {
            p,
            q: qt.reversed_axes(),
            training_error,
            iterations,
            converged,
            error_history,
        })
    }

    /// Total squared residual over observed cells plus the L2 penalty.
    fn training_error(&self, ratings: &Array2<f64>, p: &Array2<f64>, qt: &Array2<f64>) -> f64 {
        let (n_rows, n_cols) = ratings.dim();
        let k = self.config.rank;
        let beta = self.config.beta;

        let mut e = 0.0;
        for u in 0..n_rows {
            for i in 0..n_cols {
                if ratings[[u, i]] <= 0.0 {
                    continue;
                }
                let residual = ratings[[u, i]] - p.row(u).dot(&qt.column(i));
                e += residual * residual;
                if self.config.penalty == PenaltyMode::PerObservation {
                    for f in 0..k {
                        e += (beta / 2.0) * (p[[u, f]].powi(2) + qt[[f, i]].powi(2));
                    }
                }
            }
        }
        if self.config.penalty == PenaltyMode::Global {
            let norms: f64 =
                p.iter().map(|v| v * v).sum::<f64>() + qt.iter().map(|v| v * v).sum::<f64>();
            e += (beta / 2.0) * norms;
        }
        e
    }

    fn check_shape(
        name: &'static str,
        found: (usize, usize),
        expected: (usize, usize),
    ) -> Result<(), FactorizeError> {
        if found != expected {
            return Err(FactorizeError::ShapeMismatch {
                matrix: name,
                expected,
                found,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactorizeError {
    InvalidConfig(String),
    ShapeMismatch {
        matrix: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

impl fmt::Display for FactorizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorizeError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            FactorizeError::ShapeMismatch {
                matrix,
                expected,
                found,
            } => write!(
                f,
                "Shape mismatch: {} expected {}x{}, got {}x{}",
                matrix, expected.0, expected.1, found.0, found.1
            ),
        }
    }
}

impl Error for FactorizeError {}
