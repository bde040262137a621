//! Low-rank approximation of a partially observed rating matrix: a loader
//! builds the dense rating matrix and random factors, the factorizer refines
//! the pair by gradient descent, and the product predicts the missing cells.

pub mod config;
pub mod factorizer;
pub mod loader;

use std::error::Error;

use log::info;

use config::Config;
use factorizer::{Factorization, Factorizer};

/// Driver chain: load the ratings, allocate random factors, run the
/// factorizer, hand the refined pair to the consumer. No state survives
/// outside this call.
pub fn run(config: &Config) -> Result<Factorization, Box<dyn Error>> {
    let ratings = loader::load_ratings(config.get_ratings_path())?;
    let (n_rows, n_cols) = ratings.dim();
    let observed = ratings.iter().filter(|&&r| r > 0.0).count();
    info!(
        "rating matrix: {} rows x {} cols, {} observed cells",
        n_rows, n_cols, observed
    );

    let p0 = loader::random_factors(n_rows, config.get_rank());
    let q0 = loader::random_factors(n_cols, config.get_rank());

    let factorizer = Factorizer::new(config.factorizer_config())?;
    let result = factorizer.factorize(&ratings, p0, q0)?;

    if result.converged {
        info!(
            "converged after {} iterations, training error {:.6}",
            result.iterations, result.training_error
        );
    } else {
        info!(
            "stopped at the step limit ({} iterations) with training error {:.6}",
            result.iterations, result.training_error
        );
    }

    Ok(result)
}
