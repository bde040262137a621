//! Positional command-line arguments for the binary.

use std::path::PathBuf;

use crate::factorizer::{FactorizerConfig, PenaltyMode};

/// Command-line configuration for one factorization run.
pub struct Config {
    // path to the delimited ratings file
    ratings_path: PathBuf,
    // latent rank
    rank: usize,
    // maximum outer iterations
    steps: usize,
    // learning rate
    alpha: f64,
    // regularization weight
    beta: f64,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/ratings.csv 100 5000 0.0002 0.02
    /// ```
    pub fn new(
        mut args: impl Iterator<Item = String>,
    ) -> Result<Config, Box<dyn std::error::Error>> {
        // args:
        // 0: program name
        // 1: ratings path
        // 2: rank K
        // 3: steps
        // 4: alpha
        // 5: beta
        args.next();
        let ratings_path = PathBuf::from(args.next().ok_or("missing ratings path")?);
        let rank = args.next().ok_or("missing rank")?.parse::<usize>()?;
        let steps = args.next().ok_or("missing steps")?.parse::<usize>()?;
        let alpha = args.next().ok_or("missing alpha")?.parse::<f64>()?;
        let beta = args.next().ok_or("missing beta")?.parse::<f64>()?;

        Ok(Config {
            ratings_path,
            rank,
            steps,
            alpha,
            beta,
        })
    }

    pub fn get_ratings_path(&self) -> &PathBuf {
        &self.ratings_path
    }

    pub fn get_rank(&self) -> usize {
        self.rank
    }

    pub fn get_steps(&self) -> usize {
        self.steps
    }

    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    pub fn get_beta(&self) -> f64 {
        self.beta
    }

    /// Hyperparameters in the form the factorizer takes them.
    pub fn factorizer_config(&self) -> FactorizerConfig {
        FactorizerConfig {
            rank: self.rank,
            max_steps: self.steps,
            alpha: self.alpha,
            beta: self.beta,
            tolerance: 1e-3,
            penalty: PenaltyMode::PerObservation,
        }
    }
}
