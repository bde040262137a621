//! Input collaborators: the ratings-file reader and the random allocation of
//! initial factor matrices.

use std::error::Error;
use std::path::Path;

use csv::ReaderBuilder;
use log::info;
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Read a delimited ratings file into a dense rating matrix.
///
/// Expected columns are row-id, column-id, rating, with a header row that is
/// skipped. The matrix shape is inferred as max id + 1 along each axis, cells
/// without a record stay 0 (the missing sentinel). Negative ratings are
/// rejected here so the factorizer never sees them.
pub fn load_ratings(path: &Path) -> Result<Array2<f64>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records: Vec<(usize, usize, f64)> = Vec::new();
    let mut max_row = 0usize;
    let mut max_col = 0usize;

    for result in reader.records() {
        let record = result?;
        let row: usize = field(&record, 0)?.parse()?;
        let col: usize = field(&record, 1)?.parse()?;
        let rating: f64 = field(&record, 2)?.parse()?;
        if rating < 0.0 {
            return Err(format!("negative rating {} at ({}, {})", rating, row, col).into());
        }
        max_row = max_row.max(row);
        max_col = max_col.max(col);
        records.push((row, col, rating));
    }

    if records.is_empty() {
        return Err("ratings file contains no records".into());
    }

    let mut matrix = Array2::<f64>::zeros((max_row + 1, max_col + 1));
    for (row, col, rating) in &records {
        matrix[[*row, *col]] = *rating;
    }

    info!(
        "loaded {} ratings into a {}x{} matrix",
        records.len(),
        max_row + 1,
        max_col + 1
    );
    Ok(matrix)
}

fn field<'a>(record: &'a csv::StringRecord, index: usize) -> Result<&'a str, Box<dyn Error>> {
    Ok(record
        .get(index)
        .ok_or_else(|| format!("record is missing column {}", index))?
        .trim())
}

/// Initial factor matrix with independent uniform values in [0, 1).
pub fn random_factors(rows: usize, rank: usize) -> Array2<f64> {
    Array2::random((rows, rank), Uniform::new(0.0, 1.0))
}

/// Seeded variant of [`random_factors`] for reproducible runs.
pub fn seeded_factors(rows: usize, rank: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::random_using((rows, rank), Uniform::new(0.0, 1.0), &mut rng)
}
