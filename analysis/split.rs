//! # Stratified Train/Test Splitting
//!
//! Deterministic, seeded partition of a [`Dataset`] into train and test
//! sides. Record indices are grouped by outcome, shuffled within each group
//! by a `ChaCha8` generator, and allotted per group so both sides preserve
//! the dataset's outcome ratio. The same `(dataset, fraction, seed)` triple
//! always reproduces the identical partition.

use crate::data::Dataset;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Controls for [`stratified_split`].
#[derive(Debug, Clone, Copy)]
pub struct SplitConfig {
    /// Fraction of each outcome group assigned to the train side.
    /// Must lie strictly between 0 and 1.
    pub train_fraction: f64,
    /// Shuffle seed. Equal seeds reproduce equal partitions.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            train_fraction: 0.7,
            seed: 42,
        }
    }
}

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("The train fraction must lie strictly between 0 and 1, got {0}.")]
    InvalidProportion(f64),
    #[error("Cannot split an empty dataset.")]
    EmptyDataset,
}

/// A partition of a dataset into train and test sides, along with the
/// original record indices each side was drawn from.
#[derive(Debug)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Partitions `dataset` so each outcome group contributes
/// `round(train_fraction * group_size)` records to the train side and the
/// remainder to the test side.
///
/// Indices are re-sorted after the shuffle, so both sides keep dataset
/// order. Stratification bounds the outcome-ratio drift between each side
/// and the full dataset to the per-group rounding error.
pub fn stratified_split(dataset: &Dataset, config: &SplitConfig) -> Result<Split, SplitError> {
    if !(config.train_fraction > 0.0 && config.train_fraction < 1.0) {
        return Err(SplitError::InvalidProportion(config.train_fraction));
    }
    if dataset.n_records() == 0 {
        return Err(SplitError::EmptyDataset);
    }

    // Group record indices by outcome. Labels are validated 0/1 upstream.
    let mut groups: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (idx, &label) in dataset.labels().iter().enumerate() {
        groups[label.round() as usize].push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();
    for group in &mut groups {
        group.shuffle(&mut rng);
        let n_train = (config.train_fraction * group.len() as f64).round() as usize;
        train_indices.extend_from_slice(&group[..n_train]);
        test_indices.extend_from_slice(&group[n_train..]);
    }
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    log::debug!(
        "stratified split: {} train / {} test records (seed {})",
        train_indices.len(),
        test_indices.len(),
        config.seed
    );

    Ok(Split {
        train: dataset.subset(&train_indices),
        test: dataset.subset(&test_indices),
        train_indices,
        test_indices,
    })
}
