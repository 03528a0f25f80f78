//! Seeded train/test split, stratified on low-cardinality targets.

use crate::error::{PipelineError, Result};
use crate::io::has_column;
use polars::prelude::*;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use std::collections::BTreeMap;

pub const DEFAULT_TEST_SIZE: f64 = 0.20;
pub const DEFAULT_SEED: u64 = 42;
/// Targets with at most this many distinct values are split stratified.
pub const DEFAULT_STRATIFY_MAX_CLASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    pub test_size: f64,
    pub seed: u64,
    pub stratify_max_classes: usize,
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            stratify_max_classes: DEFAULT_STRATIFY_MAX_CLASSES,
        }
    }
}

/// Row partitions of one table.
#[derive(Debug, Clone)]
pub struct SplitParts {
    pub train_x: DataFrame,
    pub test_x: DataFrame,
    pub train_y: Series,
    pub test_y: Series,
    pub stratified: bool,
    /// Source row positions, kept for diagnostics and tests
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
}

impl SplitParts {
    /// Reassemble `(train, test)` frames with the target as the last column.
    pub fn into_frames(self) -> Result<(DataFrame, DataFrame)> {
        let mut train = self.train_x;
        train.with_column(self.train_y)?;
        let mut test = self.test_x;
        test.with_column(self.test_y)?;
        Ok((train, test))
    }
}

impl Splitter {
    /// Number of test rows for `n` input rows (rounded up, as scikit-learn does).
    pub fn test_count(&self, n: usize) -> usize {
        (self.test_size * n as f64).ceil() as usize
    }

    /// Partition `table` into train and test rows on `target`.
    ///
    /// # Errors
    ///
    /// Validation error if `target` is missing, if either partition would be
    /// empty, or if a stratified split is impossible (a class with fewer than
    /// two rows, or fewer test/train rows than classes).
    pub fn split(&self, table: &DataFrame, target: &str) -> Result<SplitParts> {
        if !has_column(table, target) {
            return Err(PipelineError::Validation(format!(
                "Target column '{target}' not found in table to split"
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Validation(format!(
                "test_size must be between 0 and 1, got {}",
                self.test_size
            )));
        }

        let n = table.height();
        let n_test = self.test_count(n);
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(PipelineError::Validation(format!(
                "Cannot split {n} rows with test_size {}: one partition would be empty",
                self.test_size
            )));
        }

        let target_series = table.column(target)?.as_materialized_series().clone();
        let strata = strata_of(&target_series)?;
        let distinct = strata.keys().filter(|k| k.is_some()).count();
        let stratified = distinct <= self.stratify_max_classes;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let (train_rows, test_rows) = if stratified {
            stratified_rows(strata, n, n_test, &mut rng)?
        } else {
            let mut rows: Vec<usize> = (0..n).collect();
            rows.shuffle(&mut rng);
            let train = rows.split_off(n_test);
            (train, rows)
        };

        tracing::debug!(
            stratified,
            classes = distinct,
            train = train_rows.len(),
            test = test_rows.len(),
            "Split rows"
        );

        let train_idx = to_idx(&train_rows);
        let test_idx = to_idx(&test_rows);
        let features = table.drop(target)?;

        Ok(SplitParts {
            train_x: features.take(&train_idx)?,
            test_x: features.take(&test_idx)?,
            train_y: target_series.take(&train_idx)?,
            test_y: target_series.take(&test_idx)?,
            stratified,
            train_rows,
            test_rows,
        })
    }
}

/// Row positions grouped by target value; missing values form their own group.
fn strata_of(target: &Series) -> Result<BTreeMap<Option<String>, Vec<usize>>> {
    let as_text = target.cast(&DataType::String)?;
    let mut strata: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
    for (row, value) in as_text.str()?.into_iter().enumerate() {
        strata
            .entry(value.map(str::to_owned))
            .or_default()
            .push(row);
    }
    Ok(strata)
}

fn stratified_rows(
    strata: BTreeMap<Option<String>, Vec<usize>>,
    n: usize,
    n_test: usize,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_train = n - n_test;
    let n_classes = strata.len();

    if let Some((class, rows)) = strata.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::Validation(format!(
            "The least populated target class {} has only {} member(s); stratification needs at least 2",
            class.as_deref().unwrap_or("<missing>"),
            rows.len()
        )));
    }
    if n_test < n_classes || n_train < n_classes {
        return Err(PipelineError::Validation(format!(
            "Stratified split of {n} rows needs at least {n_classes} rows in each partition \
             (train {n_train}, test {n_test})"
        )));
    }

    let quotas = allocate_test_quotas(strata.values().map(Vec::len), n, n_test);

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, quota) in strata.into_values().zip(quotas) {
        rows.shuffle(rng);
        let rest = rows.split_off(quota);
        test.extend(rows);
        train.extend(rest);
    }

    train.shuffle(rng);
    test.shuffle(rng);
    Ok((train, test))
}

/// Largest-remainder allocation of `n_test` rows proportional to class sizes.
/// Each quota is the floor or the ceiling of the class's exact share.
fn allocate_test_quotas(sizes: impl Iterator<Item = usize>, n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = sizes
        .map(|size| size as f64 * n_test as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = quotas.iter().sum();
    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for &class in order.iter().take(n_test.saturating_sub(assigned)) {
        quotas[class] += 1;
    }
    quotas
}

fn to_idx(rows: &[usize]) -> IdxCa {
    IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&r| r as IdxSize).collect(),
    )
}
