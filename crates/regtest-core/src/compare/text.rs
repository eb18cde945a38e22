//! Whitespace-delimited numeric tables

use std::{
    fs,
    io,
    path::Path,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("could not convert '{token}' to float on line {line}")]
    Parse { line: usize, token: String },
    #[error("wrong number of columns on line {line}: expected {expected}, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// A table of floats with the dimensions the row/column layout implies:
/// a single row or a single column collapses to one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl NumericTable {
    /// Parse rows of whitespace-separated numbers. Text after `#` and
    /// blank lines are ignored.
    pub fn parse(content: &str) -> Result<Self, TableError> {
        let mut values = Vec::new();
        let mut rows = 0;
        let mut cols = None;
        for (idx, line) in content.lines().enumerate() {
            let data = line.split('#').next().unwrap_or("");
            let mut found = 0;
            for token in data.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| TableError::Parse {
                    line: idx + 1,
                    token: token.to_string(),
                })?;
                values.push(value);
                found += 1;
            }
            if found == 0 {
                continue;
            }
            match cols {
                None => cols = Some(found),
                Some(expected) if expected != found => {
                    return Err(TableError::Ragged {
                        line: idx + 1,
                        expected,
                        found,
                    });
                },
                Some(_) => {},
            }
            rows += 1;
        }
        let shape = match (rows, cols.unwrap_or(0)) {
            (0, _) => vec![0],
            (1, 1) => Vec::new(),
            (1, cols) => vec![cols],
            (rows, 1) => vec![rows],
            (rows, cols) => vec![rows, cols],
        };
        Ok(Self { shape, values })
    }

    pub fn read(path: &Path) -> Result<Self, TableError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Largest element-wise absolute difference, `None` if the shapes differ.
    ///
    /// Positions where both values are NaN agree; a NaN on one side only
    /// makes the result NaN.
    pub fn max_abs_diff(
        &self,
        other: &NumericTable,
    ) -> Option<f64> {
        if self.shape != other.shape {
            return None;
        }
        let mut max = 0.0_f64;
        for (a, b) in self.values.iter().zip(&other.values) {
            if a.is_nan() && b.is_nan() {
                continue;
            }
            let diff = (a - b).abs();
            if diff.is_nan() {
                return Some(f64::NAN);
            }
            max = max.max(diff);
        }
        Some(max)
    }
}

/// Compare two tables within `tolerance`; `true` when they agree.
pub fn compare_text(
    result: &Path,
    expect: &Path,
    tolerance: f64,
) -> bool {
    tracing::info!("Comparing TEXT: {} <--> {}", result.display(), expect.display());
    if !result.is_file() {
        tracing::error!("Result file is missing: {}", result.display());
        return false;
    }
    if !expect.is_file() {
        tracing::error!("Reference file is missing: {}", expect.display());
        return false;
    }
    let (a, b) = match (NumericTable::read(result), NumericTable::read(expect)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(err), _) | (_, Err(err)) => {
            tracing::error!("Error reading TEXT files: {}", err);
            return false;
        },
    };
    let Some(err) = a.max_abs_diff(&b) else {
        tracing::error!("Data compare: data shapes are different.");
        return false;
    };
    if err.is_nan() || err > tolerance {
        tracing::debug!(
            "Error is greater than expect. Expected: {:.4e}. Test: {:.4e}.",
            tolerance,
            err
        );
        return false;
    }
    tracing::info!("Comparing TEXT done.");
    true
}
