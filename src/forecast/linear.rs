//! Ordinary least squares regression with an intercept.
//!
//! The feature columns are centered and admitted one at a time, in column
//! order, through a QR factorisation of the design matrix. A column that is
//! constant, or linearly dependent on the columns admitted before it, is
//! dropped and gets a zero coefficient, so rank-deficient inputs (such as
//! `hour` moving in lockstep with `t` inside a single day) still produce a
//! well-defined model.

use anyhow::{Context, Result, ensure};
use nalgebra::{DMatrix, DVector};

/// Diagonal of R, relative to the centered column's norm, below which a
/// column counts as dependent on the previous ones.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearRegression {
    /// Fits `y ≈ intercept + x · coefficients`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty, ragged, or not the same length as `y`.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        ensure!(!x.is_empty(), "cannot fit a linear model on zero samples");
        ensure!(
            x.len() == y.len(),
            "{} feature rows for {} targets",
            x.len(),
            y.len()
        );
        let width = x[0].len();
        ensure!(
            x.iter().all(|row| row.len() == width),
            "feature rows differ in width"
        );

        let n = x.len();
        let design = DMatrix::from_fn(n, width, |i, j| x[i][j]);
        let x_mean: Vec<f64> = design.column_iter().map(|c| c.mean()).collect();
        let targets = DVector::from_column_slice(y);
        let y_mean = targets.mean();
        let y_centered = targets.add_scalar(-y_mean);

        let (kept, columns) = independent_columns(&design, &x_mean);

        let mut coefficients = vec![0.0; width];
        if !columns.is_empty() {
            let qr = DMatrix::from_columns(&columns).qr();
            let qty = qr.q().transpose() * &y_centered;
            let b = qr
                .r()
                .solve_upper_triangular(&qty)
                .context("triangular factor of the design matrix is singular")?;
            for (&j, &bj) in kept.iter().zip(b.iter()) {
                coefficients[j] = bj;
            }
        }

        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Ok(LinearRegression {
            intercept,
            coefficients,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// One coefficient per input column; dropped columns read 0.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }
}

/// Centered columns of `design` that add rank, in column order, with their
/// original indices.
fn independent_columns(
    design: &DMatrix<f64>,
    x_mean: &[f64],
) -> (Vec<usize>, Vec<DVector<f64>>) {
    let mut kept = Vec::new();
    let mut columns: Vec<DVector<f64>> = Vec::new();

    for (j, column) in design.column_iter().enumerate() {
        // centered rank never exceeds the row count
        if columns.len() >= design.nrows() {
            break;
        }
        let raw_norm = column.norm();
        let centered = column.add_scalar(-x_mean[j]);
        let scale = centered.norm();
        if raw_norm == 0.0 || scale <= RANK_TOLERANCE * raw_norm {
            continue;
        }

        let mut candidate = columns.clone();
        candidate.push(centered);
        let r = DMatrix::from_columns(&candidate).qr().r();
        let last = candidate.len() - 1;
        if r[(last, last)].abs() <= RANK_TOLERANCE * scale {
            continue;
        }

        columns = candidate;
        kept.push(j);
    }

    (kept, columns)
}
