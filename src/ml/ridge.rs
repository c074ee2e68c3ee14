//! Closed-form ridge regression on standardised features.
//!
//! Used as the linear pipeline in cross-validation. Columns with zero
//! variance are kept but contribute nothing.

use serde::{Deserialize, Serialize};

use super::{RegressionDataset, TrainError};

/// Fitted linear model in original feature units via stored scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl RidgeModel {
    /// Predict the target for a feature vector.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut sum = self.intercept;
        for (j, &w) in self.weights.iter().enumerate() {
            let v = features.get(j).copied().unwrap_or(0.0) as f64;
            sum += w * (v - self.means[j]) / self.scales[j];
        }
        sum as f32
    }
}

/// Fit `y ≈ intercept + Σ wⱼ·zⱼ` where `zⱼ` are z-scored columns, penalising `l2·‖w‖²`.
pub fn train_ridge(dataset: &RegressionDataset, l2: f64) -> Result<RidgeModel, TrainError> {
    let d = dataset.validate()?;
    let n = dataset.len() as f64;

    let mut means = vec![0.0f64; d];
    for row in &dataset.x {
        for (j, &v) in row.iter().enumerate() {
            means[j] += v as f64;
        }
    }
    for m in &mut means {
        *m /= n;
    }
    let mut scales = vec![0.0f64; d];
    for row in &dataset.x {
        for (j, &v) in row.iter().enumerate() {
            let diff = v as f64 - means[j];
            scales[j] += diff * diff;
        }
    }
    for s in &mut scales {
        *s = (*s / n).sqrt();
        if *s == 0.0 || !s.is_finite() {
            *s = 1.0;
        }
    }
    let y_mean = dataset.y.iter().map(|&v| v as f64).sum::<f64>() / n;

    // Normal equations (ZᵀZ + λI) w = Zᵀ(y − ȳ).
    let mut gram = vec![vec![0.0f64; d]; d];
    let mut rhs = vec![0.0f64; d];
    let mut z = vec![0.0f64; d];
    for (row, &label) in dataset.x.iter().zip(&dataset.y) {
        for j in 0..d {
            z[j] = (row[j] as f64 - means[j]) / scales[j];
        }
        let target = label as f64 - y_mean;
        for a in 0..d {
            rhs[a] += z[a] * target;
            for b in 0..d {
                gram[a][b] += z[a] * z[b];
            }
        }
    }
    for (a, row) in gram.iter_mut().enumerate() {
        row[a] += l2.max(0.0);
    }
    let weights = solve(gram, rhs)?;

    Ok(RidgeModel {
        means,
        scales,
        weights,
        intercept: y_mean,
    })
}

/// Gaussian elimination with partial pivoting.
///
/// Zero-variance columns leave an all-zero row and column; those weights are
/// pinned to zero instead of failing.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, TrainError> {
    const EPS: f64 = 1e-12;
    let n = b.len();
    let mut pinned = vec![false; n];
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < EPS {
            let column_empty = (0..n).all(|i| a[i][col].abs() < EPS);
            if column_empty && b[col].abs() < EPS {
                pinned[col] = true;
                continue;
            }
            return Err(TrainError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for col in (0..n).rev() {
        if pinned[col] {
            continue;
        }
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }
    Ok(x)
}
