//! Evaluation metrics for regression models.

use serde::{Deserialize, Serialize};

/// Error summary for one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Coefficient of determination; `0.0` when the truth has no variance.
    pub r2: f64,
}

/// Compute MAE, RMSE and R² over aligned slices.
///
/// Extra elements in the longer slice are ignored. Empty input yields all zeros.
pub fn regression_metrics(truth: &[f32], predicted: &[f32]) -> RegressionMetrics {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return RegressionMetrics {
            mae: 0.0,
            rmse: 0.0,
            r2: 0.0,
        };
    }
    let truth = &truth[..n];
    let predicted = &predicted[..n];
    let mean = truth.iter().map(|&v| v as f64).sum::<f64>() / n as f64;

    let mut abs_sum = 0.0f64;
    let mut ss_res = 0.0f64;
    let mut ss_tot = 0.0f64;
    for (&t, &p) in truth.iter().zip(predicted) {
        let err = t as f64 - p as f64;
        abs_sum += err.abs();
        ss_res += err * err;
        let centered = t as f64 - mean;
        ss_tot += centered * centered;
    }
    let r2 = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };
    RegressionMetrics {
        mae: abs_sum / n as f64,
        rmse: (ss_res / n as f64).sqrt(),
        r2,
    }
}

/// Absolute Pearson correlation in `[0, 1]`.
///
/// Returns `0.0` when either series is constant or the input is empty.
pub fn pearson_abs(xs: &[f32], ys: &[f32]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let mut cov = 0.0f64;
    let mut var_x = 0.0f64;
    let mut var_y = 0.0f64;
    for (&x, &y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    let r = (cov / (var_x.sqrt() * var_y.sqrt())).abs();
    if r.is_finite() { r.min(1.0) } else { 0.0 }
}
