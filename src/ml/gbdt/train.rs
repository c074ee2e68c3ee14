use super::model::{GbdtRegressionModel, RegressionStump};
use crate::ml::{RegressionDataset, TrainError};

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone)]
pub struct BoostOptions {
    /// Maximum number of boosting rounds.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
}

impl Default for BoostOptions {
    fn default() -> Self {
        Self {
            rounds: 200,
            learning_rate: 0.15,
            bins: 32,
            min_samples_leaf: 10,
        }
    }
}

/// Train a squared-error stump-GBDT regressor.
///
/// Boosting stops early once no split satisfies the leaf-size floor or no
/// split reduces the residual error.
pub fn train_gbdt_regressor(
    dataset: &RegressionDataset,
    options: &BoostOptions,
) -> Result<GbdtRegressionModel, TrainError> {
    let d = dataset.validate()?;
    let n = dataset.len();
    let bins = options.bins.clamp(2, 256);
    let min_leaf = options.min_samples_leaf.max(1);

    let (mins, maxs) = compute_feature_min_max(&dataset.x, d);
    let binned = bin_features(&dataset.x, &mins, &maxs, bins);

    let init_value = (dataset.y.iter().map(|&v| v as f64).sum::<f64>() / n as f64) as f32;
    let mut predictions = vec![init_value; n];
    let mut residuals = vec![0.0f32; n];

    let mut stumps = Vec::with_capacity(options.rounds);
    for _round in 0..options.rounds {
        for i in 0..n {
            residuals[i] = dataset.y[i] - predictions[i];
        }
        let Some(stump) = fit_best_stump(&binned, &dataset.x, &mins, &maxs, bins, min_leaf, &residuals)
        else {
            break;
        };
        for (pred, row) in predictions.iter_mut().zip(&dataset.x) {
            *pred += options.learning_rate * stump.predict(row);
        }
        stumps.push(stump);
    }

    Ok(GbdtRegressionModel {
        model_version: 1,
        feature_len: d,
        learning_rate: options.learning_rate,
        init_value,
        stumps,
    })
}

fn compute_feature_min_max(x: &[Vec<f32>], feature_len: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mins = vec![f32::INFINITY; feature_len];
    let mut maxs = vec![f32::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }
    for j in 0..feature_len {
        if !mins[j].is_finite() || !maxs[j].is_finite() {
            mins[j] = 0.0;
            maxs[j] = 0.0;
        }
    }
    (mins, maxs)
}

/// Map each value to `floor(t * bins)` so bin `b` holds values below the edge of `b + 1`.
fn bin_features(x: &[Vec<f32>], mins: &[f32], maxs: &[f32], bins: usize) -> Vec<Vec<u8>> {
    let top = (bins - 1) as f32;
    x.iter()
        .map(|row| {
            mins.iter()
                .zip(maxs)
                .enumerate()
                .map(|(j, (&min, &max))| {
                    let v = row.get(j).copied().unwrap_or(0.0);
                    if max > min {
                        let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
                        (t * bins as f32).floor().min(top) as u8
                    } else {
                        0
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone)]
struct BestSplit {
    score: f64,
    feature_index: usize,
    split_bin: usize,
}

fn fit_best_stump(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    mins: &[f32],
    maxs: &[f32],
    bins: usize,
    min_leaf: usize,
    residuals: &[f32],
) -> Option<RegressionStump> {
    let total_sse = sse(residuals);
    let mut best: Option<BestSplit> = None;
    for feature_idx in 0..mins.len() {
        if maxs[feature_idx] <= mins[feature_idx] {
            continue;
        }
        if let Some(split) = best_split_for_feature(binned, residuals, feature_idx, bins, min_leaf)
            && best.as_ref().is_none_or(|b| split.score < b.score)
        {
            best = Some(split);
        }
    }
    let best = best?;
    if best.score >= total_sse {
        return None;
    }

    let feature_idx = best.feature_index;
    let threshold = split_threshold(binned, x, feature_idx, best.split_bin)?;
    let (left_value, right_value) = leaf_means_for_threshold(x, residuals, feature_idx, threshold);
    Some(RegressionStump {
        feature_index: feature_idx as u16,
        threshold,
        left_value,
        right_value,
    })
}

fn sse(values: &[f32]) -> f64 {
    let n = values.len().max(1) as f64;
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let sum_sq: f64 = values.iter().map(|&v| (v as f64) * (v as f64)).sum();
    sum_sq - sum * sum / n
}

fn best_split_for_feature(
    binned: &[Vec<u8>],
    residuals: &[f32],
    feature_idx: usize,
    bins: usize,
    min_leaf: usize,
) -> Option<BestSplit> {
    let mut counts = vec![0usize; bins];
    let mut sums = vec![0f64; bins];
    let mut sums_sq = vec![0f64; bins];
    for (i, row) in binned.iter().enumerate() {
        let b = row.get(feature_idx).copied().unwrap_or(0) as usize;
        let r = residuals[i] as f64;
        counts[b] += 1;
        sums[b] += r;
        sums_sq[b] += r * r;
    }
    let total_count: usize = counts.iter().sum();
    let total_sum: f64 = sums.iter().sum();
    let total_sum_sq: f64 = sums_sq.iter().sum();

    let mut best: Option<BestSplit> = None;
    let mut left_count = 0usize;
    let mut left_sum = 0f64;
    let mut left_sum_sq = 0f64;

    for split_bin in 0..(bins - 1) {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        left_sum_sq += sums_sq[split_bin];
        let right_count = total_count - left_count;
        if left_count < min_leaf || right_count < min_leaf {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - (left_sum * left_sum) / left_count as f64;
        let right_sse = right_sum_sq - (right_sum * right_sum) / right_count as f64;
        let score = left_sse + right_sse;
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(BestSplit {
                score,
                feature_index: feature_idx,
                split_bin,
            });
        }
    }
    best
}

/// Raw-value cut that sends exactly the rows in bins `0..=split_bin` left.
///
/// Binning is monotone, so every left value is strictly below every right
/// value; the cut sits halfway between the two groups.
fn split_threshold(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    feature_idx: usize,
    split_bin: usize,
) -> Option<f32> {
    let mut left_max = f32::NEG_INFINITY;
    let mut right_min = f32::INFINITY;
    for (bins_row, row) in binned.iter().zip(x) {
        let v = row.get(feature_idx).copied().unwrap_or(0.0);
        if (bins_row.get(feature_idx).copied().unwrap_or(0) as usize) <= split_bin {
            left_max = left_max.max(v);
        } else {
            right_min = right_min.min(v);
        }
    }
    if !left_max.is_finite() || !right_min.is_finite() || left_max >= right_min {
        return None;
    }
    let mid = left_max + (right_min - left_max) * 0.5;
    // Adjacent floats can round the midpoint up onto `right_min`.
    Some(if mid < right_min { mid } else { left_max })
}

fn leaf_means_for_threshold(
    x: &[Vec<f32>],
    residuals: &[f32],
    feature_idx: usize,
    threshold: f32,
) -> (f32, f32) {
    let mut left = (0.0f64, 0u32);
    let mut right = (0.0f64, 0u32);
    for (row, &r) in x.iter().zip(residuals) {
        let v = row.get(feature_idx).copied().unwrap_or(0.0);
        let side = if v <= threshold { &mut left } else { &mut right };
        side.0 += r as f64;
        side.1 += 1;
    }
    let mean = |(sum, count): (f64, u32)| {
        if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        }
    };
    (mean(left), mean(right))
}
