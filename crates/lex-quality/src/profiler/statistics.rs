//! Numeric helpers shared by the analyzers.
//!
//! All functions take plain slices and return `None` (or a documented
//! sentinel) for degenerate input instead of producing NaN.

/// Arithmetic mean, `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Needs at least two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Sort a copy of `values` ascending. Input is expected to be NaN-free.
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile by linear interpolation between closest ranks, rank `(n - 1) * p`.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

pub(crate) fn median_sorted(sorted: &[f64]) -> Option<f64> {
    quantile_sorted(sorted, 0.5)
}

/// Median absolute deviation around `median` (unscaled).
pub(crate) fn median_absolute_deviation(values: &[f64], median: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    median_sorted(&sorted(&deviations))
}

/// Central moments m2, m3, m4 (population, 1/n).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Moments {
    pub m2: f64,
    pub m3: f64,
    pub m4: f64,
}

impl Moments {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let n = values.len() as f64;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for v in values {
            let d = v - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        Some(Self {
            m2: m2 / n,
            m3: m3 / n,
            m4: m4 / n,
        })
    }

    /// Biased skewness g1. Zero when the variance is zero.
    pub fn skewness(&self) -> f64 {
        if self.m2 <= f64::EPSILON {
            0.0
        } else {
            self.m3 / self.m2.powf(1.5)
        }
    }

    /// Excess kurtosis g2. Zero when the variance is zero.
    pub fn excess_kurtosis(&self) -> f64 {
        if self.m2 <= f64::EPSILON {
            0.0
        } else {
            self.m4 / (self.m2 * self.m2) - 3.0
        }
    }
}

/// Pearson correlation. `None` when either side has zero variance or the
/// inputs are shorter than two values.
pub(crate) fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Shannon entropy in bits of a frequency table.
///
/// Counts are summed in ascending order so the result does not depend on
/// the iteration order of the table they came from.
pub(crate) fn shannon_entropy(counts: &mut [usize]) -> f64 {
    counts.sort_unstable();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
