//! D'Agostino-Pearson K² omnibus normality test.
//!
//! Combines a skewness z-score and a kurtosis z-score; `K² = Zs² + Zk²` is
//! chi-squared with two degrees of freedom, so `p = exp(-K² / 2)`.

use crate::profiler::statistics::Moments;
use serde::{Deserialize, Serialize};

/// Smallest sample the skewness transform is defined for.
pub const MIN_TEST_SAMPLES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    /// K² statistic.
    pub statistic: f64,
    pub p_value: f64,
    pub skewness_z: f64,
    pub kurtosis_z: f64,
}

/// Run the test. `None` for samples that are too small, have zero variance
/// or hit a degenerate kurtosis transform.
pub fn dagostino_pearson(values: &[f64]) -> Option<NormalityTest> {
    if values.len() < MIN_TEST_SAMPLES {
        return None;
    }
    let moments = Moments::from_values(values)?;
    if moments.m2 <= f64::EPSILON {
        return None;
    }
    let n = values.len() as f64;

    let skewness_z = skewness_z(moments.skewness(), n);
    let kurtosis_z = kurtosis_z(moments.m4 / (moments.m2 * moments.m2), n)?;
    let statistic = skewness_z * skewness_z + kurtosis_z * kurtosis_z;
    if !statistic.is_finite() {
        return None;
    }

    Some(NormalityTest {
        statistic,
        p_value: (-statistic / 2.0).exp().clamp(0.0, 1.0),
        skewness_z,
        kurtosis_z,
    })
}

/// Transform sample skewness `b1` into an approximately standard normal z.
fn skewness_z(b1: f64, n: f64) -> f64 {
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha).asinh()
}

/// Transform sample kurtosis `b2` (non-excess) into an approximately
/// standard normal z (Anscombe-Glynn).
fn kurtosis_z(b2: f64, n: f64) -> Option<f64> {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / variance.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return None;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    let z = (term1 - term2) / (2.0 / (9.0 * a)).sqrt();
    z.is_finite().then_some(z)
}
