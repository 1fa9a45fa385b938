//! Link functions, draws and interval sampling shared by the behavioral models.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Standard logistic transform `exp(z) / (1 + exp(z))`.
///
/// Evaluated in the overflow-safe form so very large calibrated
/// intercepts never produce NaN.
pub fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Two-outcome multinomial logit against a shared reference category:
/// `p_k = exp(z_k) / (1 + exp(z_a) + exp(z_b))`.
pub fn multinomial(z_a: f64, z_b: f64) -> (f64, f64) {
    let m = z_a.max(z_b).max(0.0);
    let e0 = (-m).exp();
    let ea = (z_a - m).exp();
    let eb = (z_b - m).exp();
    let denom = e0 + ea + eb;
    (ea / denom, eb / denom)
}

/// How a linear predictor is turned into a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Link {
    Logistic,
    /// Plain exponential; only sensible for strongly negative predictors.
    Exp,
}

impl Link {
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Link::Logistic => logistic(z),
            Link::Exp => z.exp(),
        }
    }
}

/// Parameters of a normally distributed coefficient, drawn per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParam {
    pub mean: f64,
    pub sd: f64,
}

impl NormalParam {
    pub const fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.sd.is_finite() && self.sd >= 0.0
    }

    /// Draw one value. Invalid parameters degrade to the mean (tables are
    /// validated on load, so this only guards hand-built values).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match Normal::new(self.mean, self.sd) {
            Ok(normal) => normal.sample(rng),
            Err(_) => self.mean,
        }
    }
}

/// Single uniform draw against a probability.
pub fn bernoulli<R: Rng>(rng: &mut R, p: f64) -> bool {
    let roll: f64 = rng.random();
    roll < p
}

/// Cumulative boundaries for inverse-CDF sampling.
///
/// Returns `weights.len() + 1` values starting at 0.0 and ending at 1.0.
/// Negative or non-finite weights count as zero. With no positive weight all
/// boundaries are zero and nothing can be drawn.
pub fn cumulative_boundaries(weights: &[f64]) -> Vec<f64> {
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().copied().map(clean).sum();
    let mut bounds = Vec::with_capacity(weights.len() + 1);
    bounds.push(0.0);
    if total <= 0.0 {
        bounds.extend(std::iter::repeat_n(0.0, weights.len()));
        return bounds;
    }
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += clean(w);
        // Pin the last boundary so rounding never leaves a gap below 1.0
        bounds.push(if i + 1 == weights.len() { 1.0 } else { acc / total });
    }
    bounds
}

/// Find `j` with `bounds[j] < u <= bounds[j + 1]`, skipping `exclude`.
///
/// `None` means the draw fell on a boundary outside every open interval
/// (e.g. `u == 0.0`) or inside the excluded interval; callers keep the
/// prior state in that case.
pub fn pick_interval(bounds: &[f64], u: f64, exclude: Option<usize>) -> Option<usize> {
    (0..bounds.len().saturating_sub(1))
        .find(|&j| u > bounds[j] && u <= bounds[j + 1] && Some(j) != exclude)
}

/// Draw an index proportional to `weights`. `None` when no weight is positive.
pub fn sample_weighted<R: Rng>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let bounds = cumulative_boundaries(weights);
    if bounds.last().copied().unwrap_or(0.0) <= 0.0 {
        return None;
    }
    let u: f64 = rng.random();
    (0..weights.len()).find(|&j| u < bounds[j + 1] && bounds[j] < bounds[j + 1])
}
