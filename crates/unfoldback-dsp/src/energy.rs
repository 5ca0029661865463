/// Roughness metric for sample runs: total variation.
///
/// Used as a relative ranking signal only — callers compare two energies
/// with fixed margins, never as an absolute quality score.

/// Sum of absolute differences between consecutive samples.
/// Runs of length 0 or 1 have zero energy.
pub fn energy(samples: &[f64]) -> f64 {
    samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}
