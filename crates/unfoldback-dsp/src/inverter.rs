/// Minimum-energy inversion filter — the per-channel repair core.
///
/// Corruption model: a sample that should have clipped instead wrapped,
/// flipping sign and losing 2 units of magnitude per unit of true
/// overflow. Undoing one wrap is `sign(s) * (|s| - 2)`, which is its own
/// inverse.
///
/// The filter consumes one raw sample at a time and tracks competing
/// hypotheses in parallel:
///   - the base: the run is fine as recorded;
///   - candidates: a wrapped run started at some past sample, and every
///     sample since then should be un-inverted.
/// Each candidate carries the accepted prefix plus its corrected suffix,
/// so committing either hypothesis emits a gapless run. Whichever reading
/// is locally smoother (lower total variation) wins, with fixed margins
/// for hysteresis.

use crate::energy::energy;

/// Longest wrapped run the filter will track. Candidates are dropped
/// rather than extended past this length, so a longer run is released
/// uncorrected.
pub const MAX_RUN: usize = 100;

/// Hard cap on live hypotheses; the worst-ranked are evicted. The prune
/// margin alone bounds the set only empirically.
pub const MAX_CANDIDATES: usize = 64;

/// A candidate must beat the base by this much at termination to commit.
const COMMIT_MARGIN: f64 = 0.5;

/// A candidate must undercut the base by this much to stay alive.
const PRUNE_MARGIN: f64 = 0.1;

/// Undo one overflow wrap: subtract 2 from the magnitude, keep the sign.
fn unwrap_sample(s: f64) -> f64 {
    1.0f64.copysign(s) * (s.abs() - 2.0)
}

/// Per-channel filter state. One instance per channel, never shared;
/// each pass builds fresh instances.
pub struct MinimumEnergyInverter {
    /// Accepted, uncorrected run since the last commit.
    base: Vec<f64>,
    /// Live correction hypotheses, oldest first. Every candidate has the
    /// same length as `base`: it was seeded from the base of its creation
    /// step and both grow by one sample per inconclusive step.
    candidates: Vec<Vec<f64>>,
}

impl MinimumEnergyInverter {
    pub fn new() -> Self {
        Self {
            base: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Feed one raw sample; returns the samples that became final, in
    /// time order. Bursts are irregular: most steps return nothing or a
    /// whole run at once.
    pub fn push(&mut self, s: f64) -> Vec<f64> {
        let mut next_base = self.base.clone();
        next_base.push(s);
        let base_energy = energy(&next_base);

        // Cost of each candidate if correction stops here: its own
        // roughness plus the joint to the raw sample. Stable minimum, so
        // ties go to the oldest hypothesis.
        let mut best: Option<(f64, usize)> = None;
        for (i, w) in self.candidates.iter().enumerate() {
            let Some(&tail) = w.last() else { continue };
            let termination = energy(w) + (s - tail).abs();
            if best.is_none_or(|(e, _)| termination < e) {
                best = Some((termination, i));
            }
        }

        if let Some((termination, i)) = best {
            if termination < base_energy - COMMIT_MARGIN {
                // The corrected reading is decisively smoother: commit it.
                let won = self.candidates.swap_remove(i);
                self.candidates.clear();
                self.base.clear();
                self.base.push(s);
                return won;
            }
        }

        // No confident commit. Extend every hypothesis, plus a fresh one
        // claiming the wrapped run starts at this very sample.
        let inverted = unwrap_sample(s);
        let mut extended: Vec<Vec<f64>> = Vec::with_capacity(self.candidates.len() + 1);
        for w in &self.candidates {
            if w.len() < MAX_RUN {
                let mut c = w.clone();
                c.push(inverted);
                extended.push(c);
            }
        }
        if self.base.len() < MAX_RUN {
            let mut c = self.base.clone();
            c.push(inverted);
            extended.push(c);
        }

        // Keep only hypotheses meaningfully smoother than the base, and
        // at most MAX_CANDIDATES of those.
        let mut survivors: Vec<(f64, Vec<f64>)> = extended
            .into_iter()
            .map(|c| (energy(&c), c))
            .filter(|(e, _)| e + PRUNE_MARGIN < base_energy)
            .collect();
        if survivors.len() > MAX_CANDIDATES {
            survivors.sort_by(|a, b| a.0.total_cmp(&b.0));
            survivors.truncate(MAX_CANDIDATES);
        }

        if survivors.is_empty() {
            // Whatever run may have been tracked is over and never became
            // convincing: release the raw run as-is.
            let released = std::mem::replace(&mut self.base, vec![s]);
            self.candidates.clear();
            released
        } else {
            // Inconclusive: defer the decision.
            self.candidates = survivors.into_iter().map(|(_, c)| c).collect();
            self.base = next_base;
            Vec::new()
        }
    }

    /// End of stream: release the accepted run unchanged.
    pub fn flush(&mut self) -> Vec<f64> {
        self.candidates.clear();
        std::mem::take(&mut self.base)
    }
}

impl Default for MinimumEnergyInverter {
    fn default() -> Self {
        Self::new()
    }
}
