use crate::core::config::configuration::Configuration;
use crate::core::config::select::SelectPosition;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Candidate bookkeeping for one configurational-bias stage.
///
/// A stage samples `num` candidate placements, stores each candidate's
/// positions and energy, and combines their Boltzmann weights into the
/// stage's Rosenbluth factor. The chosen candidate is drawn from the
/// cumulative weight distribution (the "old" configuration always keeps
/// candidate 0, which held the original positions). All sampling is
/// reproducible given a seeded random number generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rosenbluth {
    num: usize,
    #[serde(skip)]
    energies: Vec<f64>,
    #[serde(skip)]
    stored: Vec<SelectPosition>,
    #[serde(skip)]
    cumulative: Vec<f64>,
    #[serde(skip)]
    chosen_step: Option<usize>,
    #[serde(skip)]
    ln_total: f64,
}

impl Rosenbluth {
    /// Creates bookkeeping for `num` candidates per attempt.
    pub fn new(num: usize) -> Self {
        assert!(num >= 1, "stages need at least one candidate");
        let mut rosenbluth = Self {
            num,
            energies: Vec::new(),
            stored: Vec::new(),
            cumulative: Vec::new(),
            chosen_step: None,
            ln_total: 0.0,
        };
        rosenbluth.reset();
        rosenbluth
    }

    /// Returns the number of candidates per attempt.
    pub fn num(&self) -> usize {
        self.num
    }

    /// Clears per-attempt state and sizes the candidate storage.
    pub fn reset(&mut self) {
        self.energies = vec![0.0; self.num];
        self.stored = vec![SelectPosition::new(); self.num];
        self.cumulative = vec![0.0; self.num];
        self.chosen_step = None;
        self.ln_total = 0.0;
    }

    /// Captures the current positions of the stage selection as candidate
    /// `step`.
    pub fn store(&mut self, step: usize, selection: &SelectPosition, config: &Configuration) {
        let mut snapshot = selection.clone();
        config.load_selection(&mut snapshot);
        self.stored[step] = snapshot;
    }

    /// Records the energy of candidate `step`.
    pub fn set_energy(&mut self, step: usize, energy: f64) {
        self.energies[step] = energy;
    }

    /// Returns the energy of candidate `step`.
    pub fn energy(&self, step: usize) -> f64 {
        self.energies[step]
    }

    /// Returns the stored positions of candidate `step`.
    pub fn stored(&self, step: usize) -> &SelectPosition {
        &self.stored[step]
    }

    /// Returns the chosen candidate, or `None` when every candidate was so
    /// unfavorable that the attempt auto-rejects.
    pub fn chosen_step(&self) -> Option<usize> {
        self.chosen_step
    }

    /// Returns the stored positions of the chosen candidate.
    pub fn chosen(&self) -> &SelectPosition {
        &self.stored[self.chosen_step.expect("a candidate was chosen")]
    }

    /// Returns the energy of the chosen candidate.
    pub fn chosen_energy(&self) -> f64 {
        self.energies[self.chosen_step.expect("a candidate was chosen")]
    }

    /// Returns the natural log of the total Rosenbluth factor.
    pub fn ln_total(&self) -> f64 {
        self.ln_total
    }

    /// Combines candidate energies into the Rosenbluth factor and draws the
    /// chosen candidate.
    ///
    /// # Arguments
    ///
    /// * `beta` - The inverse temperature.
    /// * `rng` - Random number source.
    /// * `old` - When true, candidate 0 (the held original) is kept.
    pub fn compute<R: Rng + ?Sized>(&mut self, beta: f64, rng: &mut R, old: bool) {
        if self.num == 1 {
            self.chosen_step = Some(0);
            self.ln_total = -beta * self.energies[0];
            return;
        }
        let weights: Vec<f64> = self.energies.iter().map(|&e| -beta * e).collect();
        // shift by a constant to avoid overflow in the exponentials
        let max_weight = weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let shift = 10.0 - max_weight;
        let total: f64 = weights.iter().map(|w| (w + shift).exp()).sum();
        self.ln_total = total.ln() - shift;
        trace!(ln_total = self.ln_total, "rosenbluth factor");

        // every candidate essentially forbidden: auto-reject
        if self.ln_total < -1e9 {
            self.chosen_step = None;
            return;
        }

        let mut accumulator = 0.0;
        for (step, weight) in weights.iter().enumerate() {
            accumulator += (weight - self.ln_total).exp();
            self.cumulative[step] = accumulator;
        }
        let last = *self.cumulative.last().expect("at least one candidate");
        for value in self.cumulative.iter_mut() {
            *value /= last;
        }

        if old {
            self.chosen_step = Some(0);
        } else {
            let draw: f64 = rng.gen_range(0.0..1.0);
            let chosen = self
                .cumulative
                .iter()
                .position(|&c| draw < c)
                .unwrap_or(self.num - 1);
            self.chosen_step = Some(chosen);
        }
        self.ln_total -= (self.num as f64).ln();
    }
}
