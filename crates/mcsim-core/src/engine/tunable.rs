use serde::{Deserialize, Serialize};

/// A bounded adjustable parameter of a perturbation, such as the maximum
/// translation length.
///
/// Tuning nudges the value toward a target acceptance ratio: too many
/// accepted moves means the step is timid and the value grows, too few
/// means it is reckless and the value shrinks. The value never leaves the
/// caller-specified `[min, max]` bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunable {
    value: f64,
    min: f64,
    max: f64,
    target_acceptance: f64,
    percent_change: f64,
    enabled: bool,
}

impl Tunable {
    /// Creates a tunable starting at `value`, bounded by `(min, max)`.
    ///
    /// # Arguments
    ///
    /// * `value` - The starting value; must lie within the bounds.
    /// * `min` - The lower bound.
    /// * `max` - The upper bound.
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        assert!(min <= max, "invalid bounds: [{}, {}]", min, max);
        assert!(
            (min..=max).contains(&value),
            "value {} outside [{}, {}]",
            value,
            min,
            max
        );
        Self {
            value,
            min,
            max,
            target_acceptance: 0.25,
            percent_change: 0.05,
            enabled: true,
        }
    }

    /// Returns the current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Sets the value, clamping to the bounds.
    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Sets the bounds, clamping the current value into them.
    pub fn set_min_and_max(&mut self, min: f64, max: f64) {
        assert!(min <= max, "invalid bounds: [{}, {}]", min, max);
        self.min = min;
        self.max = max;
        self.value = self.value.clamp(min, max);
    }

    /// Returns the target acceptance ratio.
    pub fn target_acceptance(&self) -> f64 {
        self.target_acceptance
    }

    /// Sets the target acceptance ratio.
    pub fn set_target_acceptance(&mut self, target: f64) {
        self.target_acceptance = target;
    }

    /// Sets the relative step applied per tuning round.
    pub fn set_percent_change(&mut self, percent: f64) {
        self.percent_change = percent;
    }

    /// Disables tuning (the value stays fixed).
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Returns whether tuning is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Adjusts the value toward the target acceptance ratio.
    ///
    /// # Arguments
    ///
    /// * `actual_acceptance` - The observed acceptance ratio since the last
    ///   tuning round.
    pub fn tune(&mut self, actual_acceptance: f64) {
        if !self.enabled {
            return;
        }
        let factor = if actual_acceptance > self.target_acceptance {
            1.0 + self.percent_change
        } else {
            1.0 - self.percent_change
        };
        self.value = (self.value * factor).clamp(self.min, self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tune_grows_on_high_acceptance_and_shrinks_on_low() {
        let mut tunable = Tunable::new(1.0, 0.0, 10.0);
        tunable.tune(0.9);
        assert!(tunable.value() > 1.0);
        let grown = tunable.value();
        tunable.tune(0.01);
        assert!(tunable.value() < grown);
    }

    #[test]
    fn value_never_leaves_the_bounds() {
        let mut tunable = Tunable::new(1.0, 0.5, 1.05);
        for _ in 0..100 {
            tunable.tune(1.0);
        }
        assert!(tunable.value() <= 1.05);
        for _ in 0..100 {
            tunable.tune(0.0);
        }
        assert!(tunable.value() >= 0.5);
    }

    #[test]
    fn disabled_tunables_stay_fixed() {
        let mut tunable = Tunable::new(2.0, 0.0, 10.0);
        tunable.disable();
        tunable.tune(1.0);
        assert_eq!(tunable.value(), 2.0);
    }

    #[test]
    fn set_value_clamps_into_bounds() {
        let mut tunable = Tunable::new(1.0, 0.0, 2.0);
        tunable.set_value(5.0);
        assert_eq!(tunable.value(), 2.0);
        tunable.set_min_and_max(0.0, 1.0);
        assert_eq!(tunable.value(), 1.0);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_start_value_panics() {
        Tunable::new(5.0, 0.0, 1.0);
    }
}
