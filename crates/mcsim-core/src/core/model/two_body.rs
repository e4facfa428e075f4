use super::{HUGE_ENERGY, ModelTwoBody};
use crate::core::config::model_params::ModelParams;
use serde::{Deserialize, Serialize};

/// The 12-6 Lennard-Jones potential, `4 eps [(sig/r)^12 - (sig/r)^6]`.
///
/// Separations below `hard_sphere_threshold * sigma` clamp to the sentinel
/// energy instead of overflowing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LennardJones {
    /// Fraction of sigma below which the pair is treated as overlapping.
    hard_sphere_threshold: f64,
}

impl Default for LennardJones {
    fn default() -> Self {
        Self {
            hard_sphere_threshold: 0.2,
        }
    }
}

impl LennardJones {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelTwoBody for LennardJones {
    fn energy(
        &self,
        squared_distance: f64,
        type1: usize,
        type2: usize,
        params: &ModelParams,
    ) -> f64 {
        let sigma = params.mixed("sigma", type1, type2);
        let threshold = self.hard_sphere_threshold * sigma;
        if squared_distance < threshold * threshold {
            return HUGE_ENERGY;
        }
        let epsilon = params.mixed("epsilon", type1, type2);
        let s2 = sigma * sigma / squared_distance;
        let s6 = s2 * s2 * s2;
        4.0 * epsilon * (s6 * s6 - s6)
    }
}

/// The hard-sphere potential: overlap below sigma, zero beyond.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardSphere;

impl ModelTwoBody for HardSphere {
    fn energy(
        &self,
        squared_distance: f64,
        type1: usize,
        type2: usize,
        params: &ModelParams,
    ) -> f64 {
        let sigma = params.mixed("sigma", type1, type2);
        if squared_distance < sigma * sigma {
            HUGE_ENERGY
        } else {
            0.0
        }
    }
}

/// The square-well potential: hard core below sigma, a flat well of depth
/// epsilon out to the cutoff, zero beyond.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquareWell;

impl ModelTwoBody for SquareWell {
    fn energy(
        &self,
        squared_distance: f64,
        type1: usize,
        type2: usize,
        params: &ModelParams,
    ) -> f64 {
        let sigma = params.mixed("sigma", type1, type2);
        if squared_distance < sigma * sigma {
            return HUGE_ENERGY;
        }
        let cutoff = params.mixed("cutoff", type1, type2);
        if squared_distance < cutoff * cutoff {
            -params.mixed("epsilon", type1, type2)
        } else {
            0.0
        }
    }
}

/// The closed set of two-body models known to the engine.
///
/// The enum tag doubles as the serialized class name, so a name-to-factory
/// registry is unnecessary: serde reconstructs the concrete payload from the
/// tag directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TwoBodyModel {
    LennardJones(LennardJones),
    HardSphere(HardSphere),
    SquareWell(SquareWell),
}

impl TwoBodyModel {
    /// Convenience constructor for the default Lennard-Jones model.
    pub fn lennard_jones() -> Self {
        Self::LennardJones(LennardJones::new())
    }

    /// Convenience constructor for the hard-sphere model.
    pub fn hard_sphere() -> Self {
        Self::HardSphere(HardSphere)
    }

    /// Convenience constructor for the square-well model.
    pub fn square_well() -> Self {
        Self::SquareWell(SquareWell)
    }
}

impl ModelTwoBody for TwoBodyModel {
    fn energy(
        &self,
        squared_distance: f64,
        type1: usize,
        type2: usize,
        params: &ModelParams,
    ) -> f64 {
        match self {
            Self::LennardJones(model) => model.energy(squared_distance, type1, type2, params),
            Self::HardSphere(model) => model.energy(squared_distance, type1, type2, params),
            Self::SquareWell(model) => model.energy(squared_distance, type1, type2, params),
        }
    }

    fn precompute(&mut self, params: &ModelParams) {
        match self {
            Self::LennardJones(model) => model.precompute(params),
            Self::HardSphere(model) => model.precompute(params),
            Self::SquareWell(model) => model.precompute(params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn unit_params() -> ModelParams {
        ModelParams::standard(1)
    }

    #[test]
    fn lennard_jones_is_zero_at_sigma() {
        let model = LennardJones::new();
        let energy = model.energy(1.0, 0, 0, &unit_params());
        assert!(f64_approx_equal(energy, 0.0));
    }

    #[test]
    fn lennard_jones_minimum_is_minus_epsilon() {
        let model = LennardJones::new();
        let r_min_sq = 2.0f64.powf(1.0 / 3.0);
        let energy = model.energy(r_min_sq, 0, 0, &unit_params());
        assert!(f64_approx_equal(energy, -1.0));
    }

    #[test]
    fn lennard_jones_matches_the_analytic_form() {
        let model = LennardJones::new();
        let r: f64 = 1.25;
        let expected = 4.0 * (r.powi(-12) - r.powi(-6));
        let energy = model.energy(r * r, 0, 0, &unit_params());
        assert!((energy - expected).abs() < 1e-14);
    }

    #[test]
    fn lennard_jones_clamps_tiny_separations() {
        let model = LennardJones::new();
        let energy = model.energy(1e-6, 0, 0, &unit_params());
        assert!(f64_approx_equal(energy, HUGE_ENERGY));
    }

    #[test]
    fn hard_sphere_is_huge_inside_and_zero_outside() {
        let model = HardSphere;
        let params = unit_params();
        assert!(f64_approx_equal(model.energy(0.81, 0, 0, &params), HUGE_ENERGY));
        assert!(f64_approx_equal(model.energy(1.21, 0, 0, &params), 0.0));
    }

    #[test]
    fn square_well_has_three_regimes() {
        let model = SquareWell;
        let params = unit_params();
        assert!(f64_approx_equal(model.energy(0.25, 0, 0, &params), HUGE_ENERGY));
        assert!(f64_approx_equal(model.energy(4.0, 0, 0, &params), -1.0));
        assert!(f64_approx_equal(model.energy(16.0, 0, 0, &params), 0.0));
    }

    #[test]
    fn enum_dispatch_matches_concrete_models() {
        let params = unit_params();
        let r2 = 1.5;
        assert!(f64_approx_equal(
            TwoBodyModel::lennard_jones().energy(r2, 0, 0, &params),
            LennardJones::new().energy(r2, 0, 0, &params)
        ));
        assert!(f64_approx_equal(
            TwoBodyModel::hard_sphere().energy(r2, 0, 0, &params),
            HardSphere.energy(r2, 0, 0, &params)
        ));
    }
}
