use super::ModelOneBody;
use crate::core::config::model_params::ModelParams;
use crate::core::config::site::Site;
use serde::{Deserialize, Serialize};

/// A harmonic tether to the box origin, `k * |r|^2`.
///
/// The simplest useful external field; confines a group of sites around the
/// center of the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicWell {
    pub spring_constant: f64,
}

impl ModelOneBody for HarmonicWell {
    fn energy(&self, site: &Site, _params: &ModelParams) -> f64 {
        self.spring_constant * site.position().squared_norm()
    }
}

/// The closed set of one-body models known to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OneBodyModel {
    HarmonicWell(HarmonicWell),
}

impl OneBodyModel {
    /// Convenience constructor for a harmonic tether.
    pub fn harmonic_well(spring_constant: f64) -> Self {
        Self::HarmonicWell(HarmonicWell { spring_constant })
    }
}

impl ModelOneBody for OneBodyModel {
    fn energy(&self, site: &Site, params: &ModelParams) -> f64 {
        match self {
            Self::HarmonicWell(model) => model.energy(site, params),
        }
    }

    fn precompute(&mut self, params: &ModelParams) {
        match self {
            Self::HarmonicWell(model) => model.precompute(params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spatial::position::Position;

    #[test]
    fn harmonic_well_grows_quadratically() {
        let model = HarmonicWell {
            spring_constant: 2.0,
        };
        let params = ModelParams::standard(1);
        let site = Site::new(0, Position::new(vec![1.0, 2.0, 2.0]));
        assert!((model.energy(&site, &params) - 18.0).abs() < 1e-12);
    }
}
