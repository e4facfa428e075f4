use serde::{Deserialize, Serialize};

/// How two per-type self values combine into a pair value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixingRule {
    /// `(a + b) / 2` — side lengths and cutoffs.
    Arithmetic,
    /// `sqrt(a * b)` — interaction strengths.
    Geometric,
    /// `a * b` — charges, whose pair value is the charge product.
    Product,
}

impl MixingRule {
    fn mix(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Arithmetic => 0.5 * (a + b),
            Self::Geometric => (a * b).sqrt(),
            Self::Product => a * b,
        }
    }
}

/// One named per-type parameter with its pairwise mixing table.
///
/// The self values are indexed by site type; the mixed table is rectangular
/// over all site-type pairs and is recomputed whenever any self value
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    mixing: MixingRule,
    values: Vec<f64>,
    mixed: Vec<Vec<f64>>,
}

impl Parameter {
    /// Creates a parameter with one self value per site type.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name (e.g. `epsilon`).
    /// * `mixing` - The pairwise mixing rule.
    /// * `values` - The per-type self values.
    pub fn new(name: &str, mixing: MixingRule, values: Vec<f64>) -> Self {
        let mut parameter = Self {
            name: name.to_string(),
            mixing,
            values,
            mixed: Vec::new(),
        };
        parameter.mix();
        parameter
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of site types covered.
    pub fn num_types(&self) -> usize {
        self.values.len()
    }

    /// Returns the self value of a site type.
    pub fn value(&self, site_type: usize) -> f64 {
        self.values[site_type]
    }

    /// Returns the mixed value of a site-type pair.
    pub fn mixed_value(&self, type1: usize, type2: usize) -> f64 {
        self.mixed[type1][type2]
    }

    /// Returns the largest entry in the mixed table.
    pub fn mixed_max(&self) -> f64 {
        self.mixed
            .iter()
            .flatten()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sets the self value of a site type and refreshes the mixed table.
    ///
    /// # Arguments
    ///
    /// * `site_type` - The site type to update.
    /// * `value` - The new self value.
    pub fn set_value(&mut self, site_type: usize, value: f64) {
        self.values[site_type] = value;
        self.mix();
    }

    /// Rebuilds the mixed table from the self values.
    pub fn mix(&mut self) {
        let n = self.values.len();
        self.mixed = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                self.mixed[i][j] = self.mixing.mix(self.values[i], self.values[j]);
            }
        }
    }
}

/// The per-type interaction parameter tables of a configuration.
///
/// Holds one [`Parameter`] per named quantity. The standard set (`epsilon`,
/// `sigma`, `cutoff`, `charge`) is created for every configuration; custom
/// parameters can be registered alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    params: Vec<Parameter>,
}

impl ModelParams {
    /// Creates the standard parameter set for a number of site types.
    ///
    /// Defaults: `epsilon = 1`, `sigma = 1`, `cutoff = 3`, `charge = 0`.
    ///
    /// # Arguments
    ///
    /// * `num_site_types` - The number of distinct site types.
    pub fn standard(num_site_types: usize) -> Self {
        let mut params = Self::default();
        params.add(Parameter::new(
            "epsilon",
            MixingRule::Geometric,
            vec![1.0; num_site_types],
        ));
        params.add(Parameter::new(
            "sigma",
            MixingRule::Arithmetic,
            vec![1.0; num_site_types],
        ));
        params.add(Parameter::new(
            "cutoff",
            MixingRule::Arithmetic,
            vec![3.0; num_site_types],
        ));
        params.add(Parameter::new(
            "charge",
            MixingRule::Product,
            vec![0.0; num_site_types],
        ));
        params
    }

    /// Registers a parameter.
    ///
    /// # Arguments
    ///
    /// * `parameter` - The parameter to add; its name must be unique.
    pub fn add(&mut self, parameter: Parameter) {
        assert!(
            self.select(parameter.name()).is_none(),
            "duplicate parameter: {:?}",
            parameter.name()
        );
        self.params.push(parameter);
    }

    /// Returns a parameter by name.
    pub fn select(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Returns a parameter by name, mutably.
    pub fn select_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    /// Sets a self value of a named parameter and refreshes its mixed table.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name; must exist.
    /// * `site_type` - The site type to update.
    /// * `value` - The new self value.
    pub fn set_value(&mut self, name: &str, site_type: usize, value: f64) {
        self.select_mut(name)
            .unwrap_or_else(|| panic!("unknown parameter: {:?}", name))
            .set_value(site_type, value);
    }

    /// Returns the mixed value of a named parameter for a site-type pair.
    pub fn mixed(&self, name: &str, type1: usize, type2: usize) -> f64 {
        self.select(name)
            .unwrap_or_else(|| panic!("unknown parameter: {:?}", name))
            .mixed_value(type1, type2)
    }

    /// Returns the largest mixed cutoff, used to size cell lists.
    pub fn max_cutoff(&self) -> f64 {
        self.select("cutoff")
            .map(|p| p.mixed_max())
            .unwrap_or(0.0)
    }
}
