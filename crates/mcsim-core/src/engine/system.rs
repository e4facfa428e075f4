use super::error::EngineError;
use crate::core::config::configuration::Configuration;
use crate::core::config::select::Select;
use crate::core::model::one_body::OneBodyModel;
use crate::core::model::two_body::TwoBodyModel;
use crate::core::model::visit::VisitModel;
use crate::core::model::visit_cell::VisitModelCell;
use crate::core::model::visit_intra::VisitModelIntra;
use crate::core::model::{ModelOneBody, ModelTwoBody};
use serde::{Deserialize, Serialize};

/// The closed set of interaction models a potential can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Model {
    OneBody(OneBodyModel),
    TwoBody(TwoBodyModel),
}

/// How a potential iterates the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisitStrategy {
    /// Brute-force double loop; the O(N²) correctness baseline.
    BruteForce,
    /// Neighbor-stencil iteration over a cell list (two-body only).
    Cell(VisitModelCell),
    /// Same-particle pairs with an exclusion window (two-body only).
    Intra(VisitModelIntra),
}

/// One term of the system energy: a model paired with an iteration strategy
/// and an environment group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potential {
    group_index: usize,
    model: Model,
    visitor: VisitStrategy,
}

impl Potential {
    /// Creates a brute-force two-body potential over the all group.
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential to evaluate.
    pub fn two_body(model: TwoBodyModel) -> Self {
        Self {
            model: Model::TwoBody(model),
            visitor: VisitStrategy::BruteForce,
            group_index: 0,
        }
    }

    /// Creates a one-body potential over the all group.
    pub fn one_body(model: OneBodyModel) -> Self {
        Self {
            model: Model::OneBody(model),
            visitor: VisitStrategy::BruteForce,
            group_index: 0,
        }
    }

    /// Replaces the iteration strategy.
    pub fn with_visitor(mut self, visitor: VisitStrategy) -> Self {
        self.visitor = visitor;
        self
    }

    /// Restricts the potential to a group.
    pub fn with_group(mut self, group_index: usize) -> Self {
        self.group_index = group_index;
        self
    }

    /// Returns the model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the iteration strategy.
    pub fn visitor(&self) -> &VisitStrategy {
        &self.visitor
    }

    /// Caches type-dependent model constants from the parameter tables.
    pub fn precompute(&mut self, config: &Configuration) {
        match &mut self.model {
            Model::OneBody(model) => model.precompute(config.model_params()),
            Model::TwoBody(model) => model.precompute(config.model_params()),
        }
    }

    /// Returns the total energy of this term.
    ///
    /// # Errors
    ///
    /// [`EngineError::VisitorBodyCount`] when a pair-only visitor is paired
    /// with a one-body model.
    pub fn energy(&self, config: &Configuration) -> Result<f64, EngineError> {
        match (&self.model, &self.visitor) {
            (Model::TwoBody(model), VisitStrategy::BruteForce) => {
                Ok(VisitModel::two_body(model, config, self.group_index))
            }
            (Model::TwoBody(model), VisitStrategy::Cell(visitor)) => {
                Ok(visitor.two_body(model, config))
            }
            (Model::TwoBody(model), VisitStrategy::Intra(visitor)) => {
                Ok(visitor.two_body(model, config, self.group_index))
            }
            (Model::OneBody(model), VisitStrategy::BruteForce) => {
                Ok(VisitModel::one_body(model, config, self.group_index))
            }
            (Model::OneBody(_), VisitStrategy::Cell(_)) => {
                Err(EngineError::VisitorBodyCount { visitor: "cell" })
            }
            (Model::OneBody(_), VisitStrategy::Intra(_)) => {
                Err(EngineError::VisitorBodyCount { visitor: "intra" })
            }
        }
    }

    /// Returns the energy of this term restricted to a selection.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration to iterate.
    /// * `selection` - The mobile sites whose interactions are wanted.
    pub fn energy_of(
        &self,
        config: &Configuration,
        selection: &Select,
    ) -> Result<f64, EngineError> {
        match (&self.model, &self.visitor) {
            (Model::TwoBody(model), VisitStrategy::BruteForce) => Ok(VisitModel::two_body_of(
                model,
                config,
                selection,
                self.group_index,
            )),
            (Model::TwoBody(model), VisitStrategy::Cell(visitor)) => {
                Ok(visitor.two_body_of(model, config, selection))
            }
            (Model::TwoBody(model), VisitStrategy::Intra(visitor)) => {
                Ok(visitor.two_body_of(model, config, selection))
            }
            (Model::OneBody(model), VisitStrategy::BruteForce) => {
                Ok(VisitModel::one_body_of(model, config, selection))
            }
            (Model::OneBody(_), VisitStrategy::Cell(_)) => {
                Err(EngineError::VisitorBodyCount { visitor: "cell" })
            }
            (Model::OneBody(_), VisitStrategy::Intra(_)) => {
                Err(EngineError::VisitorBodyCount { visitor: "intra" })
            }
        }
    }
}

/// A configuration together with the potentials that define its energy.
///
/// The full potentials define the sampled ensemble; reference potentials are
/// cheaper stand-ins used by dual-cut configurational bias and by Mayer
/// sampling. Exactly one system is mutated per trial; all trial machinery
/// goes through this facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    configuration: Configuration,
    potentials: Vec<Potential>,
    references: Vec<Potential>,
}

impl System {
    /// Creates a system over a configuration with no potentials yet.
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            potentials: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Adds a full potential term.
    pub fn add_potential(&mut self, mut potential: Potential) {
        potential.precompute(&self.configuration);
        self.potentials.push(potential);
    }

    /// Adds a reference potential.
    pub fn add_reference(&mut self, mut potential: Potential) {
        potential.precompute(&self.configuration);
        self.references.push(potential);
    }

    /// Returns the configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Returns the configuration mutably.
    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.configuration
    }

    /// Returns the full potential terms.
    pub fn potentials(&self) -> &[Potential] {
        &self.potentials
    }

    /// Returns the total energy under the full potentials.
    pub fn energy(&self) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for potential in &self.potentials {
            total += potential.energy(&self.configuration)?;
        }
        Ok(total)
    }

    /// Returns the energy of a selection under the full potentials.
    ///
    /// # Arguments
    ///
    /// * `selection` - The mobile sites whose interactions are wanted.
    pub fn energy_of(&self, selection: &Select) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for potential in &self.potentials {
            total += potential.energy_of(&self.configuration, selection)?;
        }
        Ok(total)
    }

    /// Returns the energy of a selection under one reference potential.
    ///
    /// # Arguments
    ///
    /// * `selection` - The mobile sites whose interactions are wanted.
    /// * `reference_index` - Which reference potential to use.
    pub fn reference_energy_of(
        &self,
        selection: &Select,
        reference_index: usize,
    ) -> Result<f64, EngineError> {
        self.references[reference_index].energy_of(&self.configuration, selection)
    }

    /// Returns the total energy under one reference potential.
    pub fn reference_energy(&self, reference_index: usize) -> Result<f64, EngineError> {
        self.references[reference_index].energy(&self.configuration)
    }
}
