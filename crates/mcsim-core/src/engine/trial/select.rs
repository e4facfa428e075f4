use crate::core::config::configuration::Configuration;
use crate::core::config::select::{Select, SelectPosition};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What a trial selection picks out of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialSelectKind {
    /// A uniformly random particle from the group (optionally one type).
    RandomParticle,
    /// Nothing at select time; a transfer perturbation inserts the particle
    /// and claims the selection during `perturb`.
    NewParticle { particle_type: usize },
    /// A random end site of a random chain particle; the anchor is the
    /// opposite end (reptation).
    ChainEnd,
    /// A fixed site with a fixed anchor site, in the particle carried over
    /// from earlier stages when present (staged growth).
    SiteInParticle {
        mobile_site: usize,
        anchor_site: usize,
    },
    /// A random pivot site plus every site beyond it (pivot moves).
    ChainTail,
    /// Two random anchor sites with the interior between them (crankshaft).
    ChainSegment,
}

/// The selection half of a trial stage.
///
/// Populates a mobile [`SelectPosition`] (with positions captured at
/// selection time, so reverts are exact), an optional anchor [`Select`], and
/// the selection probability used by transfer acceptances. An empty
/// selection is reported as failure and forces rejection without any energy
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSelect {
    group_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    particle_type: Option<usize>,
    kind: TrialSelectKind,
    #[serde(skip)]
    mobile: SelectPosition,
    #[serde(skip)]
    mobile_original: SelectPosition,
    #[serde(skip)]
    anchor: Select,
    #[serde(skip)]
    probability: f64,
}

impl TrialSelect {
    fn with_kind(kind: TrialSelectKind) -> Self {
        Self {
            kind,
            group_index: 0,
            particle_type: None,
            mobile: SelectPosition::new(),
            mobile_original: SelectPosition::new(),
            anchor: Select::new(),
            probability: 1.0,
        }
    }

    /// Selects a uniformly random particle.
    pub fn random_particle() -> Self {
        Self::with_kind(TrialSelectKind::RandomParticle)
    }

    /// Claims the particle a transfer perturbation will insert.
    pub fn new_particle(particle_type: usize) -> Self {
        Self::with_kind(TrialSelectKind::NewParticle { particle_type })
    }

    /// Selects a random chain end with the opposite end as anchor.
    pub fn chain_end() -> Self {
        Self::with_kind(TrialSelectKind::ChainEnd)
    }

    /// Selects a fixed site anchored at another site of the same particle.
    pub fn site_in_particle(mobile_site: usize, anchor_site: usize) -> Self {
        Self::with_kind(TrialSelectKind::SiteInParticle {
            mobile_site,
            anchor_site,
        })
    }

    /// Selects a random chain tail for pivot moves.
    pub fn chain_tail() -> Self {
        Self::with_kind(TrialSelectKind::ChainTail)
    }

    /// Selects a random interior chain segment for crankshaft moves.
    pub fn chain_segment() -> Self {
        Self::with_kind(TrialSelectKind::ChainSegment)
    }

    /// Restricts random choices to one particle type.
    pub fn of_type(mut self, particle_type: usize) -> Self {
        self.particle_type = Some(particle_type);
        self
    }

    /// Restricts random choices to one group.
    pub fn in_group(mut self, group_index: usize) -> Self {
        self.group_index = group_index;
        self
    }

    /// Returns the selection kind.
    pub fn kind(&self) -> &TrialSelectKind {
        &self.kind
    }

    /// Returns the group restriction.
    pub fn group_index(&self) -> usize {
        self.group_index
    }

    /// Returns the mobile selection with its cached positions.
    pub fn mobile(&self) -> &SelectPosition {
        &self.mobile
    }

    /// Returns the pre-perturbation snapshot of the mobile selection.
    pub fn mobile_original(&self) -> &SelectPosition {
        &self.mobile_original
    }

    /// Returns the anchor sites (empty for unanchored selections).
    pub fn anchor(&self) -> &Select {
        &self.anchor
    }

    /// Returns the probability of having drawn this selection.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Points the mobile selection at a particle chosen by a perturbation
    /// (transfer inserts), capturing positions and the snapshot.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration holding the particle.
    /// * `particle_index` - The particle to claim.
    pub fn set_mobile_particle(&mut self, config: &Configuration, particle_index: usize) {
        let num_sites = config.particle(particle_index).num_sites();
        self.mobile
            .set_particle(particle_index, (0..num_sites).collect());
        config.load_selection(&mut self.mobile);
        self.mobile_original = self.mobile.clone();
    }

    /// Draws a selection for this attempt.
    ///
    /// Cached positions and the revert snapshot are captured here. Returns
    /// false when no eligible particle exists; the caller must then force
    /// rejection.
    ///
    /// # Arguments
    ///
    /// * `perturbed` - The union of selections from earlier stages of the
    ///   same attempt; staged kinds reuse its particle.
    /// * `config` - The configuration to select from.
    /// * `rng` - Random number source.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        perturbed: &Select,
        config: &Configuration,
        rng: &mut R,
    ) -> bool {
        self.probability = 1.0;
        self.anchor.clear();
        let found = match self.kind {
            TrialSelectKind::RandomParticle => self.select_random_particle(config, rng),
            TrialSelectKind::NewParticle { .. } => {
                self.mobile.clear();
                self.mobile_original.clear();
                true
            }
            TrialSelectKind::ChainEnd => self.select_chain_end(config, rng),
            TrialSelectKind::SiteInParticle {
                mobile_site,
                anchor_site,
            } => self.select_site_in_particle(perturbed, config, mobile_site, anchor_site, rng),
            TrialSelectKind::ChainTail => self.select_chain_tail(config, rng),
            TrialSelectKind::ChainSegment => self.select_chain_segment(config, rng),
        };
        if found && !matches!(self.kind, TrialSelectKind::NewParticle { .. }) {
            config.load_selection(&mut self.mobile);
            self.mobile_original = self.mobile.clone();
        }
        found
    }

    /// Returns the candidate particle indices for random selection kinds.
    fn candidates(&self, config: &Configuration) -> Vec<usize> {
        let group = config.group_select(self.group_index);
        (0..group.num_particles())
            .map(|i| group.particle_index(i))
            .filter(|&p| match self.particle_type {
                Some(t) => config.particle(p).type_id() == t,
                None => true,
            })
            .collect()
    }

    fn random_candidate<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        rng: &mut R,
    ) -> Option<usize> {
        let candidates = self.candidates(config);
        if candidates.is_empty() {
            self.mobile.clear();
            return None;
        }
        self.probability = 1.0 / candidates.len() as f64;
        Some(candidates[rng.gen_range(0..candidates.len())])
    }

    fn select_random_particle<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        rng: &mut R,
    ) -> bool {
        match self.random_candidate(config, rng) {
            Some(p) => {
                let group = config.group_select(self.group_index);
                let in_group = group
                    .find_particle(p)
                    .expect("candidate came from the group");
                self.mobile
                    .set_particle(p, group.site_indices(in_group).to_vec());
                true
            }
            None => false,
        }
    }

    fn select_chain_end<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        rng: &mut R,
    ) -> bool {
        let p = match self.random_candidate(config, rng) {
            Some(p) => p,
            None => return false,
        };
        let num_sites = config.particle(p).num_sites();
        if num_sites < 2 {
            self.mobile.clear();
            return false;
        }
        let from_head = rng.gen_range(0..2) == 0;
        let (end, opposite) = if from_head {
            (0, num_sites - 1)
        } else {
            (num_sites - 1, 0)
        };
        self.mobile.set_particle(p, vec![end]);
        self.anchor.add_site(p, opposite);
        true
    }

    fn select_site_in_particle<R: Rng + ?Sized>(
        &mut self,
        perturbed: &Select,
        config: &Configuration,
        mobile_site: usize,
        anchor_site: usize,
        rng: &mut R,
    ) -> bool {
        let p = if perturbed.is_empty() {
            match self.random_candidate(config, rng) {
                Some(p) => p,
                None => {
                    self.mobile.clear();
                    return false;
                }
            }
        } else {
            perturbed.particle_index(0)
        };
        if mobile_site >= config.particle(p).num_sites() {
            self.mobile.clear();
            return false;
        }
        self.mobile.set_particle(p, vec![mobile_site]);
        self.anchor.add_site(p, anchor_site);
        true
    }

    fn select_chain_tail<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        rng: &mut R,
    ) -> bool {
        let p = match self.random_candidate(config, rng) {
            Some(p) => p,
            None => return false,
        };
        let num_sites = config.particle(p).num_sites();
        if num_sites < 2 {
            self.mobile.clear();
            return false;
        }
        let pivot = rng.gen_range(0..num_sites - 1);
        self.mobile.set_particle(p, (pivot + 1..num_sites).collect());
        self.anchor.add_site(p, pivot);
        true
    }

    fn select_chain_segment<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        rng: &mut R,
    ) -> bool {
        let p = match self.random_candidate(config, rng) {
            Some(p) => p,
            None => return false,
        };
        let num_sites = config.particle(p).num_sites();
        if num_sites < 3 {
            self.mobile.clear();
            return false;
        }
        let first = rng.gen_range(0..num_sites - 2);
        let second = rng.gen_range(first + 2..num_sites);
        self.mobile
            .set_particle(p, (first + 1..second).collect());
        self.anchor.add_site(p, first);
        self.anchor.add_site(p, second);
        true
    }
}
