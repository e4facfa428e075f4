use super::particle::Particle;
use super::site::Site;
use serde::{Deserialize, Serialize};

/// A predicate over particles and sites used to carve out sub-selections of
/// a configuration.
///
/// Static groups match on particle and site types alone, so membership is
/// recomputable from type ids at any time. Dynamic groups additionally
/// require a named per-site property to be present, which lets plugins tag
/// sites at runtime ("spatial" groups).
///
/// Empty type lists match everything, so `Group::all()` is the canonical
/// whole-configuration group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Particle types included; empty means all.
    particle_types: Vec<usize>,
    /// Site types included; empty means all.
    site_types: Vec<usize>,
    /// When set, a site is only included if it carries this property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_property: Option<String>,
}

impl Group {
    /// Creates the group that matches every particle and site.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a static group restricted to the given particle types.
    ///
    /// # Arguments
    ///
    /// * `particle_types` - The particle types to include.
    pub fn from_particle_types(particle_types: Vec<usize>) -> Self {
        Self {
            particle_types,
            ..Self::default()
        }
    }

    /// Creates a static group restricted to the given site types.
    ///
    /// # Arguments
    ///
    /// * `site_types` - The site types to include.
    pub fn from_site_types(site_types: Vec<usize>) -> Self {
        Self {
            site_types,
            ..Self::default()
        }
    }

    /// Creates a dynamic group of sites carrying a named property.
    ///
    /// # Arguments
    ///
    /// * `property` - The property name a site must carry to be included.
    pub fn from_site_property(property: &str) -> Self {
        Self {
            site_property: Some(property.to_string()),
            ..Self::default()
        }
    }

    /// Returns true when the group matches everything.
    pub fn is_all(&self) -> bool {
        self.particle_types.is_empty()
            && self.site_types.is_empty()
            && self.site_property.is_none()
    }

    /// Returns whether a particle belongs to this group.
    ///
    /// A particle belongs when its type matches and at least one of its
    /// sites matches.
    ///
    /// # Arguments
    ///
    /// * `particle` - The particle to test.
    pub fn is_in_particle(&self, particle: &Particle) -> bool {
        if !self.particle_types.is_empty()
            && !self.particle_types.contains(&particle.type_id())
        {
            return false;
        }
        particle.sites().iter().any(|site| self.is_in_site(site))
    }

    /// Returns whether a site belongs to this group.
    ///
    /// # Arguments
    ///
    /// * `site` - The site to test.
    pub fn is_in_site(&self, site: &Site) -> bool {
        if !self.site_types.is_empty() && !self.site_types.contains(&site.type_id()) {
            return false;
        }
        match &self.site_property {
            Some(property) => site.properties().has(property),
            None => true,
        }
    }

    /// Returns the local indices of a particle's sites that belong to this
    /// group.
    ///
    /// # Arguments
    ///
    /// * `particle` - The particle whose sites are filtered.
    pub fn site_indices(&self, particle: &Particle) -> Vec<usize> {
        particle
            .sites()
            .iter()
            .enumerate()
            .filter(|(_, site)| self.is_in_site(site))
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spatial::position::Position;

    #[test]
    fn the_all_group_matches_everything() {
        let group = Group::all();
        assert!(group.is_all());
        let particle = Particle::single_site(3, 3);
        assert!(group.is_in_particle(&particle));
        assert_eq!(group.site_indices(&particle), vec![0]);
    }

    #[test]
    fn particle_type_groups_filter_by_type() {
        let group = Group::from_particle_types(vec![1]);
        assert!(group.is_in_particle(&Particle::single_site(1, 3)));
        assert!(!group.is_in_particle(&Particle::single_site(0, 3)));
    }

    #[test]
    fn site_type_groups_filter_site_indices() {
        let mut particle = Particle::new(0, 3);
        particle.add_site(Site::new(0, Position::origin(3)));
        particle.add_site(Site::new(1, Position::origin(3)));
        particle.add_site(Site::new(0, Position::origin(3)));

        let group = Group::from_site_types(vec![0]);
        assert_eq!(group.site_indices(&particle), vec![0, 2]);
        assert!(group.is_in_particle(&particle));

        let none = Group::from_site_types(vec![9]);
        assert!(!none.is_in_particle(&particle));
    }

    #[test]
    fn dynamic_groups_require_the_property() {
        let group = Group::from_site_property("tagged");
        let mut particle = Particle::single_site(0, 3);
        assert!(!group.is_in_particle(&particle));
        particle.site_mut(0).properties_mut().add("tagged", 1.0);
        assert!(group.is_in_particle(&particle));
    }
}
