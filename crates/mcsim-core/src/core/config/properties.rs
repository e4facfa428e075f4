use serde::{Deserialize, Serialize};

/// A small ordered map from property names to numeric values.
///
/// Sites, bonds, and per-type templates carry open-ended numeric annotations
/// (partial-charge intermediates, director flags, equilibrium lengths) that
/// downstream code looks up by name at runtime. Keys are unique, must not
/// contain spaces, and keep their insertion order so that serialized output
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Properties {
    /// Creates an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when no properties are stored.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the property names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the property values in insertion order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the value of a property by name.
    ///
    /// # Arguments
    ///
    /// * `name` - The property name to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(value)` if the property exists, otherwise `None`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| self.values[index])
    }

    /// Returns true when a property with the given name exists.
    pub fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Adds a new property.
    ///
    /// The name must be unique within this bag and must not contain spaces.
    ///
    /// # Arguments
    ///
    /// * `name` - The property name.
    /// * `value` - The property value.
    pub fn add(&mut self, name: &str, value: f64) {
        assert!(!name.contains(' '), "property names must not contain spaces: {:?}", name);
        assert!(!self.has(name), "duplicate property name: {:?}", name);
        self.names.push(name.to_string());
        self.values.push(value);
    }

    /// Sets the value of a property, inserting it if absent.
    ///
    /// # Arguments
    ///
    /// * `name` - The property name.
    /// * `value` - The new property value.
    pub fn set(&mut self, name: &str, value: f64) {
        match self.names.iter().position(|n| n == name) {
            Some(index) => self.values[index] = value,
            None => self.add(name, value),
        }
    }

    /// Adds a delta to the value of an existing property.
    ///
    /// # Arguments
    ///
    /// * `name` - The property name; must exist.
    /// * `delta` - The increment to apply.
    pub fn add_to(&mut self, name: &str, delta: f64) {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("unknown property: {:?}", name));
        self.values[index] += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_value_round_trip() {
        let mut props = Properties::new();
        props.add("charge", -0.5);
        props.add("director", 1.0);
        assert_eq!(props.len(), 2);
        assert_eq!(props.value("charge"), Some(-0.5));
        assert_eq!(props.value("director"), Some(1.0));
        assert_eq!(props.value("missing"), None);
    }

    #[test]
    fn set_updates_existing_and_inserts_missing() {
        let mut props = Properties::new();
        props.set("charge", 0.25);
        assert_eq!(props.value("charge"), Some(0.25));
        props.set("charge", 0.5);
        assert_eq!(props.value("charge"), Some(0.5));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn add_to_increments_existing_value() {
        let mut props = Properties::new();
        props.add("ewald_sum", 1.0);
        props.add_to("ewald_sum", 0.5);
        assert_eq!(props.value("ewald_sum"), Some(1.5));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut props = Properties::new();
        props.add("b", 2.0);
        props.add("a", 1.0);
        props.add("c", 3.0);
        assert_eq!(props.names(), &["b", "a", "c"]);
        assert_eq!(props.values(), &[2.0, 1.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "duplicate property name")]
    fn duplicate_names_are_rejected() {
        let mut props = Properties::new();
        props.add("charge", 1.0);
        props.add("charge", 2.0);
    }

    #[test]
    #[should_panic(expected = "must not contain spaces")]
    fn names_with_spaces_are_rejected() {
        let mut props = Properties::new();
        props.add("partial charge", 1.0);
    }

    #[test]
    #[should_panic(expected = "unknown property")]
    fn add_to_missing_property_panics() {
        let mut props = Properties::new();
        props.add_to("missing", 1.0);
    }
}
