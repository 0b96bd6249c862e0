//! Named physical constants with 1σ uncertainties.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: f64,
    pub uncertainty: f64,
}

/// An immutable-after-construction set of constants.
///
/// Lookup is linear; registries hold a handful of entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantsRegistry {
    constants: Vec<Constant>,
}

static STANDARD: LazyLock<ConstantsRegistry> = LazyLock::new(ConstantsRegistry::with_standard_constants);

impl ConstantsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide read-only registry of standard astronomical constants.
    pub fn standard() -> &'static ConstantsRegistry {
        &STANDARD
    }

    /// Build a fresh registry with the standard constants.
    ///
    /// Masses in kg, radii in km, flux in W/m².
    pub fn with_standard_constants() -> Self {
        let mut r = Self::new();
        r.insert("Earth_mass", 5.9722e24, 0.0006 * 5.9722e24);
        r.insert("Jupiter_mass", 1.89813e27, 0.00019 * 1.89813e27);
        r.insert("Sun_mass", 1.988475e30, 0.000092 * 1.988475e30);
        r.insert("Earth_flux", 1361.0, 0.0);
        r.insert("Earth_radius", 6371.0, 0.0);
        r.insert("Jupiter_radius", 69911.0, 0.0);
        r.insert("Sun_radius", 696340.0, 0.0);
        r.insert("pi", std::f64::consts::PI, 0.0);
        r
    }

    /// Insert or replace a constant.
    pub fn insert(&mut self, name: impl Into<String>, value: f64, uncertainty: f64) {
        let name = name.into();
        let constant = Constant {
            name,
            value,
            uncertainty: uncertainty.abs(),
        };
        match self.constants.iter_mut().find(|c| c.name == constant.name) {
            Some(slot) => *slot = constant,
            None => self.constants.push(constant),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_masses_with_relative_uncertainty() {
        let r = ConstantsRegistry::standard();
        let earth = r.get("Earth_mass").unwrap();
        assert!((earth.uncertainty / earth.value - 0.0006).abs() < 1e-15);
        assert_eq!(r.get("Earth_radius").unwrap().uncertainty, 0.0);
        assert!((r.get("pi").unwrap().value - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(r.len(), 8);
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut r = ConstantsRegistry::new();
        r.insert("k", 1.0, 0.1);
        r.insert("k", 2.0, -0.2);
        assert_eq!(r.len(), 1);
        let k = r.get("k").unwrap();
        assert_eq!(k.value, 2.0);
        assert_eq!(k.uncertainty, 0.2);
    }

    #[test]
    fn unknown_constant_has_no_value() {
        assert!(ConstantsRegistry::standard().get("Mars_mass").is_none());
    }
}
