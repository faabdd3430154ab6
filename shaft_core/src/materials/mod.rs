//! # Materials
//!
//! A shaft material is a name plus a yield strength. Design files either pick
//! a tabulated steel grade or give a custom yield strength.
//!
//! ## JSON Serialization
//!
//! ```json
//! { "type": "Steel", "grade": "AISI 4140" }
//! { "type": "Custom", "name": "17-4 PH H1150", "yield_strength_psi": 105000.0 }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::materials::{MaterialSpec, SteelGrade};
//!
//! let spec = MaterialSpec::Steel { grade: SteelGrade::Aisi4140 };
//! let material = spec.resolve().unwrap();
//! assert_eq!(material.name, "4140 Steel");
//! assert_eq!(material.yield_strength_psi, 60_200.0);
//! ```

pub mod steel;

pub use steel::SteelGrade;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// A resolved material: name and yield strength.
///
/// Shared by reference across every segment of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Display name (e.g., "4140 Steel")
    pub name: String,
    /// Yield strength Sy (psi)
    pub yield_strength_psi: f64,
}

impl Material {
    /// Create a material, rejecting non-positive or non-finite yield strengths.
    pub fn new(name: impl Into<String>, yield_strength_psi: f64) -> CalcResult<Self> {
        let name = name.into();
        if !(yield_strength_psi.is_finite() && yield_strength_psi > 0.0) {
            return Err(CalcError::invalid_input(
                "yield_strength_psi",
                yield_strength_psi.to_string(),
                format!("Yield strength of '{}' must be positive", name),
            ));
        }
        if name.trim().is_empty() {
            return Err(CalcError::invalid_input("name", "", "Material name must not be empty"));
        }
        Ok(Material {
            name,
            yield_strength_psi,
        })
    }

    /// Look up a tabulated grade by name (see [`SteelGrade::from_str_flexible`]).
    pub fn from_name(name: &str) -> CalcResult<Self> {
        Ok(SteelGrade::from_str_flexible(name)?.into())
    }
}

impl From<SteelGrade> for Material {
    fn from(grade: SteelGrade) -> Self {
        Material {
            name: grade.display_name(),
            yield_strength_psi: grade.yield_strength_psi(),
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Sy = {:.0} psi)", self.name, self.yield_strength_psi)
    }
}

/// Material entry as written in a design file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MaterialSpec {
    /// Tabulated steel grade
    Steel { grade: SteelGrade },
    /// User-supplied yield strength
    Custom { name: String, yield_strength_psi: f64 },
}

impl MaterialSpec {
    /// Resolve to a validated [`Material`]
    pub fn resolve(&self) -> CalcResult<Material> {
        match self {
            MaterialSpec::Steel { grade } => Ok((*grade).into()),
            MaterialSpec::Custom {
                name,
                yield_strength_psi,
            } => Material::new(name.clone(), *yield_strength_psi),
        }
    }
}

impl From<SteelGrade> for MaterialSpec {
    fn from(grade: SteelGrade) -> Self {
        MaterialSpec::Steel { grade }
    }
}
