//! # Stress Evaluator
//!
//! Von Mises equivalent stress at the outer fibre of a round shaft section
//! under bending, torsion and transverse shear.
//!
//! ## Formulas
//!
//! - Solid: J = πd⁴/32, I = πd⁴/64, c = d/2
//! - Annular: d⁴ becomes (d_o⁴ − d_i⁴), c = d_o/2
//! - σ_b = Kt·c·M/I, τ_t = Kts·c·T/J
//! - τ_v = 16V / (3π·d²), with (d_o² − d_i²) for annular sections
//! - σ' = √(σ_b² + 3(τ_t + τ_v)²)
//! - FoS = Sy / σ'
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::calculations::stress::{factor_of_safety, Section, ShearModel};
//! use shaft_core::calculations::ConcentrationFactors;
//! use shaft_core::loads::SegmentLoads;
//!
//! let loads = SegmentLoads::new(176.0, 1254.0, 925.0);
//! let fos = factor_of_safety(
//!     60_200.0,
//!     Section::solid(1.0),
//!     &loads,
//!     ConcentrationFactors::NONE,
//!     ShearModel::IncludeDirectShear,
//! )
//! .unwrap();
//! assert!(fos > 3.0);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::loads::SegmentLoads;

/// Whether the direct transverse shear term τ_v enters the combined shear.
///
/// At a shouldered section torsional shear usually dominates and τ_v is
/// often neglected. Neither choice is forced; the design file states which
/// one it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShearModel {
    /// τ = τ_t + 16V/(3πd²)
    #[default]
    IncludeDirectShear,
    /// τ = τ_t
    NeglectDirectShear,
}

impl ShearModel {
    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ShearModel::IncludeDirectShear => "torsion + direct shear",
            ShearModel::NeglectDirectShear => "torsion only",
        }
    }
}

/// Stress concentration factors at a section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationFactors {
    /// Bending factor Kt
    pub kt: f64,
    /// Torsion factor Kts
    pub kts: f64,
}

impl ConcentrationFactors {
    /// No stress raiser (Kt = Kts = 1)
    pub const NONE: ConcentrationFactors = ConcentrationFactors { kt: 1.0, kts: 1.0 };

    /// Create a factor pair
    pub fn new(kt: f64, kts: f64) -> Self {
        ConcentrationFactors { kt, kts }
    }

    /// Reject factors below 1 or non-finite
    pub fn validate(&self) -> CalcResult<()> {
        for (field, value) in [("kt", self.kt), ("kts", self.kts)] {
            if !(value.is_finite() && value >= 1.0) {
                return Err(CalcError::invalid_input(
                    field,
                    value.to_string(),
                    "Stress concentration factors must be finite and at least 1.0",
                ));
            }
        }
        Ok(())
    }
}

impl Default for ConcentrationFactors {
    fn default() -> Self {
        ConcentrationFactors::NONE
    }
}

/// A round cross-section (in)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Section {
    /// Solid round shaft
    Solid { diameter_in: f64 },
    /// Ring between an inner and outer diameter (snap rings)
    Annular {
        outer_diameter_in: f64,
        inner_diameter_in: f64,
    },
}

impl Section {
    /// Solid section of diameter `d`
    pub fn solid(diameter_in: f64) -> Self {
        Section::Solid { diameter_in }
    }

    /// Annular section
    pub fn annular(outer_diameter_in: f64, inner_diameter_in: f64) -> Self {
        Section::Annular {
            outer_diameter_in,
            inner_diameter_in,
        }
    }

    /// Reject zero, negative, inverted or non-finite geometry before it
    /// reaches a division.
    pub fn validate(&self) -> CalcResult<()> {
        match *self {
            Section::Solid { diameter_in } => {
                if !(diameter_in.is_finite() && diameter_in > 0.0) {
                    return Err(CalcError::degenerate_geometry(
                        "diameter_in",
                        format!("diameter must be positive, got {}", diameter_in),
                    ));
                }
            }
            Section::Annular {
                outer_diameter_in,
                inner_diameter_in,
            } => {
                if !(inner_diameter_in.is_finite() && inner_diameter_in >= 0.0) {
                    return Err(CalcError::degenerate_geometry(
                        "inner_diameter_in",
                        format!("inner diameter must be non-negative, got {}", inner_diameter_in),
                    ));
                }
                if !(outer_diameter_in.is_finite() && outer_diameter_in > inner_diameter_in) {
                    return Err(CalcError::degenerate_geometry(
                        "outer_diameter_in",
                        format!(
                            "outer diameter {} must exceed inner diameter {}",
                            outer_diameter_in, inner_diameter_in
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// d⁴ for solid, d_o⁴ − d_i⁴ for annular
    fn fourth_power_term(&self) -> f64 {
        match *self {
            Section::Solid { diameter_in } => diameter_in.powi(4),
            Section::Annular {
                outer_diameter_in,
                inner_diameter_in,
            } => outer_diameter_in.powi(4) - inner_diameter_in.powi(4),
        }
    }

    /// d² for solid, d_o² − d_i² for annular
    fn square_term(&self) -> f64 {
        match *self {
            Section::Solid { diameter_in } => diameter_in.powi(2),
            Section::Annular {
                outer_diameter_in,
                inner_diameter_in,
            } => outer_diameter_in.powi(2) - inner_diameter_in.powi(2),
        }
    }

    /// Polar moment J (in⁴)
    pub fn polar_moment_in4(&self) -> f64 {
        PI / 32.0 * self.fourth_power_term()
    }

    /// Area moment I (in⁴)
    pub fn area_moment_in4(&self) -> f64 {
        PI / 64.0 * self.fourth_power_term()
    }

    /// Outer fibre distance c (in)
    pub fn outer_fiber_in(&self) -> f64 {
        match *self {
            Section::Solid { diameter_in } => diameter_in / 2.0,
            Section::Annular {
                outer_diameter_in, ..
            } => outer_diameter_in / 2.0,
        }
    }
}

/// Stress components at the outer fibre (psi)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressState {
    /// Bending stress σ_b
    pub bending_psi: f64,
    /// Torsional shear τ_t
    pub torsion_psi: f64,
    /// Direct transverse shear τ_v (0 when neglected)
    pub direct_shear_psi: f64,
    /// Von Mises equivalent σ'
    pub von_mises_psi: f64,
}

/// Evaluate the stress state at a section.
///
/// Geometry is validated first; a degenerate section is an error, never an
/// infinite stress.
pub fn evaluate(
    section: Section,
    loads: &SegmentLoads,
    factors: ConcentrationFactors,
    shear_model: ShearModel,
) -> CalcResult<StressState> {
    section.validate()?;

    let c = section.outer_fiber_in();
    let i = section.area_moment_in4();
    let j = section.polar_moment_in4();

    let bending_psi = factors.kt * c * loads.moment_inlb / i;
    let torsion_psi = factors.kts * c * loads.torque_inlb / j;
    let direct_shear_psi = match shear_model {
        ShearModel::IncludeDirectShear => 16.0 * loads.shear_lb / (3.0 * PI * section.square_term()),
        ShearModel::NeglectDirectShear => 0.0,
    };

    let tau = torsion_psi + direct_shear_psi;
    let von_mises_psi = (bending_psi.powi(2) + 3.0 * tau.powi(2)).sqrt();

    Ok(StressState {
        bending_psi,
        torsion_psi,
        direct_shear_psi,
        von_mises_psi,
    })
}

/// Von Mises equivalent stress (psi)
pub fn von_mises_stress(
    section: Section,
    loads: &SegmentLoads,
    factors: ConcentrationFactors,
    shear_model: ShearModel,
) -> CalcResult<f64> {
    Ok(evaluate(section, loads, factors, shear_model)?.von_mises_psi)
}

/// Factor of safety Sy / σ'. An unloaded section has an infinite factor.
pub fn factor_of_safety(
    yield_strength_psi: f64,
    section: Section,
    loads: &SegmentLoads,
    factors: ConcentrationFactors,
    shear_model: ShearModel,
) -> CalcResult<f64> {
    if !(yield_strength_psi.is_finite() && yield_strength_psi > 0.0) {
        return Err(CalcError::invalid_input(
            "yield_strength_psi",
            yield_strength_psi.to_string(),
            "Yield strength must be positive",
        ));
    }
    let sigma = von_mises_stress(section, loads, factors, shear_model)?;
    if sigma == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(yield_strength_psi / sigma)
}
