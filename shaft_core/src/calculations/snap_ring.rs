//! # Snap Ring Sizing
//!
//! An external snap ring is checked as an annulus: the groove diameter is the
//! inner diameter and the ring's outer diameter is sized with the annular
//! form of the shaft stress formulas.
//!
//! The continuous outer diameter is solved over [d_in, 5.0] in, snapped up to
//! the snap-ring catalog, and stepped to the next larger entry until the FoS
//! at the catalog size meets the target. The returned outer diameter is
//! always a catalog entry.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::calculations::snap_ring::{calculate, SnapRingInput};
//! use shaft_core::calculations::stress::ShearModel;
//! use shaft_core::calculations::root_finder::BisectionSettings;
//! use shaft_core::catalogs::StandardCatalog;
//! use shaft_core::loads::SegmentLoads;
//! use shaft_core::materials::{Material, SteelGrade};
//!
//! let input = SnapRingInput::new(1.25, SegmentLoads::new(602.0, 995.0, 462.5));
//! let result = calculate(
//!     &input,
//!     &Material::from(SteelGrade::Aisi4140),
//!     2.0,
//!     ShearModel::IncludeDirectShear,
//!     &StandardCatalog::snap_ring_diameters(),
//!     &BisectionSettings::default(),
//! )
//! .unwrap();
//! assert!(result.fos >= 2.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::calculations::root_finder::{solve_for_target_fos, BisectionSettings, Bracket};
use crate::calculations::stress::{factor_of_safety, ConcentrationFactors, Section, ShearModel};
use crate::catalogs::StandardCatalog;
use crate::errors::{CalcError, CalcResult};
use crate::loads::SegmentLoads;
use crate::materials::Material;

/// Snap ring sizing input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapRingInput {
    /// Groove (inner) diameter, normally the shaft diameter (in)
    pub inner_diameter_in: f64,
    /// Worst-case loads at the ring
    pub loads: SegmentLoads,
    /// Concentration factors at the groove
    #[serde(default)]
    pub factors: ConcentrationFactors,
}

impl SnapRingInput {
    /// Input with no stress raiser
    pub fn new(inner_diameter_in: f64, loads: SegmentLoads) -> Self {
        SnapRingInput {
            inner_diameter_in,
            loads,
            factors: ConcentrationFactors::NONE,
        }
    }

    /// Set concentration factors
    pub fn with_factors(mut self, factors: ConcentrationFactors) -> Self {
        self.factors = factors;
        self
    }

    /// Validate the input
    pub fn validate(&self) -> CalcResult<()> {
        if !(self.inner_diameter_in.is_finite()
            && self.inner_diameter_in > 0.0
            && self.inner_diameter_in < Bracket::SNAP_RING_MAX_OD)
        {
            return Err(CalcError::invalid_input(
                "inner_diameter_in",
                self.inner_diameter_in.to_string(),
                format!(
                    "Groove diameter must be positive and below {} in",
                    Bracket::SNAP_RING_MAX_OD
                ),
            ));
        }
        self.factors.validate()
    }
}

/// Sized snap ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapRingResult {
    /// Groove diameter (in)
    pub inner_diameter_in: f64,
    /// Continuous outer diameter from the bisection (in)
    pub required_outer_diameter_in: f64,
    /// Catalog outer diameter (in)
    pub outer_diameter_in: f64,
    /// FoS at the catalog outer diameter
    pub fos: f64,
    /// Catalog step-ups taken after the first snap
    pub catalog_steps: usize,
}

/// Size a snap ring outer diameter
pub fn calculate(
    input: &SnapRingInput,
    material: &Material,
    target_fos: f64,
    shear_model: ShearModel,
    catalog: &StandardCatalog,
    settings: &BisectionSettings,
) -> CalcResult<SnapRingResult> {
    input.validate()?;
    catalog.validate()?;

    let inner = input.inner_diameter_in;
    let fos_at = |outer: f64| {
        factor_of_safety(
            material.yield_strength_psi,
            Section::annular(outer, inner),
            &input.loads,
            input.factors,
            shear_model,
        )
    };

    let required = solve_for_target_fos(
        Bracket::new(inner, Bracket::SNAP_RING_MAX_OD),
        target_fos,
        settings,
        "snap ring outer diameter",
        &fos_at,
    )?;
    if !required.is_converged() {
        tracing::warn!(
            required_outer_diameter_in = required.value,
            fos = required.fos,
            "snap ring bisection exhausted its budget"
        );
    }

    let mut outer = catalog.snap(required.value)?;
    let mut fos = fos_at(outer)?;
    let mut catalog_steps = 0;
    while fos < target_fos {
        outer = catalog.next_larger(outer)?;
        fos = fos_at(outer)?;
        catalog_steps += 1;
        tracing::debug!(outer_diameter_in = outer, fos, "snap ring stepped up");
    }

    tracing::info!(
        inner_diameter_in = inner,
        outer_diameter_in = outer,
        fos,
        "snap ring sized"
    );

    Ok(SnapRingResult {
        inner_diameter_in: inner,
        required_outer_diameter_in: required.value,
        outer_diameter_in: outer,
        fos,
        catalog_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::SteelGrade;

    fn gear_ring_loads() -> SegmentLoads {
        SegmentLoads::new(602.0, 995.0, 462.5)
    }

    fn solve(input: &SnapRingInput, material: Material, catalog: &StandardCatalog) -> CalcResult<SnapRingResult> {
        calculate(
            input,
            &material,
            2.0,
            ShearModel::IncludeDirectShear,
            catalog,
            &BisectionSettings::default(),
        )
    }

    #[test]
    fn test_outer_diameter_is_catalog_entry_with_target_fos() {
        let catalog = StandardCatalog::snap_ring_diameters();
        let input = SnapRingInput::new(1.25, gear_ring_loads());
        let result = solve(&input, SteelGrade::Aisi4140.into(), &catalog).unwrap();

        assert!(catalog.contains(result.outer_diameter_in));
        assert!(result.fos >= 2.0);
        assert!(result.outer_diameter_in >= result.required_outer_diameter_in);
        assert!(result.required_outer_diameter_in > 1.25);
    }

    #[test]
    fn test_concentration_factors_enlarge_ring() {
        let catalog = StandardCatalog::snap_ring_diameters();
        let plain = solve(
            &SnapRingInput::new(1.0, gear_ring_loads()),
            SteelGrade::Aisi4140.into(),
            &catalog,
        )
        .unwrap();
        let notched = solve(
            &SnapRingInput::new(1.0, gear_ring_loads())
                .with_factors(ConcentrationFactors::new(3.0, 5.0)),
            SteelGrade::Aisi4140.into(),
            &catalog,
        )
        .unwrap();
        assert!(notched.required_outer_diameter_in > plain.required_outer_diameter_in);
    }

    #[test]
    fn test_coarse_catalog_meets_target() {
        let catalog = StandardCatalog::new("coarse ring", vec![1.3, 1.6, 2.0, 3.0]).unwrap();
        let input = SnapRingInput::new(1.25, gear_ring_loads());
        let result = solve(&input, SteelGrade::Aisi4140.into(), &catalog).unwrap();
        assert!(catalog.contains(result.outer_diameter_in));
        assert!(result.fos >= 2.0);
    }

    #[test]
    fn test_catalog_exhausted() {
        let catalog = StandardCatalog::snap_ring_diameters();
        let heavy = SegmentLoads::new(5_000.0, 40_000.0, 20_000.0);
        let err = solve(&SnapRingInput::new(2.5, heavy), SteelGrade::Aisi1020.into(), &catalog)
            .unwrap_err();
        assert!(err.is_sizing_failure());
    }

    #[test]
    fn test_invalid_groove() {
        let catalog = StandardCatalog::snap_ring_diameters();
        for inner in [0.0, -1.0, 5.0, f64::NAN] {
            let err = solve(&SnapRingInput::new(inner, gear_ring_loads()), SteelGrade::Aisi4140.into(), &catalog)
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }
    }

    #[test]
    fn test_result_serialization() {
        let catalog = StandardCatalog::snap_ring_diameters();
        let result = solve(
            &SnapRingInput::new(0.75, gear_ring_loads()),
            SteelGrade::Aisi4140.into(),
            &catalog,
        )
        .unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let parsed: SnapRingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
