//! # Keyway Sizing
//!
//! Parallel key in a shaft keyseat transmitting torque T.
//!
//! ## Formulas
//!
//! - Key force at the shaft surface: F = T / (d/2)
//! - Shear across the key: τ = F / (L·w), equivalent stress √3·τ
//! - Bearing on the keyseat wall: σ = F / (L·H/2)
//! - Governing stress = max(√3·τ, σ); FoS = Sy / governing
//!
//! The FoS grows with both length and height, but the height only helps the
//! bearing check. A torque large enough to fail the key in shear cannot be
//! fixed by a taller key, so a height solve can be unreachable.
//!
//! ## Joint selection
//!
//! [`calculate`] picks a catalog key and its length:
//!
//! 1. Required width is d/4.
//! 2. Required height is the height solve at the maximum allowed length.
//! 3. The first catalog key covering both is selected (largest key, flagged,
//!    when none does).
//! 4. The length is solved for the selected key and checked against the
//!    maximum.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::calculations::keyway::{calculate, KeywayInput};
//! use shaft_core::calculations::root_finder::BisectionSettings;
//! use shaft_core::materials::{Material, SteelGrade};
//!
//! let input = KeywayInput::new(462.5, 1.25, 1.5);
//! let material = Material::from(SteelGrade::Aisi4140);
//! let result = calculate(&input, &material, 2.0, &BisectionSettings::default()).unwrap();
//! assert_eq!(result.key.width_in, 0.3125);
//! assert!(result.length_in < 1.5);
//! assert!(!result.fallback);
//! ```

use serde::{Deserialize, Serialize};

use crate::calculations::root_finder::{
    solve_for_target_fos, BisectionSettings, Bracket, ConvergenceStatus, SolvedDimension,
};
use crate::catalogs::{KeyCatalog, KeySize};
use crate::errors::{CalcError, CalcResult};
use crate::materials::Material;

fn require_positive(quantity: &str, value: f64) -> CalcResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CalcError::degenerate_geometry(
            quantity,
            format!("must be positive, got {}", value),
        ))
    }
}

/// Tangential force on the key (lbf)
pub fn key_force(torque_inlb: f64, shaft_diameter_in: f64) -> CalcResult<f64> {
    require_positive("shaft_diameter_in", shaft_diameter_in)?;
    Ok(torque_inlb.abs() / (shaft_diameter_in / 2.0))
}

/// Stress components in a key (psi)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyStress {
    /// Direct shear τ
    pub shear_psi: f64,
    /// Von Mises equivalent of the shear, √3·τ
    pub shear_equivalent_psi: f64,
    /// Bearing stress on half the key height
    pub bearing_psi: f64,
    /// Larger of the two checks
    pub governing_psi: f64,
}

/// Key stresses for length `L`, width `w`, height `H`
pub fn key_stress(
    torque_inlb: f64,
    shaft_diameter_in: f64,
    length_in: f64,
    width_in: f64,
    height_in: f64,
) -> CalcResult<KeyStress> {
    require_positive("key length_in", length_in)?;
    require_positive("key width_in", width_in)?;
    require_positive("key height_in", height_in)?;
    let force = key_force(torque_inlb, shaft_diameter_in)?;

    let shear_psi = force / (length_in * width_in);
    let shear_equivalent_psi = 3.0f64.sqrt() * shear_psi;
    let bearing_psi = force / (length_in * height_in / 2.0);

    Ok(KeyStress {
        shear_psi,
        shear_equivalent_psi,
        bearing_psi,
        governing_psi: shear_equivalent_psi.max(bearing_psi),
    })
}

/// Factor of safety of a key. An unloaded key is infinitely safe.
pub fn key_fos(
    yield_strength_psi: f64,
    torque_inlb: f64,
    shaft_diameter_in: f64,
    length_in: f64,
    width_in: f64,
    height_in: f64,
) -> CalcResult<f64> {
    let stress = key_stress(torque_inlb, shaft_diameter_in, length_in, width_in, height_in)?;
    if stress.governing_psi == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(yield_strength_psi / stress.governing_psi)
}

fn unloaded(bracket: Bracket) -> SolvedDimension {
    SolvedDimension {
        value: bracket.low,
        fos: f64::INFINITY,
        iterations: 0,
        status: ConvergenceStatus::AtLowerBound,
    }
}

/// Minimum key length for the target FoS, over [0.01, 5.0] in
pub fn size_key_length(
    torque_inlb: f64,
    shaft_diameter_in: f64,
    width_in: f64,
    height_in: f64,
    material: &Material,
    target_fos: f64,
    settings: &BisectionSettings,
) -> CalcResult<SolvedDimension> {
    if torque_inlb == 0.0 {
        return Ok(unloaded(Bracket::KEY_LENGTH));
    }
    solve_for_target_fos(Bracket::KEY_LENGTH, target_fos, settings, "key length", |l| {
        key_fos(
            material.yield_strength_psi,
            torque_inlb,
            shaft_diameter_in,
            l,
            width_in,
            height_in,
        )
    })
}

/// Minimum key height for the target FoS, over [0.01, 2.0] in
pub fn size_key_height(
    torque_inlb: f64,
    shaft_diameter_in: f64,
    length_in: f64,
    width_in: f64,
    material: &Material,
    target_fos: f64,
    settings: &BisectionSettings,
) -> CalcResult<SolvedDimension> {
    if torque_inlb == 0.0 {
        return Ok(unloaded(Bracket::KEY_HEIGHT));
    }
    solve_for_target_fos(Bracket::KEY_HEIGHT, target_fos, settings, "key height", |h| {
        key_fos(
            material.yield_strength_psi,
            torque_inlb,
            shaft_diameter_in,
            length_in,
            width_in,
            h,
        )
    })
}

fn default_max_length() -> f64 {
    1.5
}

/// Keyway sizing input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywayInput {
    /// Transmitted torque (in-lbf)
    pub torque_inlb: f64,
    /// Shaft diameter at the keyseat (in)
    pub shaft_diameter_in: f64,
    /// Longest key the hub allows (in)
    #[serde(default = "default_max_length")]
    pub max_length_in: f64,
    /// Key sizes to choose from
    #[serde(default)]
    pub catalog: KeyCatalog,
}

impl KeywayInput {
    /// Input using the standard key catalog
    pub fn new(torque_inlb: f64, shaft_diameter_in: f64, max_length_in: f64) -> Self {
        KeywayInput {
            torque_inlb,
            shaft_diameter_in,
            max_length_in,
            catalog: KeyCatalog::standard(),
        }
    }

    /// Validate the input
    pub fn validate(&self) -> CalcResult<()> {
        if !self.torque_inlb.is_finite() {
            return Err(CalcError::invalid_input(
                "torque_inlb",
                self.torque_inlb.to_string(),
                "Torque must be finite",
            ));
        }
        require_positive("shaft_diameter_in", self.shaft_diameter_in)?;
        if !(self.max_length_in.is_finite()
            && self.max_length_in > Bracket::KEY_LENGTH.low
            && self.max_length_in <= Bracket::KEY_LENGTH.high)
        {
            return Err(CalcError::invalid_input(
                "max_length_in",
                self.max_length_in.to_string(),
                format!(
                    "Maximum key length must be within ({}, {}] in",
                    Bracket::KEY_LENGTH.low,
                    Bracket::KEY_LENGTH.high
                ),
            ));
        }
        if self.catalog.sizes.is_empty() {
            return Err(CalcError::invalid_input("catalog", "[]", "Key catalog has no sizes"));
        }
        Ok(())
    }
}

/// Selected key and its length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywayResult {
    /// Shaft diameter at the keyseat (in)
    pub shaft_diameter_in: f64,
    /// Key force (lbf)
    pub key_force_lb: f64,
    /// Width rule d/4 (in)
    pub required_width_in: f64,
    /// Height needed at the maximum length (in)
    pub required_height_in: f64,
    /// Selected catalog key
    pub key: KeySize,
    /// True when no catalog key covered the required section
    pub fallback: bool,
    /// Required key length for the selected key (in)
    pub length_in: f64,
    /// Stresses at the selected key and length
    pub stress: KeyStress,
    /// FoS at the selected key and length (`None` when unloaded)
    pub fos: Option<f64>,
}

/// Select a catalog key and solve its length
pub fn calculate(
    input: &KeywayInput,
    material: &Material,
    target_fos: f64,
    settings: &BisectionSettings,
) -> CalcResult<KeywayResult> {
    input.validate()?;
    let torque = input.torque_inlb.abs();
    let d = input.shaft_diameter_in;

    let required_width_in = d / 4.0;
    let height = size_key_height(
        torque,
        d,
        input.max_length_in,
        required_width_in,
        material,
        target_fos,
        settings,
    )
    .map_err(|err| match err {
        CalcError::TargetUnreachable { fos_at_bound, .. } => CalcError::infeasible(
            "key",
            format!(
                "a {:.4} in wide key at the {:.4} in maximum length reaches FoS {:.3} at any height, target {}",
                required_width_in, input.max_length_in, fos_at_bound, target_fos
            ),
        ),
        other => other,
    })?;

    let selection = input.catalog.select(required_width_in, height.value)?;
    let key = selection.size;

    let length = size_key_length(
        torque,
        d,
        key.width_in,
        key.height_in,
        material,
        target_fos,
        settings,
    )
    .map_err(|err| match err {
        CalcError::TargetUnreachable { fos_at_bound, bound, .. } => CalcError::infeasible(
            "key",
            format!(
                "key {} reaches FoS {:.3} at the {:.4} in length bound, target {}",
                key.label(),
                fos_at_bound,
                bound,
                target_fos
            ),
        ),
        other => other,
    })?;

    if length.value > input.max_length_in {
        return Err(CalcError::infeasible(
            "key",
            format!(
                "key {} needs {:.4} in, longer than the {:.4} in maximum",
                key.label(),
                length.value,
                input.max_length_in
            ),
        ));
    }

    let stress = key_stress(torque, d, length.value, key.width_in, key.height_in)?;
    let fos = key_fos(
        material.yield_strength_psi,
        torque,
        d,
        length.value,
        key.width_in,
        key.height_in,
    )?;

    tracing::info!(
        shaft_diameter_in = d,
        key = %key.label(),
        length_in = length.value,
        fallback = selection.fallback,
        "keyway sized"
    );

    Ok(KeywayResult {
        shaft_diameter_in: d,
        key_force_lb: key_force(torque, d)?,
        required_width_in,
        required_height_in: height.value,
        key,
        fallback: selection.fallback,
        length_in: length.value,
        stress,
        fos: Some(fos).filter(|f| f.is_finite()),
    })
}
