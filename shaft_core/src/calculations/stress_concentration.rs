//! # Shoulder Stress Concentration
//!
//! Bending and torsion factors (Kt, Kts) at a stepped round shaft with a
//! shoulder fillet, as a function of the two diameters and the fillet radius.
//!
//! [`ShoulderFilletFits`] uses power-law fits of the stepped round bar charts:
//!
//! ```text
//! K = A · (r/d)^b
//! ```
//!
//! with (A, b) tabulated against D/d. Between tabulated ratios A and b are
//! interpolated linearly; above the largest ratio they are clamped. Below the
//! smallest tabulated ratio K blends linearly to 1.0 at D/d = 1 (no shoulder).
//! K never drops below 1.0.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::calculations::stress_concentration::{
//!     ShoulderFilletFits, StressConcentration,
//! };
//!
//! // 1.25" bearing seat stepping down to 1.0", r = 0.1"
//! let k = ShoulderFilletFits.shoulder_factors(1.25, 1.0, 0.1).unwrap();
//! assert!(k.kt > 1.5 && k.kt < 1.8);
//! assert!(k.kts > 1.2 && k.kts < 1.5);
//! ```

use crate::calculations::stress::ConcentrationFactors;
use crate::errors::{CalcError, CalcResult};

/// Source of shoulder stress concentration factors.
///
/// Implementations must return factors ≥ 1 that do not increase with the
/// fillet radius.
pub trait StressConcentration {
    /// Short name for reports and logs
    fn name(&self) -> &str;

    /// Factors at a shoulder from `large_diameter_in` (D) down to
    /// `small_diameter_in` (d) with fillet radius `fillet_radius_in` (r).
    fn shoulder_factors(
        &self,
        large_diameter_in: f64,
        small_diameter_in: f64,
        fillet_radius_in: f64,
    ) -> CalcResult<ConcentrationFactors>;
}

/// One row of a curve-fit table: (D/d, A, b)
type FitRow = (f64, f64, f64);

/// Bending, stepped round bar, ascending D/d
const BENDING_FITS: [FitRow; 11] = [
    (1.01, 0.91938, -0.17032),
    (1.02, 0.96048, -0.17711),
    (1.03, 0.98061, -0.18381),
    (1.05, 0.98137, -0.19653),
    (1.07, 0.97527, -0.20958),
    (1.10, 0.95120, -0.23757),
    (1.20, 0.97098, -0.21796),
    (1.50, 0.93836, -0.25759),
    (2.00, 0.90879, -0.28598),
    (3.00, 0.89334, -0.30860),
    (6.00, 0.87868, -0.33243),
];

/// Torsion, stepped round bar, ascending D/d
const TORSION_FITS: [FitRow; 4] = [
    (1.09, 0.90337, -0.12692),
    (1.20, 0.83425, -0.21649),
    (1.33, 0.84897, -0.23161),
    (2.00, 0.86331, -0.23865),
];

/// Power-law chart fits for a shoulder fillet on a round shaft
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShoulderFilletFits;

impl ShoulderFilletFits {
    fn fit_factor(table: &[FitRow], diameter_ratio: f64, radius_ratio: f64) -> f64 {
        let (first, last) = match (table.first(), table.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 1.0,
        };

        let power_law = |a: f64, b: f64| (a * radius_ratio.powf(b)).max(1.0);

        if diameter_ratio <= first.0 {
            // Blend to no concentration as the shoulder vanishes
            let k_first = power_law(first.1, first.2);
            let t = ((diameter_ratio - 1.0) / (first.0 - 1.0)).clamp(0.0, 1.0);
            return 1.0 + (k_first - 1.0) * t;
        }
        if diameter_ratio >= last.0 {
            return power_law(last.1, last.2);
        }

        for pair in table.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if diameter_ratio <= hi.0 {
                let t = (diameter_ratio - lo.0) / (hi.0 - lo.0);
                let a = lo.1 + t * (hi.1 - lo.1);
                let b = lo.2 + t * (hi.2 - lo.2);
                return power_law(a, b);
            }
        }
        power_law(last.1, last.2)
    }
}

impl StressConcentration for ShoulderFilletFits {
    fn name(&self) -> &str {
        "shoulder fillet chart fits"
    }

    fn shoulder_factors(
        &self,
        large_diameter_in: f64,
        small_diameter_in: f64,
        fillet_radius_in: f64,
    ) -> CalcResult<ConcentrationFactors> {
        if !(small_diameter_in.is_finite() && small_diameter_in > 0.0) {
            return Err(CalcError::degenerate_geometry(
                "small_diameter_in",
                format!("shoulder diameter must be positive, got {}", small_diameter_in),
            ));
        }
        if !(fillet_radius_in.is_finite() && fillet_radius_in > 0.0) {
            return Err(CalcError::degenerate_geometry(
                "fillet_radius_in",
                format!("fillet radius must be positive, got {}", fillet_radius_in),
            ));
        }
        if !(large_diameter_in.is_finite() && large_diameter_in >= small_diameter_in) {
            return Err(CalcError::degenerate_geometry(
                "large_diameter_in",
                format!(
                    "D = {} must be at least d = {}",
                    large_diameter_in, small_diameter_in
                ),
            ));
        }

        let diameter_ratio = large_diameter_in / small_diameter_in;
        let radius_ratio = fillet_radius_in / small_diameter_in;

        Ok(ConcentrationFactors {
            kt: Self::fit_factor(&BENDING_FITS, diameter_ratio, radius_ratio),
            kts: Self::fit_factor(&TORSION_FITS, diameter_ratio, radius_ratio),
        })
    }
}
