//! Shaft loads: worst-case magnitudes and load analysis
//!
//! A segment row in a design file carries a shear force, a bending moment and
//! a torque. Each may be a single number or a list of load cases written as a
//! string (`"-462 / 0 / 462 / 925"`, commas also accepted). Sizing only ever
//! uses the worst case, the largest absolute value.
//!
//! # Overview
//!
//! - [`LoadMagnitude`] - scalar or load-case list as written in a design file
//! - [`SegmentLoads`] - resolved worst-case V, M, T for one cross-section
//! - [`shaft_loads`] - singularity-function shear/moment/torque diagrams
//!
//! # Example
//!
//! ```
//! use shaft_core::loads::LoadMagnitude;
//!
//! let torque = LoadMagnitude::from("-462 / 0 / 462 / 925");
//! assert_eq!(torque.worst_case().unwrap(), 925.0);
//!
//! let moment = LoadMagnitude::from(-1254.0);
//! assert_eq!(moment.worst_case().unwrap(), 1254.0);
//! ```

pub mod shaft_loads;

pub use shaft_loads::{
    AppliedTorque, LoadAnalysis, LoadStation, PointLoad, ShaftLoadModel,
};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// A load magnitude as written in a design file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoadMagnitude {
    /// A single signed value
    Value(f64),
    /// Several load cases separated by `/` or `,`
    Cases(String),
}

impl LoadMagnitude {
    /// Largest absolute value over all load cases.
    ///
    /// An empty case list resolves to 0. An entry that is not a number is
    /// an `InvalidInput` error.
    pub fn worst_case(&self) -> CalcResult<f64> {
        match self {
            LoadMagnitude::Value(v) => {
                if v.is_finite() {
                    Ok(v.abs())
                } else {
                    Err(CalcError::invalid_input("load", v.to_string(), "Load must be finite"))
                }
            }
            LoadMagnitude::Cases(text) => {
                let mut worst = 0.0f64;
                for part in text.replace(',', "/").split('/') {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    // Accept the typographic minus sign that spreadsheets emit
                    let value: f64 = part.replace('\u{2212}', "-").parse().map_err(|_| {
                        CalcError::invalid_input(
                            "load",
                            text.clone(),
                            format!("'{}' is not a number", part),
                        )
                    })?;
                    if !value.is_finite() {
                        return Err(CalcError::invalid_input(
                            "load",
                            text.clone(),
                            "Load cases must be finite",
                        ));
                    }
                    worst = worst.max(value.abs());
                }
                Ok(worst)
            }
        }
    }
}

impl Default for LoadMagnitude {
    fn default() -> Self {
        LoadMagnitude::Value(0.0)
    }
}

impl From<f64> for LoadMagnitude {
    fn from(value: f64) -> Self {
        LoadMagnitude::Value(value)
    }
}

impl From<&str> for LoadMagnitude {
    fn from(text: &str) -> Self {
        LoadMagnitude::Cases(text.to_string())
    }
}

/// Worst-case loads at one shaft cross-section. All values are magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentLoads {
    /// Transverse shear force V (lbf)
    pub shear_lb: f64,
    /// Bending moment M (in-lbf)
    pub moment_inlb: f64,
    /// Torque T (in-lbf)
    pub torque_inlb: f64,
}

impl SegmentLoads {
    /// Create from magnitudes; signs are dropped.
    pub fn new(shear_lb: f64, moment_inlb: f64, torque_inlb: f64) -> Self {
        SegmentLoads {
            shear_lb: shear_lb.abs(),
            moment_inlb: moment_inlb.abs(),
            torque_inlb: torque_inlb.abs(),
        }
    }

    /// Resolve three design-file magnitudes to their worst cases
    pub fn resolve(
        shear: &LoadMagnitude,
        moment: &LoadMagnitude,
        torque: &LoadMagnitude,
    ) -> CalcResult<Self> {
        Ok(SegmentLoads {
            shear_lb: shear.worst_case()?,
            moment_inlb: moment.worst_case()?,
            torque_inlb: torque.worst_case()?,
        })
    }

    /// True when every component is zero
    pub fn is_unloaded(&self) -> bool {
        self.shear_lb == 0.0 && self.moment_inlb == 0.0 && self.torque_inlb == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_worst_case() {
        assert_eq!(LoadMagnitude::from(462.5).worst_case().unwrap(), 462.5);
        assert_eq!(LoadMagnitude::from(-462.5).worst_case().unwrap(), 462.5);
    }

    #[test]
    fn test_case_list_worst_case() {
        assert_eq!(LoadMagnitude::from("176/602").worst_case().unwrap(), 602.0);
        assert_eq!(
            LoadMagnitude::from("-462 / 0 / 462 / 925").worst_case().unwrap(),
            925.0
        );
        assert_eq!(LoadMagnitude::from("-1000, 20").worst_case().unwrap(), 1000.0);
        assert_eq!(LoadMagnitude::from("\u{2212}5 / 3").worst_case().unwrap(), 5.0);
    }

    #[test]
    fn test_empty_case_list() {
        assert_eq!(LoadMagnitude::from("").worst_case().unwrap(), 0.0);
        assert_eq!(LoadMagnitude::from(" / ").worst_case().unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_case_list() {
        let err = LoadMagnitude::from("12 / lots").worst_case().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(LoadMagnitude::from(f64::INFINITY).worst_case().is_err());
    }

    #[test]
    fn test_untagged_deserialization() {
        let scalar: LoadMagnitude = serde_json::from_str("925.0").unwrap();
        assert_eq!(scalar, LoadMagnitude::Value(925.0));

        let cases: LoadMagnitude = serde_json::from_str("\"176/602\"").unwrap();
        assert_eq!(cases, LoadMagnitude::Cases("176/602".to_string()));
    }

    #[test]
    fn test_segment_loads_resolution() {
        let loads = SegmentLoads::resolve(
            &LoadMagnitude::from("176/602"),
            &LoadMagnitude::from(1363.0),
            &LoadMagnitude::from(-462.5),
        )
        .unwrap();
        assert_eq!(loads, SegmentLoads::new(602.0, 1363.0, 462.5));
        assert!(!loads.is_unloaded());
        assert!(SegmentLoads::default().is_unloaded());
    }
}
