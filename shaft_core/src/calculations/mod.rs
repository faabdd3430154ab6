//! # Shaft Calculations
//!
//! This module contains the sizing calculations. Each component calculation
//! follows the pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable)
//! - `*Result` / `*Solution` - Calculation results (JSON-serializable)
//! - `calculate(input, ..) -> Result<*Result, CalcError>` - Pure calculation function
//!
//! Two primitives serve every sizer: the von Mises evaluator in [`stress`]
//! and the bisection FoS solver in [`root_finder`].
//!
//! ## Available Calculations
//!
//! - [`stress`] - Combined stress and FoS at a solid or annular section
//! - [`root_finder`] - Bisection on one dimension to reach a target FoS
//! - [`stress_concentration`] - Shoulder fillet Kt, Kts
//! - [`shaft`] - Coupled diameter sizing with catalog snapping
//! - [`keyway`] - Key selection and length
//! - [`snap_ring`] - Snap ring outer diameter

pub mod keyway;
pub mod root_finder;
pub mod shaft;
pub mod snap_ring;
pub mod stress;
pub mod stress_concentration;

// Re-export commonly used types
pub use keyway::{KeywayInput, KeywayResult};
pub use root_finder::{BisectionSettings, Bracket, ConvergenceStatus, SolvedDimension};
pub use shaft::{
    SegmentInput, SegmentResult, ShaftSizingInput, ShaftSolution, SolveStatus, SolverSettings,
};
pub use snap_ring::{SnapRingInput, SnapRingResult};
pub use stress::{ConcentrationFactors, Section, ShearModel};
pub use stress_concentration::{ShoulderFilletFits, StressConcentration};
