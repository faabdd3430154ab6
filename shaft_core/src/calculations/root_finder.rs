//! # Bisection FoS Solver
//!
//! Every sizing task in the crate reduces to the same question: which value
//! of one dimension makes the factor of safety equal the target? The FoS of
//! every sized dimension here (shaft diameter, key length, key height, ring
//! outer diameter) increases with the dimension, so a plain bisection on the
//! bracket finds it.
//!
//! The upper bound is checked before bisecting. If even the largest allowed
//! dimension is below the target the solver returns
//! [`CalcError::TargetUnreachable`] rather than a value pinned to the bound.
//! The lower bound is never evaluated; for an annulus it is a zero-area ring.
//! When every midpoint beats the target, the dimension is governed by the
//! lower bound and the result is tagged [`ConvergenceStatus::AtLowerBound`].
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::calculations::root_finder::{
//!     solve_for_target_fos, BisectionSettings, Bracket, ConvergenceStatus,
//! };
//!
//! // FoS = 8·x³ reaches 2.0 at x = 0.63
//! let solved = solve_for_target_fos(
//!     Bracket::new(0.1, 5.0),
//!     2.0,
//!     &BisectionSettings::default(),
//!     "x",
//!     |x| Ok(8.0 * x * x * x),
//! )
//! .unwrap();
//! assert_eq!(solved.status, ConvergenceStatus::Converged);
//! assert!((solved.value - 0.25f64.cbrt()).abs() < 1e-4);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Default iteration budget
pub const MAX_ITERATIONS: usize = 100;

/// Default absolute FoS tolerance for early exit
pub const FOS_TOLERANCE: f64 = 1e-5;

/// Search interval for a sized dimension (in)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    /// Lower bound, never evaluated
    pub low: f64,
    /// Upper bound, checked before bisecting
    pub high: f64,
}

impl Bracket {
    /// Solid shaft diameter bracket (in)
    pub const SHAFT_DIAMETER: Bracket = Bracket { low: 0.1, high: 5.0 };
    /// Key length bracket (in)
    pub const KEY_LENGTH: Bracket = Bracket { low: 0.01, high: 5.0 };
    /// Key height bracket (in)
    pub const KEY_HEIGHT: Bracket = Bracket { low: 0.01, high: 2.0 };
    /// Upper bound for a snap-ring outer diameter (in); the lower bound is the
    /// groove diameter
    pub const SNAP_RING_MAX_OD: f64 = 5.0;

    /// Create a bracket
    pub fn new(low: f64, high: f64) -> Self {
        Bracket { low, high }
    }

    /// Require finite bounds with low < high
    pub fn validate(&self) -> CalcResult<()> {
        if !(self.low.is_finite() && self.high.is_finite() && self.low < self.high) {
            return Err(CalcError::invalid_input(
                "bracket",
                format!("[{}, {}]", self.low, self.high),
                "Bracket bounds must be finite with low < high",
            ));
        }
        Ok(())
    }
}

/// Bisection budget and tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BisectionSettings {
    /// Maximum number of FoS evaluations at a midpoint
    pub max_iterations: usize,
    /// Stop once |FoS − target| is below this
    pub fos_tolerance: f64,
}

impl Default for BisectionSettings {
    fn default() -> Self {
        BisectionSettings {
            max_iterations: MAX_ITERATIONS,
            fos_tolerance: FOS_TOLERANCE,
        }
    }
}

impl BisectionSettings {
    /// Check settings are usable
    pub fn validate(&self) -> CalcResult<()> {
        if self.max_iterations == 0 {
            return Err(CalcError::invalid_input(
                "max_iterations",
                "0",
                "Bisection needs at least one iteration",
            ));
        }
        if !(self.fos_tolerance.is_finite() && self.fos_tolerance > 0.0) {
            return Err(CalcError::invalid_input(
                "fos_tolerance",
                self.fos_tolerance.to_string(),
                "FoS tolerance must be positive",
            ));
        }
        Ok(())
    }
}

/// How a bisection run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// FoS tolerance met
    Converged,
    /// Every midpoint exceeded the target; the value is the smallest
    /// dimension evaluated, just above the lower bound
    AtLowerBound,
    /// Iteration budget used without meeting the tolerance
    BudgetExhausted,
}

impl ConvergenceStatus {
    /// True when the value meets the target (within tolerance or above it)
    pub fn meets_target(&self) -> bool {
        !matches!(self, ConvergenceStatus::BudgetExhausted)
    }
}

/// A solved dimension and the FoS it gives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolvedDimension {
    /// Dimension value (in)
    pub value: f64,
    /// Factor of safety at `value`
    pub fos: f64,
    /// Midpoint evaluations used
    pub iterations: usize,
    /// Convergence tag
    pub status: ConvergenceStatus,
}

impl SolvedDimension {
    /// Whether the value meets the target; `AtLowerBound` counts
    pub fn is_converged(&self) -> bool {
        self.status.meets_target()
    }

    /// Turn a `BudgetExhausted` result into a `NotConverged` error
    pub fn ensure_converged(self, quantity: &str) -> CalcResult<Self> {
        match self.status {
            ConvergenceStatus::Converged | ConvergenceStatus::AtLowerBound => Ok(self),
            ConvergenceStatus::BudgetExhausted => {
                Err(CalcError::not_converged(quantity, self.iterations))
            }
        }
    }
}

/// Find the dimension in `bracket` whose FoS equals `target_fos`.
///
/// `fos_at` must be non-decreasing in the dimension. Errors it returns are
/// propagated unchanged.
pub fn solve_for_target_fos<F>(
    bracket: Bracket,
    target_fos: f64,
    settings: &BisectionSettings,
    quantity: &str,
    mut fos_at: F,
) -> CalcResult<SolvedDimension>
where
    F: FnMut(f64) -> CalcResult<f64>,
{
    bracket.validate()?;
    settings.validate()?;
    if !(target_fos.is_finite() && target_fos > 0.0) {
        return Err(CalcError::invalid_input(
            "target_fos",
            target_fos.to_string(),
            "Target factor of safety must be positive",
        ));
    }

    let fos_high = fos_at(bracket.high)?;
    if fos_high < target_fos - settings.fos_tolerance {
        return Err(CalcError::target_unreachable(
            quantity,
            target_fos,
            bracket.high,
            fos_high,
        ));
    }

    let mut low = bracket.low;
    let mut high = bracket.high;
    let mut mid = high;
    let mut fos_mid = fos_high;
    let mut low_moved = false;

    for iteration in 1..=settings.max_iterations {
        mid = 0.5 * (low + high);
        fos_mid = fos_at(mid)?;
        tracing::trace!(quantity, iteration, mid, fos = fos_mid, "bisection step");

        if (fos_mid - target_fos).abs() < settings.fos_tolerance {
            return Ok(SolvedDimension {
                value: mid,
                fos: fos_mid,
                iterations: iteration,
                status: ConvergenceStatus::Converged,
            });
        }
        if fos_mid > target_fos {
            high = mid;
        } else {
            low = mid;
            low_moved = true;
        }
    }

    if !low_moved && fos_mid > target_fos {
        tracing::debug!(
            quantity,
            value = mid,
            fos = fos_mid,
            "target exceeded down to the lower bound"
        );
        return Ok(SolvedDimension {
            value: mid,
            fos: fos_mid,
            iterations: settings.max_iterations,
            status: ConvergenceStatus::AtLowerBound,
        });
    }

    tracing::debug!(
        quantity,
        iterations = settings.max_iterations,
        value = mid,
        fos = fos_mid,
        "bisection budget exhausted"
    );
    Ok(SolvedDimension {
        value: mid,
        fos: fos_mid,
        iterations: settings.max_iterations,
        status: ConvergenceStatus::BudgetExhausted,
    })
}
