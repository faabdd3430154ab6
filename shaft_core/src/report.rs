//! # Design Reports
//!
//! One [`DesignReport`] per (material, target FoS) run, collected in a
//! [`StudyReport`]. Reports serialize to JSON for downstream tools and render
//! as a plain text table through `Display`.
//!
//! Component results that can fail on their own (key, snap ring) are wrapped
//! in [`ComponentOutcome`] so one failed component never hides the others.
//!
//! ## JSON Serialization
//!
//! ```json
//! { "outcome": "Sized", "value": { "outer_diameter_in": 1.4375, ... } }
//! { "outcome": "Failed", "value": { "type": "OutOfRange", "details": { ... } } }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::keyway::KeywayResult;
use crate::calculations::shaft::{ShaftSolution, SolveStatus};
use crate::calculations::snap_ring::SnapRingResult;
use crate::calculations::stress::ShearModel;
use crate::errors::{CalcError, CalcResult};
use crate::loads::shaft_loads::LoadAnalysisResult;
use crate::materials::Material;

/// A component that was either sized or failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value")]
pub enum ComponentOutcome<T> {
    /// Sizing succeeded
    Sized(T),
    /// Sizing failed; sibling components are unaffected
    Failed(CalcError),
}

impl<T> ComponentOutcome<T> {
    /// Wrap a calculation result
    pub fn from_result(result: CalcResult<T>) -> Self {
        match result {
            Ok(value) => ComponentOutcome::Sized(value),
            Err(err) => ComponentOutcome::Failed(err),
        }
    }

    /// The sized value, if any
    pub fn sized(&self) -> Option<&T> {
        match self {
            ComponentOutcome::Sized(value) => Some(value),
            ComponentOutcome::Failed(_) => None,
        }
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&CalcError> {
        match self {
            ComponentOutcome::Sized(_) => None,
            ComponentOutcome::Failed(err) => Some(err),
        }
    }

    /// True when sized
    pub fn is_sized(&self) -> bool {
        matches!(self, ComponentOutcome::Sized(_))
    }
}

/// Results of one material × target FoS run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReport {
    /// Shaft material
    pub material: Material,
    /// Target factor of safety
    pub target_fos: f64,
    /// Direct shear treatment
    pub shear_model: ShearModel,
    /// Per-segment shaft sizing
    pub shaft: ShaftSolution,
    /// Key selection, when the design has a keyway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyway: Option<ComponentOutcome<KeywayResult>>,
    /// Snap ring, when the design has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_ring: Option<ComponentOutcome<SnapRingResult>>,
}

impl DesignReport {
    /// True when the shaft converged and every component was sized
    pub fn is_clean(&self) -> bool {
        self.shaft.status == SolveStatus::Converged
            && self.keyway.as_ref().map_or(true, |k| k.is_sized())
            && self.snap_ring.as_ref().map_or(true, |s| s.is_sized())
    }
}

/// All runs of a design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    /// Job number of the design
    pub job_id: String,
    /// Design description
    pub description: String,
    /// Responsible engineer
    pub engineer: String,
    /// When the report was produced
    pub generated: DateTime<Utc>,
    /// One entry per (target FoS, material), FoS-major
    pub runs: Vec<DesignReport>,
}

impl StudyReport {
    /// Find the run for a material name and target FoS
    pub fn find(&self, material_name: &str, target_fos: f64) -> Option<&DesignReport> {
        self.runs
            .iter()
            .find(|r| r.material.name == material_name && r.target_fos == target_fos)
    }

    /// True when every run is clean
    pub fn all_clean(&self) -> bool {
        self.runs.iter().all(DesignReport::is_clean)
    }

    /// Pretty JSON
    pub fn to_json_pretty(&self) -> CalcResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CalcError::SerializationError {
            reason: e.to_string(),
        })
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

impl fmt::Display for DesignReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target FoS = {}", self.target_fos)?;
        writeln!(f, "{}, {}", self.material, self.shear_model.display_name())?;
        writeln!(f)?;

        let width = self
            .shaft
            .segments
            .iter()
            .map(|s| s.name.chars().count())
            .max()
            .unwrap_or(8)
            .max(8);

        writeln!(
            f,
            "{:<width$}  {:>10}  {:>10}  {:>6}  {:>6}  {:>7}",
            "Location",
            "Req d (in)",
            "Std d (in)",
            "Kt",
            "Kts",
            "FoS",
            width = width
        )?;
        for s in &self.shaft.segments {
            write!(
                f,
                "{:<width$}  {:>10}  {:>10}  {:>6.3}  {:>6.3}  {:>7}",
                s.name,
                fmt_opt(s.required_diameter_in, 4),
                fmt_opt(s.standard_diameter_in, 4),
                s.kt,
                s.kts,
                fmt_opt(s.fos, 3),
                width = width
            )?;
            match &s.error {
                Some(err) => writeln!(f, "  FAILED: {}", err)?,
                None => writeln!(f)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Status: {} ({} iterations, {} snap passes)",
            self.shaft.status.display_name(),
            self.shaft.continuous_iterations,
            self.shaft.snap_passes
        )?;
        if let Some(g) = &self.shaft.governing {
            writeln!(
                f,
                "Governing: {} at {:.4} in (FoS {})",
                g.name,
                g.diameter_in,
                fmt_opt(g.fos, 3)
            )?;
        }
        if let Some(m) = &self.shaft.min_fos {
            writeln!(f, "Lowest FoS: {} ({})", m.name, fmt_opt(m.fos, 3))?;
        }
        if !self.shaft.stress_concentration.is_empty() {
            writeln!(f, "Shoulder factors: {}", self.shaft.stress_concentration)?;
        }

        match &self.keyway {
            Some(ComponentOutcome::Sized(k)) => writeln!(
                f,
                "Key: {} in on {:.4} in shaft, length {:.4} in (FoS {}){}",
                k.key.label(),
                k.shaft_diameter_in,
                k.length_in,
                fmt_opt(k.fos, 3),
                if k.fallback { " [catalog fallback, undersized]" } else { "" }
            )?,
            Some(ComponentOutcome::Failed(err)) => writeln!(f, "Key: FAILED: {}", err)?,
            None => {}
        }
        match &self.snap_ring {
            Some(ComponentOutcome::Sized(r)) => writeln!(
                f,
                "Snap ring: OD {:.4} in on {:.4} in groove (required {:.4} in, FoS {:.3})",
                r.outer_diameter_in, r.inner_diameter_in, r.required_outer_diameter_in, r.fos
            )?,
            Some(ComponentOutcome::Failed(err)) => writeln!(f, "Snap ring: FAILED: {}", err)?,
            None => {}
        }
        Ok(())
    }
}

impl fmt::Display for StudyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Job {}: {}", self.job_id, self.description)?;
        if !self.engineer.is_empty() {
            writeln!(f, "Engineer: {}", self.engineer)?;
        }
        writeln!(f, "Generated: {}", self.generated.format("%Y-%m-%d %H:%M UTC"))?;
        for run in &self.runs {
            writeln!(f)?;
            writeln!(f, "{}", "-".repeat(72))?;
            write!(f, "{}", run)?;
        }
        Ok(())
    }
}

/// Plain text summary of a load analysis
pub struct LoadSummary<'a>(pub &'a LoadAnalysisResult);

impl fmt::Display for LoadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(
            f,
            "Reactions XY: R1 = {:.2} lbf, R2 = {:.2} lbf",
            r.reactions_y_lb[0], r.reactions_y_lb[1]
        )?;
        writeln!(
            f,
            "Reactions XZ: R1 = {:.2} lbf, R2 = {:.2} lbf",
            r.reactions_z_lb[0], r.reactions_z_lb[1]
        )?;
        if let Some(t) = r.balancing_torque_inlb {
            writeln!(f, "Balancing torque: {:.2} in-lbf", t)?;
        }
        writeln!(f, "Max shear:  {:.2} lbf at x = {:.3} in", r.max_shear.0, r.max_shear.1)?;
        writeln!(f, "Max moment: {:.2} in-lbf at x = {:.3} in", r.max_moment.0, r.max_moment.1)?;
        writeln!(f, "Max torque: {:.2} in-lbf at x = {:.3} in", r.max_torque.0, r.max_torque.1)?;
        if !r.stations.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "{:>8}  {:>10}  {:>12}  {:>10}  {:>12}  {:>12}",
                "x (in)", "Vr (lbf)", "Mr (in-lbf)", "Vy (lbf)", "Vz (lbf)", "T (in-lbf)"
            )?;
            for s in &r.stations {
                writeln!(
                    f,
                    "{:>8.3}  {:>10.2}  {:>12.2}  {:>10.2}  {:>12.2}  {:>12.2}",
                    s.x_in, s.vr_lb, s.mr_inlb, s.vy_lb, s.vz_lb, s.t_inlb
                )?;
            }
        }
        Ok(())
    }
}
