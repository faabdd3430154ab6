//! Shaft Load Analysis (Singularity Functions)
//!
//! Shear, moment and torque along a shaft supported on two bearings, with
//! point loads in two perpendicular planes (XY and XZ) and torques applied
//! along the axis.
//!
//! ## Method
//!
//! Bearing reactions come from statics in each plane. Internal shear and
//! moment are then sums of Macaulay brackets over every force, reactions
//! included:
//!
//! - V(x) = Σ Fᵢ ⟨x − aᵢ⟩⁰
//! - M(x) = Σ Fᵢ ⟨x − aᵢ⟩¹
//! - T(x) = Σ Tᵢ ⟨x − aᵢ⟩⁰
//!
//! with ⟨x − a⟩ⁿ = 0 for x < a. A step takes effect at x = a, so values at a
//! load position are right-hand limits. [`LoadAnalysis::worst_case_at`]
//! checks both sides.
//!
//! ## Sign Convention
//! - Forces: positive along +y (XY plane) or +z (XZ plane)
//! - Torques: positive by the right-hand rule about +x
//! - Positions: inches from the left end of the shaft
//!
//! ## Example
//! ```rust
//! use shaft_core::loads::{LoadAnalysis, PointLoad, ShaftLoadModel};
//!
//! let mut model = ShaftLoadModel::new(10.0, [0.0, 10.0]);
//! model.loads_y.push(PointLoad::new(-100.0, 5.0));
//!
//! let analysis = LoadAnalysis::new(&model).unwrap();
//! let (r1, r2) = analysis.reactions_y();
//! assert!((r1 - 50.0).abs() < 1e-9);
//! assert!((r2 - 50.0).abs() < 1e-9);
//! assert!((analysis.station(5.0).my_inlb - 250.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use super::SegmentLoads;
use crate::errors::{CalcError, CalcResult};

/// Default number of diagram samples along the shaft
const DEFAULT_SAMPLE_POINTS: usize = 2001;

fn default_sample_points() -> usize {
    DEFAULT_SAMPLE_POINTS
}

/// A transverse point load (lbf) at a position along the shaft (in)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    /// Signed force (lbf)
    pub force_lb: f64,
    /// Position from the left end (in)
    pub position_in: f64,
}

impl PointLoad {
    /// Create a point load
    pub fn new(force_lb: f64, position_in: f64) -> Self {
        PointLoad {
            force_lb,
            position_in,
        }
    }
}

/// A torque (in-lbf) applied at a position along the shaft (in)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedTorque {
    /// Signed torque (in-lbf)
    pub torque_inlb: f64,
    /// Position from the left end (in)
    pub position_in: f64,
}

impl AppliedTorque {
    /// Create an applied torque
    pub fn new(torque_inlb: f64, position_in: f64) -> Self {
        AppliedTorque {
            torque_inlb,
            position_in,
        }
    }
}

/// Loads acting on a shaft supported by two bearings
///
/// ## JSON Example
///
/// ```json
/// {
///   "length_in": 15.0,
///   "bearing_positions_in": [2.25, 12.75],
///   "loads_y": [
///     { "force_lb": 75.0, "position_in": 0.0 },
///     { "force_lb": 75.0, "position_in": 15.0 },
///     { "force_lb": -240.0, "position_in": 10.38 }
///   ],
///   "loads_z": [{ "force_lb": -740.0, "position_in": 10.38 }],
///   "torques": [
///     { "torque_inlb": 562.5, "position_in": 0.0 },
///     { "torque_inlb": 562.5, "position_in": 15.0 }
///   ],
///   "balancing_torque_at_in": 10.38,
///   "stations_in": [2.25, 10.38, 12.75]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaftLoadModel {
    /// Overall shaft length (in)
    pub length_in: f64,

    /// Bearing centre positions (in). Reactions act here.
    pub bearing_positions_in: [f64; 2],

    /// Point loads in the XY plane
    #[serde(default)]
    pub loads_y: Vec<PointLoad>,

    /// Point loads in the XZ plane
    #[serde(default)]
    pub loads_z: Vec<PointLoad>,

    /// Torques applied along the shaft
    #[serde(default)]
    pub torques: Vec<AppliedTorque>,

    /// Position of a torque that balances all other torques (e.g., the gear
    /// that drives two wheels). `None` when `torques` is already balanced.
    #[serde(default)]
    pub balancing_torque_at_in: Option<f64>,

    /// Positions at which a station table is reported (in)
    #[serde(default)]
    pub stations_in: Vec<f64>,

    /// Number of evenly spaced diagram samples
    #[serde(default = "default_sample_points")]
    pub sample_points: usize,
}

impl ShaftLoadModel {
    /// Create an unloaded model
    pub fn new(length_in: f64, bearing_positions_in: [f64; 2]) -> Self {
        ShaftLoadModel {
            length_in,
            bearing_positions_in,
            loads_y: Vec::new(),
            loads_z: Vec::new(),
            torques: Vec::new(),
            balancing_torque_at_in: None,
            stations_in: Vec::new(),
            sample_points: DEFAULT_SAMPLE_POINTS,
        }
    }

    /// Validate geometry and load positions
    pub fn validate(&self) -> CalcResult<()> {
        if !(self.length_in.is_finite() && self.length_in > 0.0) {
            return Err(CalcError::invalid_input(
                "length_in",
                self.length_in.to_string(),
                "Shaft length must be positive",
            ));
        }
        let [x1, x2] = self.bearing_positions_in;
        self.check_position("bearing_positions_in", x1)?;
        self.check_position("bearing_positions_in", x2)?;
        if (x2 - x1).abs() < f64::EPSILON {
            return Err(CalcError::invalid_input(
                "bearing_positions_in",
                format!("[{}, {}]", x1, x2),
                "Bearings must be at different positions",
            ));
        }
        for load in self.loads_y.iter().chain(self.loads_z.iter()) {
            self.check_position("position_in", load.position_in)?;
            if !load.force_lb.is_finite() {
                return Err(CalcError::invalid_input(
                    "force_lb",
                    load.force_lb.to_string(),
                    "Force must be finite",
                ));
            }
        }
        for torque in &self.torques {
            self.check_position("position_in", torque.position_in)?;
            if !torque.torque_inlb.is_finite() {
                return Err(CalcError::invalid_input(
                    "torque_inlb",
                    torque.torque_inlb.to_string(),
                    "Torque must be finite",
                ));
            }
        }
        if let Some(x) = self.balancing_torque_at_in {
            self.check_position("balancing_torque_at_in", x)?;
        }
        for x in &self.stations_in {
            self.check_position("stations_in", *x)?;
        }
        if self.sample_points < 2 {
            return Err(CalcError::invalid_input(
                "sample_points",
                self.sample_points.to_string(),
                "At least two diagram samples are required",
            ));
        }
        Ok(())
    }

    fn check_position(&self, field: &str, x: f64) -> CalcResult<()> {
        if !(x.is_finite() && (0.0..=self.length_in).contains(&x)) {
            return Err(CalcError::invalid_input(
                field,
                x.to_string(),
                format!("Position must lie on the shaft (0 to {} in)", self.length_in),
            ));
        }
        Ok(())
    }
}

/// Which limit to take at a discontinuity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Macaulay bracket ⟨x − a⟩ⁿ
fn macaulay(x: f64, a: f64, n: i32, side: Side) -> f64 {
    let active = match side {
        Side::Left => x > a,
        Side::Right => x >= a,
    };
    if active {
        (x - a).powi(n)
    } else {
        0.0
    }
}

/// Reactions (R1, R2) at x1, x2 for a simply supported shaft with point loads.
///
/// Satisfies R1 + R2 + ΣF = 0 and moment balance about x1.
pub fn solve_two_support_reactions(x1: f64, x2: f64, loads: &[PointLoad]) -> (f64, f64) {
    let sum_f: f64 = loads.iter().map(|l| l.force_lb).sum();
    let sum_m_about_x1: f64 = loads
        .iter()
        .map(|l| l.force_lb * (l.position_in - x1))
        .sum();
    let r2 = -sum_m_about_x1 / (x2 - x1);
    let r1 = -sum_f - r2;
    (r1, r2)
}

/// Internal loads at one position along the shaft
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadStation {
    /// Position (in)
    pub x_in: f64,
    /// Shear in the XY plane (lbf)
    pub vy_lb: f64,
    /// Moment in the XY plane (in-lbf)
    pub my_inlb: f64,
    /// Shear in the XZ plane (lbf)
    pub vz_lb: f64,
    /// Moment in the XZ plane (in-lbf)
    pub mz_inlb: f64,
    /// Resultant shear √(Vy² + Vz²) (lbf)
    pub vr_lb: f64,
    /// Resultant moment √(My² + Mz²) (in-lbf)
    pub mr_inlb: f64,
    /// Internal torque (in-lbf)
    pub t_inlb: f64,
}

/// Summary of a load analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadAnalysisResult {
    /// XY-plane bearing reactions (lbf)
    pub reactions_y_lb: [f64; 2],
    /// XZ-plane bearing reactions (lbf)
    pub reactions_z_lb: [f64; 2],
    /// Balancing torque applied, if requested (in-lbf)
    pub balancing_torque_inlb: Option<f64>,
    /// Maximum resultant shear (lbf) and its position (in)
    pub max_shear: (f64, f64),
    /// Maximum resultant moment (in-lbf) and its position (in)
    pub max_moment: (f64, f64),
    /// Maximum torque magnitude (in-lbf) and its position (in)
    pub max_torque: (f64, f64),
    /// Values at the requested stations
    pub stations: Vec<LoadStation>,
    /// Evenly sampled diagram along the shaft
    pub diagram: Vec<LoadStation>,
}

/// A solved load model: reactions are known, internal loads can be sampled.
#[derive(Debug, Clone)]
pub struct LoadAnalysis {
    length_in: f64,
    sample_points: usize,
    stations_in: Vec<f64>,
    /// XY forces including reactions
    forces_y: Vec<PointLoad>,
    /// XZ forces including reactions
    forces_z: Vec<PointLoad>,
    /// Torques including the balancing torque
    torques: Vec<AppliedTorque>,
    reactions_y: (f64, f64),
    reactions_z: (f64, f64),
    balancing_torque: Option<f64>,
}

impl LoadAnalysis {
    /// Solve reactions for a validated model
    pub fn new(model: &ShaftLoadModel) -> CalcResult<Self> {
        model.validate()?;
        let [x1, x2] = model.bearing_positions_in;

        let reactions_y = solve_two_support_reactions(x1, x2, &model.loads_y);
        let reactions_z = solve_two_support_reactions(x1, x2, &model.loads_z);

        let mut forces_y = model.loads_y.clone();
        forces_y.push(PointLoad::new(reactions_y.0, x1));
        forces_y.push(PointLoad::new(reactions_y.1, x2));

        let mut forces_z = model.loads_z.clone();
        forces_z.push(PointLoad::new(reactions_z.0, x1));
        forces_z.push(PointLoad::new(reactions_z.1, x2));

        let mut torques = model.torques.clone();
        let balancing_torque = model.balancing_torque_at_in.map(|x| {
            let applied: f64 = model.torques.iter().map(|t| t.torque_inlb).sum();
            torques.push(AppliedTorque::new(-applied, x));
            -applied
        });

        tracing::debug!(
            r1y = reactions_y.0,
            r2y = reactions_y.1,
            r1z = reactions_z.0,
            r2z = reactions_z.1,
            "solved bearing reactions"
        );

        Ok(LoadAnalysis {
            length_in: model.length_in,
            sample_points: model.sample_points,
            stations_in: model.stations_in.clone(),
            forces_y,
            forces_z,
            torques,
            reactions_y,
            reactions_z,
            balancing_torque,
        })
    }

    /// XY-plane bearing reactions (R1, R2)
    pub fn reactions_y(&self) -> (f64, f64) {
        self.reactions_y
    }

    /// XZ-plane bearing reactions (R1, R2)
    pub fn reactions_z(&self) -> (f64, f64) {
        self.reactions_z
    }

    fn shear(forces: &[PointLoad], x: f64, side: Side) -> f64 {
        forces
            .iter()
            .map(|f| f.force_lb * macaulay(x, f.position_in, 0, side))
            .sum()
    }

    fn moment(forces: &[PointLoad], x: f64) -> f64 {
        // Moment is continuous under point loads, either side gives the same value
        forces
            .iter()
            .map(|f| f.force_lb * macaulay(x, f.position_in, 1, Side::Right))
            .sum()
    }

    fn torque(&self, x: f64, side: Side) -> f64 {
        self.torques
            .iter()
            .map(|t| t.torque_inlb * macaulay(x, t.position_in, 0, side))
            .sum()
    }

    fn station_on_side(&self, x: f64, side: Side) -> LoadStation {
        let vy = Self::shear(&self.forces_y, x, side);
        let my = Self::moment(&self.forces_y, x);
        let vz = Self::shear(&self.forces_z, x, side);
        let mz = Self::moment(&self.forces_z, x);
        LoadStation {
            x_in: x,
            vy_lb: vy,
            my_inlb: my,
            vz_lb: vz,
            mz_inlb: mz,
            vr_lb: vy.hypot(vz),
            mr_inlb: my.hypot(mz),
            t_inlb: self.torque(x, side),
        }
    }

    /// Internal loads at `x` (right-hand limit at discontinuities)
    pub fn station(&self, x: f64) -> LoadStation {
        self.station_on_side(x, Side::Right)
    }

    /// Worst-case magnitudes at `x`, taking the larger of the left and right
    /// limits for shear and torque.
    pub fn worst_case_at(&self, x: f64) -> SegmentLoads {
        let left = self.station_on_side(x, Side::Left);
        let right = self.station_on_side(x, Side::Right);
        SegmentLoads::new(
            left.vr_lb.max(right.vr_lb),
            left.mr_inlb.max(right.mr_inlb),
            left.t_inlb.abs().max(right.t_inlb.abs()),
        )
    }

    /// Evenly spaced samples from 0 to the shaft length
    pub fn diagram(&self) -> Vec<LoadStation> {
        let n = self.sample_points.max(2);
        (0..n)
            .map(|i| self.station(self.length_in * i as f64 / (n - 1) as f64))
            .collect()
    }

    /// Full analysis: reactions, maxima, station table and diagram
    pub fn analyze(&self) -> LoadAnalysisResult {
        let diagram = self.diagram();

        let mut max_shear = (0.0f64, 0.0f64);
        let mut max_moment = (0.0f64, 0.0f64);
        let mut max_torque = (0.0f64, 0.0f64);
        for s in &diagram {
            if s.vr_lb > max_shear.0 {
                max_shear = (s.vr_lb, s.x_in);
            }
            if s.mr_inlb > max_moment.0 {
                max_moment = (s.mr_inlb, s.x_in);
            }
            if s.t_inlb.abs() > max_torque.0 {
                max_torque = (s.t_inlb.abs(), s.x_in);
            }
        }

        LoadAnalysisResult {
            reactions_y_lb: [self.reactions_y.0, self.reactions_y.1],
            reactions_z_lb: [self.reactions_z.0, self.reactions_z.1],
            balancing_torque_inlb: self.balancing_torque,
            max_shear,
            max_moment,
            max_torque,
            stations: self.stations_in.iter().map(|x| self.station(*x)).collect(),
            diagram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * (1.0 + b.abs())
    }

    /// Gearbox output shaft: wheel loads at both ends, gear between bearings
    fn gearbox_model() -> ShaftLoadModel {
        let mut model = ShaftLoadModel::new(15.0, [2.25, 12.75]);
        model.loads_y = vec![
            PointLoad::new(75.0, 0.0),
            PointLoad::new(75.0, 15.0),
            PointLoad::new(-240.0, 10.38),
        ];
        model.loads_z = vec![
            PointLoad::new(0.0, 0.0),
            PointLoad::new(0.0, 15.0),
            PointLoad::new(-740.0, 10.38),
        ];
        model.torques = vec![
            AppliedTorque::new(562.5, 0.0),
            AppliedTorque::new(562.5, 15.0),
        ];
        model.balancing_torque_at_in = Some(10.38);
        model.stations_in = vec![0.0, 2.25, 10.38, 11.0, 12.75, 15.0];
        model
    }

    #[test]
    fn test_simple_span_reactions() {
        let (r1, r2) = solve_two_support_reactions(0.0, 10.0, &[PointLoad::new(-1000.0, 3.0)]);
        assert!(approx_eq(r1, 700.0, TOL));
        assert!(approx_eq(r2, 300.0, TOL));
    }

    #[test]
    fn test_reactions_satisfy_equilibrium() {
        let model = gearbox_model();
        let analysis = LoadAnalysis::new(&model).unwrap();
        let (r1, r2) = analysis.reactions_y();

        let applied: f64 = model.loads_y.iter().map(|l| l.force_lb).sum();
        assert!((r1 + r2 + applied).abs() < 1e-9);

        // R2 = -(75(-2.25) + 75(12.75) - 240(8.13)) / 10.5
        assert!(approx_eq(r2, 1163.7 / 10.5, 1e-9));
        assert!(approx_eq(r1, 90.0 - 1163.7 / 10.5, 1e-9));
    }

    #[test]
    fn test_free_ends_carry_no_moment() {
        let analysis = LoadAnalysis::new(&gearbox_model()).unwrap();
        let end = analysis.station(15.0);
        assert!(end.my_inlb.abs() < 1e-9);
        assert!(end.mz_inlb.abs() < 1e-9);
        // All forces act at or before x = 15, so shear closes to zero
        assert!(end.vy_lb.abs() < 1e-9);
        assert!(end.vz_lb.abs() < 1e-9);

        let start = analysis.station(0.0);
        assert!(start.my_inlb.abs() < 1e-12);
    }

    #[test]
    fn test_moment_at_bearing() {
        let analysis = LoadAnalysis::new(&gearbox_model()).unwrap();
        // Overhung wheel load: M = 75 * 2.25 at the left bearing
        let s = analysis.station(2.25);
        assert!(approx_eq(s.my_inlb, 168.75, 1e-9));
        assert!(s.mz_inlb.abs() < 1e-9);
    }

    #[test]
    fn test_torque_diagram_with_balancing_torque() {
        let analysis = LoadAnalysis::new(&gearbox_model()).unwrap();
        assert!(approx_eq(analysis.station(5.0).t_inlb, 562.5, TOL));
        assert!(approx_eq(analysis.station(11.0).t_inlb, -562.5, TOL));
        assert!(analysis.station(15.0).t_inlb.abs() < 1e-9);

        let result = analysis.analyze();
        assert_eq!(result.balancing_torque_inlb, Some(-1125.0));
        assert!(approx_eq(result.max_torque.0, 562.5, TOL));
    }

    #[test]
    fn test_worst_case_at_discontinuity() {
        let analysis = LoadAnalysis::new(&gearbox_model()).unwrap();
        let left = analysis.station(10.38 - 1e-6);
        let right = analysis.station(10.38);
        let worst = analysis.worst_case_at(10.38);

        assert!(worst.shear_lb >= left.vr_lb - 1e-6);
        assert!(worst.shear_lb >= right.vr_lb - 1e-6);
        assert!(approx_eq(worst.torque_inlb, 562.5, TOL));
        assert!(approx_eq(worst.moment_inlb, right.mr_inlb, 1e-9));
    }

    #[test]
    fn test_resultants() {
        let analysis = LoadAnalysis::new(&gearbox_model()).unwrap();
        let s = analysis.station(10.38);
        assert!(approx_eq(s.mr_inlb, s.my_inlb.hypot(s.mz_inlb), TOL));
        assert!(approx_eq(s.vr_lb, s.vy_lb.hypot(s.vz_lb), TOL));
    }

    #[test]
    fn test_analyze_outputs() {
        let model = gearbox_model();
        let result = LoadAnalysis::new(&model).unwrap().analyze();
        assert_eq!(result.diagram.len(), DEFAULT_SAMPLE_POINTS);
        assert_eq!(result.stations.len(), model.stations_in.len());
        // Peak bending sits near the gear for this layout
        assert!((result.max_moment.1 - 10.38).abs() < 0.05);
        assert!(result.max_moment.0 > 0.0);
    }

    #[test]
    fn test_validation() {
        let mut model = gearbox_model();
        model.bearing_positions_in = [5.0, 5.0];
        assert!(LoadAnalysis::new(&model).is_err());

        let mut model = gearbox_model();
        model.loads_y.push(PointLoad::new(10.0, 20.0));
        assert!(LoadAnalysis::new(&model).is_err());

        let mut model = gearbox_model();
        model.length_in = 0.0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_model_deserialization_defaults() {
        let json = r#"{ "length_in": 10.0, "bearing_positions_in": [1.0, 9.0] }"#;
        let model: ShaftLoadModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.sample_points, DEFAULT_SAMPLE_POINTS);
        assert!(model.loads_y.is_empty());
        assert!(model.balancing_torque_at_in.is_none());
    }
}
