//! # Shaft Design Files
//!
//! `ShaftDesign` is the root container for a sizing study. Designs serialize
//! to JSON and are loaded and saved through [`crate::file_io`].
//!
//! ## Structure
//!
//! ```text
//! ShaftDesign
//! ├── meta: DesignMetadata (version, engineer, job info, timestamps)
//! ├── materials, target_factors_of_safety (the study grid)
//! ├── shear_model, solver, catalogs
//! ├── segments: Vec<SegmentInput> (the segment table)
//! ├── keyway / snap_ring (optional dependent components)
//! └── load_model (optional two-bearing load analysis)
//! ```
//!
//! Every (target FoS, material) pair is one run and produces one
//! [`DesignReport`].
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::design::ShaftDesign;
//!
//! let design = ShaftDesign::sample();
//! let study = design.run().unwrap();
//! assert_eq!(study.runs.len(), 2); // 1020 and 4140 at FoS 2.0
//!
//! let json = serde_json::to_string_pretty(&design).unwrap();
//! assert!(json.contains("Gear Shoulder (gear side)"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::keyway::{self, KeywayInput};
use crate::calculations::shaft::{self, SegmentGraph, SegmentInput, ShaftSizingInput, SolverSettings};
use crate::calculations::snap_ring::{self, SnapRingInput};
use crate::calculations::stress::{ConcentrationFactors, ShearModel};
use crate::catalogs::{KeyCatalog, StandardCatalog};
use crate::errors::{CalcError, CalcResult};
use crate::loads::shaft_loads::LoadAnalysisResult;
use crate::loads::{AppliedTorque, LoadAnalysis, LoadMagnitude, PointLoad, ShaftLoadModel};
use crate::materials::{Material, MaterialSpec, SteelGrade};
use crate::report::{ComponentOutcome, DesignReport, StudyReport};

/// Current schema version for design files
pub const SCHEMA_VERSION: &str = "0.1.0";

fn default_max_key_length() -> f64 {
    1.5
}

/// Design metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible engineer
    #[serde(default)]
    pub engineer: String,

    /// Job/project number
    #[serde(default)]
    pub job_id: String,

    /// What the shaft is
    #[serde(default)]
    pub description: String,

    /// When the design was created
    pub created: DateTime<Utc>,

    /// When the design was last modified
    pub modified: DateTime<Utc>,
}

/// Keyway on one of the shaft segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywaySpec {
    /// Segment carrying the keyseat
    pub segment: String,
    /// Shaft diameter override (in); defaults to the segment's standard diameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaft_diameter_in: Option<f64>,
    /// Torque override; defaults to the segment's worst-case torque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torque_inlb: Option<LoadMagnitude>,
    /// Longest key the hub allows (in)
    #[serde(default = "default_max_key_length")]
    pub max_length_in: f64,
}

/// Snap ring in a groove on one of the shaft segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapRingSpec {
    /// Segment carrying the groove; its loads and factors are used
    pub segment: String,
    /// Groove diameter override (in); defaults to the segment's standard diameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_diameter_in: Option<f64>,
}

/// Standard size lists used by a design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Shaft diameters
    pub shaft_diameters: StandardCatalog,
    /// Snap ring outer diameters
    pub snap_ring_diameters: StandardCatalog,
    /// Key width × height pairs
    pub keys: KeyCatalog,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            shaft_diameters: StandardCatalog::shaft_diameters(),
            snap_ring_diameters: StandardCatalog::snap_ring_diameters(),
            keys: KeyCatalog::standard(),
        }
    }
}

impl CatalogSettings {
    /// Validate every catalog
    pub fn validate(&self) -> CalcResult<()> {
        self.shaft_diameters.validate()?;
        self.snap_ring_diameters.validate()?;
        if self.keys.sizes.is_empty() {
            return Err(CalcError::invalid_input("catalogs.keys", "[]", "Key catalog has no sizes"));
        }
        Ok(())
    }
}

/// Root design container.
///
/// This is the top-level struct that gets serialized to design files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaftDesign {
    /// Design metadata
    pub meta: DesignMetadata,

    /// Candidate materials; each is one column of the study
    pub materials: Vec<MaterialSpec>,

    /// Target factors of safety; each is one row of the study
    pub target_factors_of_safety: Vec<f64>,

    /// Direct shear treatment
    #[serde(default)]
    pub shear_model: ShearModel,

    /// Segment table
    pub segments: Vec<SegmentInput>,

    /// Keyway, if the shaft has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyway: Option<KeywaySpec>,

    /// Snap ring, if the shaft has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_ring: Option<SnapRingSpec>,

    /// Load model for `station_in` segments and load reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_model: Option<ShaftLoadModel>,

    /// Standard sizes
    #[serde(default)]
    pub catalogs: CatalogSettings,

    /// Solver budgets and tolerances
    #[serde(default)]
    pub solver: SolverSettings,
}

impl ShaftDesign {
    /// Create an empty design.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shaft_core::design::ShaftDesign;
    ///
    /// let design = ShaftDesign::new("John Doe", "25-001", "Intermediate shaft");
    /// assert_eq!(design.meta.engineer, "John Doe");
    /// assert!(design.segments.is_empty());
    /// ```
    pub fn new(
        engineer: impl Into<String>,
        job_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        ShaftDesign {
            meta: DesignMetadata {
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                description: description.into(),
                created: now,
                modified: now,
            },
            materials: Vec::new(),
            target_factors_of_safety: vec![2.0],
            shear_model: ShearModel::default(),
            segments: Vec::new(),
            keyway: None,
            snap_ring: None,
            load_model: None,
            catalogs: CatalogSettings::default(),
            solver: SolverSettings::default(),
        }
    }

    /// Gearbox output shaft: seven stations, 1020 and 4140 steel, FoS 2.0,
    /// with a keyway at the gear and a snap ring locating it.
    pub fn sample() -> Self {
        let mut design = ShaftDesign::new("", "SAMPLE", "Gearbox output shaft");
        design.materials = vec![SteelGrade::Aisi1020.into(), SteelGrade::Aisi4140.into()];
        design.target_factors_of_safety = vec![2.0];
        design.segments = vec![
            SegmentInput::new("Output Spline 1 Shoulder (spline side)", 97.0, 170.0, 462.5),
            SegmentInput::new("Bearing 1 Shoulder (bearing side)", 176.0, 203.0, 462.5),
            SegmentInput::new("Gear Shoulder (gear side)", 176.0, 1254.0, 925.0),
            SegmentInput::new("Keyway", 602.0, 1363.0, -462.5).with_factors(2.3, 3.0),
            SegmentInput::new("Snap Ring for Gear", 602.0, 995.0, -462.5).with_factors(3.0, 5.0),
            SegmentInput::new("Bearing 2 Shoulder (bearing side)", 602.0, 300.0, -462.5)
                .with_factors(2.066, 1.732),
            SegmentInput::new("Input Spline 2 Shoulder (spline side)", 97.0, 170.0, -462.5),
        ];
        design.keyway = Some(KeywaySpec {
            segment: "Keyway".to_string(),
            shaft_diameter_in: None,
            torque_inlb: None,
            max_length_in: default_max_key_length(),
        });
        design.snap_ring = Some(SnapRingSpec {
            segment: "Snap Ring for Gear".to_string(),
            inner_diameter_in: None,
        });
        design.load_model = Some(sample_load_model());
        design
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Resolve every material entry
    pub fn resolve_materials(&self) -> CalcResult<Vec<Material>> {
        self.materials.iter().map(MaterialSpec::resolve).collect()
    }

    /// Segment table with `station_in` rows filled from the load model
    pub fn resolved_segments(&self) -> CalcResult<Vec<SegmentInput>> {
        let needs_model = self.segments.iter().any(|s| s.station_in.is_some());
        let analysis = match (&self.load_model, needs_model) {
            (Some(model), true) => Some(LoadAnalysis::new(model)?),
            (None, true) => return Err(CalcError::missing_field("load_model")),
            _ => None,
        };

        let mut segments = self.segments.clone();
        if let Some(analysis) = analysis {
            for segment in segments.iter_mut() {
                if let Some(x) = segment.station_in {
                    let loads = analysis.worst_case_at(x);
                    tracing::debug!(segment = %segment.name, x_in = x, ?loads, "loads from station");
                    segment.shear_lb = loads.shear_lb.into();
                    segment.moment_inlb = loads.moment_inlb.into();
                    segment.torque_inlb = loads.torque_inlb.into();
                }
            }
        }
        Ok(segments)
    }

    /// Run the load model, if any
    pub fn load_analysis(&self) -> CalcResult<Option<LoadAnalysisResult>> {
        match &self.load_model {
            Some(model) => Ok(Some(LoadAnalysis::new(model)?.analyze())),
            None => Ok(None),
        }
    }

    /// Check the whole design before solving.
    pub fn validate(&self) -> CalcResult<()> {
        if self.materials.is_empty() {
            return Err(CalcError::missing_field("materials"));
        }
        self.resolve_materials()?;

        if self.target_factors_of_safety.is_empty() {
            return Err(CalcError::missing_field("target_factors_of_safety"));
        }
        for fos in &self.target_factors_of_safety {
            if !(fos.is_finite() && *fos > 0.0) {
                return Err(CalcError::invalid_input(
                    "target_factors_of_safety",
                    fos.to_string(),
                    "Target factors of safety must be positive",
                ));
            }
        }

        if let Some(model) = &self.load_model {
            model.validate()?;
        }
        let segments = self.resolved_segments()?;
        let graph = SegmentGraph::build(&segments)?;

        if let Some(spec) = &self.keyway {
            if graph.get(&spec.segment).is_none() {
                return Err(CalcError::invalid_input(
                    "keyway.segment",
                    spec.segment.clone(),
                    "Keyway refers to an unknown segment",
                ));
            }
            if let Some(torque) = &spec.torque_inlb {
                torque.worst_case()?;
            }
            let key_check = KeywayInput {
                torque_inlb: 0.0,
                shaft_diameter_in: spec.shaft_diameter_in.unwrap_or(1.0),
                max_length_in: spec.max_length_in,
                catalog: self.catalogs.keys.clone(),
            };
            key_check.validate()?;
        }

        if let Some(spec) = &self.snap_ring {
            if graph.get(&spec.segment).is_none() {
                return Err(CalcError::invalid_input(
                    "snap_ring.segment",
                    spec.segment.clone(),
                    "Snap ring refers to an unknown segment",
                ));
            }
        }

        self.catalogs.validate()?;
        self.solver.validate()
    }

    /// Run every (target FoS, material) pair.
    pub fn run(&self) -> CalcResult<StudyReport> {
        self.validate()?;
        let materials = self.resolve_materials()?;
        let segments = self.resolved_segments()?;

        let mut runs = Vec::with_capacity(materials.len() * self.target_factors_of_safety.len());
        for target_fos in &self.target_factors_of_safety {
            for material in &materials {
                runs.push(self.run_with(&segments, material, *target_fos)?);
            }
        }

        tracing::info!(job_id = %self.meta.job_id, runs = runs.len(), "design study finished");

        Ok(StudyReport {
            job_id: self.meta.job_id.clone(),
            description: self.meta.description.clone(),
            engineer: self.meta.engineer.clone(),
            generated: Utc::now(),
            runs,
        })
    }

    /// Run one material at one target FoS.
    pub fn run_case(&self, material: &Material, target_fos: f64) -> CalcResult<DesignReport> {
        let segments = self.resolved_segments()?;
        self.run_with(&segments, material, target_fos)
    }

    fn run_with(
        &self,
        segments: &[SegmentInput],
        material: &Material,
        target_fos: f64,
    ) -> CalcResult<DesignReport> {
        tracing::info!(material = %material.name, target_fos, "sizing shaft");

        let input = ShaftSizingInput {
            segments: segments.to_vec(),
            material: material.clone(),
            target_fos,
            shear_model: self.shear_model,
            catalog: self.catalogs.shaft_diameters.clone(),
            settings: self.solver,
        };
        let solution = shaft::calculate(&input)?;

        let keyway = self.keyway.as_ref().map(|spec| {
            ComponentOutcome::from_result(self.size_keyway(spec, &solution, material, target_fos))
        });
        let snap_ring = self.snap_ring.as_ref().map(|spec| {
            ComponentOutcome::from_result(self.size_snap_ring(spec, &solution, material, target_fos))
        });

        Ok(DesignReport {
            material: material.clone(),
            target_fos,
            shear_model: self.shear_model,
            shaft: solution,
            keyway,
            snap_ring,
        })
    }

    /// Standard diameter of a solved segment, or that segment's failure
    fn segment_diameter(
        solution: &shaft::ShaftSolution,
        name: &str,
        override_in: Option<f64>,
    ) -> CalcResult<f64> {
        if let Some(d) = override_in {
            return Ok(d);
        }
        let segment = solution
            .segment(name)
            .ok_or_else(|| CalcError::invalid_input("segment", name, "Unknown segment"))?;
        match (segment.standard_diameter_in, &segment.error) {
            (Some(d), None) => Ok(d),
            (_, Some(err)) => Err(err.clone()),
            (None, None) => Err(CalcError::Internal {
                message: format!("segment '{}' has no standard diameter", name),
            }),
        }
    }

    fn size_keyway(
        &self,
        spec: &KeywaySpec,
        solution: &shaft::ShaftSolution,
        material: &Material,
        target_fos: f64,
    ) -> CalcResult<keyway::KeywayResult> {
        let shaft_diameter_in =
            Self::segment_diameter(solution, &spec.segment, spec.shaft_diameter_in)?;
        let torque_inlb = match &spec.torque_inlb {
            Some(t) => t.worst_case()?,
            None => solution
                .segment(&spec.segment)
                .map(|s| s.loads.torque_inlb)
                .unwrap_or_default(),
        };
        let input = KeywayInput {
            torque_inlb,
            shaft_diameter_in,
            max_length_in: spec.max_length_in,
            catalog: self.catalogs.keys.clone(),
        };
        keyway::calculate(&input, material, target_fos, &self.solver.bisection)
    }

    fn size_snap_ring(
        &self,
        spec: &SnapRingSpec,
        solution: &shaft::ShaftSolution,
        material: &Material,
        target_fos: f64,
    ) -> CalcResult<snap_ring::SnapRingResult> {
        let inner_diameter_in =
            Self::segment_diameter(solution, &spec.segment, spec.inner_diameter_in)?;
        let segment = solution.segment(&spec.segment).ok_or_else(|| {
            CalcError::invalid_input("snap_ring.segment", spec.segment.clone(), "Unknown segment")
        })?;
        let input = SnapRingInput::new(inner_diameter_in, segment.loads)
            .with_factors(ConcentrationFactors::new(segment.kt, segment.kts));
        snap_ring::calculate(
            &input,
            material,
            target_fos,
            self.shear_model,
            &self.catalogs.snap_ring_diameters,
            &self.solver.bisection,
        )
    }
}

impl Default for ShaftDesign {
    fn default() -> Self {
        ShaftDesign::new("", "", "")
    }
}

/// Gearbox output shaft on bearings at 2.25 in and 12.75 in: wheel loads at
/// both ends, a helical gear at 10.38 in, and a snap ring at 11.00 in.
pub fn sample_load_model() -> ShaftLoadModel {
    let mut model = ShaftLoadModel::new(15.0, [2.25, 12.75]);
    model.loads_y = vec![
        PointLoad::new(75.0, 0.0),
        PointLoad::new(75.0, 15.0),
        PointLoad::new(-240.0, 10.38),
    ];
    model.loads_z = vec![PointLoad::new(-740.0, 10.38)];
    model.torques = vec![AppliedTorque::new(562.5, 0.0), AppliedTorque::new(562.5, 15.0)];
    model.balancing_torque_at_in = Some(10.38);
    model.stations_in = vec![
        0.0, 1.75, 2.25, 2.75, 9.75, 10.38, 11.0, 12.25, 12.75, 13.25, 15.0,
    ];
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::shaft::SolveStatus;

    #[test]
    fn test_design_creation() {
        let design = ShaftDesign::new("John Doe", "25-001", "Countershaft");
        assert_eq!(design.meta.engineer, "John Doe");
        assert_eq!(design.meta.job_id, "25-001");
        assert_eq!(design.meta.version, SCHEMA_VERSION);
        assert_eq!(design.target_factors_of_safety, vec![2.0]);
    }

    #[test]
    fn test_sample_is_valid() {
        assert!(ShaftDesign::sample().validate().is_ok());
    }

    #[test]
    fn test_sample_study() {
        let study = ShaftDesign::sample().run().unwrap();
        assert_eq!(study.runs.len(), 2);

        let soft = study.find("1020 Steel", 2.0).unwrap();
        assert_eq!(soft.shaft.status, SolveStatus::SegmentFailures);
        let keyway_row = soft.shaft.segment("Keyway").unwrap();
        assert!(matches!(keyway_row.error, Some(CalcError::OutOfRange { .. })));
        // The key depends on the failed segment and reports its error
        let key = soft.keyway.as_ref().unwrap();
        assert!(matches!(key.error(), Some(CalcError::OutOfRange { .. })));

        let hard = study.find("4140 Steel", 2.0).unwrap();
        assert_eq!(hard.shaft.status, SolveStatus::Converged);
        let key = hard.keyway.as_ref().unwrap().sized().unwrap();
        assert_eq!(key.shaft_diameter_in, 1.25);
        assert!(key.length_in <= 1.5);
        let ring = hard.snap_ring.as_ref().unwrap().sized().unwrap();
        assert!(StandardCatalog::snap_ring_diameters().contains(ring.outer_diameter_in));
        assert!(ring.fos >= 2.0);
        assert!(hard.is_clean());
    }

    #[test]
    fn test_validation_errors() {
        let mut design = ShaftDesign::sample();
        design.materials.clear();
        assert_eq!(design.validate().unwrap_err().error_code(), "MISSING_FIELD");

        let mut design = ShaftDesign::sample();
        design.target_factors_of_safety = vec![2.0, -1.0];
        assert!(design.validate().is_err());

        let mut design = ShaftDesign::sample();
        design.keyway.as_mut().unwrap().segment = "Nowhere".to_string();
        assert!(design.validate().is_err());

        let mut design = ShaftDesign::sample();
        design.snap_ring.as_mut().unwrap().segment = "Nowhere".to_string();
        assert!(design.validate().is_err());

        let mut design = ShaftDesign::sample();
        design.catalogs.shaft_diameters.sizes_in = vec![1.0, 0.5];
        assert!(design.validate().is_err());

        let mut design = ShaftDesign::sample();
        design.solver.max_iterations = 0;
        assert!(design.validate().is_err());

        let mut design = ShaftDesign::sample();
        design.segments[0].linked_to = Some("Missing".to_string());
        assert!(design.validate().is_err());
    }

    #[test]
    fn test_station_loads_from_model() {
        let mut design = ShaftDesign::sample();
        design.segments = vec![SegmentInput::new("At Gear", 0.0, 0.0, 0.0).at_station(10.38)];
        design.keyway = None;
        design.snap_ring = None;

        let segments = design.resolved_segments().unwrap();
        let moment = segments[0].moment_inlb.worst_case().unwrap();
        let torque = segments[0].torque_inlb.worst_case().unwrap();
        assert!(moment > 0.0);
        assert!((torque - 562.5).abs() < 1e-9);

        design.load_model = None;
        assert_eq!(
            design.resolved_segments().unwrap_err().error_code(),
            "MISSING_FIELD"
        );
    }

    #[test]
    fn test_design_serialization() {
        let design = ShaftDesign::sample();
        let json = serde_json::to_string_pretty(&design).unwrap();
        assert!(json.contains("AISI 4140"));
        assert!(json.contains("Snap Ring for Gear"));

        let roundtrip: ShaftDesign = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, design);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "created": "2025-01-01T00:00:00Z",
                "modified": "2025-01-01T00:00:00Z"
            },
            "materials": [{ "type": "Steel", "grade": "AISI 4140" }],
            "target_factors_of_safety": [2.0, 2.5],
            "segments": [
                { "name": "Gear Shoulder", "shear_lb": 176, "moment_inlb": 1254, "torque_inlb": "462.5/925" }
            ]
        }"#;
        let design: ShaftDesign = serde_json::from_str(json).unwrap();
        assert_eq!(design.shear_model, ShearModel::IncludeDirectShear);
        assert_eq!(design.catalogs, CatalogSettings::default());
        assert_eq!(design.solver, SolverSettings::default());

        let study = design.run().unwrap();
        assert_eq!(study.runs.len(), 2);
        let d2 = study.runs[0].shaft.segments[0].required_diameter_in.unwrap();
        let d25 = study.runs[1].shaft.segments[0].required_diameter_in.unwrap();
        assert!(d25 > d2);
    }

    #[test]
    fn test_sample_load_analysis() {
        let result = ShaftDesign::sample().load_analysis().unwrap().unwrap();
        assert_eq!(result.stations.len(), 11);
        assert_eq!(result.balancing_torque_inlb, Some(-1125.0));
    }
}
