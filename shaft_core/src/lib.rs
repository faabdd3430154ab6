//! # shaft_core - Rotating Shaft Sizing Engine
//!
//! `shaft_core` sizes the diameters of a stepped rotating shaft, its key and
//! its snap ring so that every location meets a target factor of safety
//! against yield (distortion energy / von Mises). All inputs and outputs are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//! - **Bounded**: Every iterative solve has a budget and reports its status
//!
//! ## Quick Start
//!
//! ```rust
//! use shaft_core::design::ShaftDesign;
//!
//! // Gearbox output shaft on 1020 and 4140 steel at FoS 2.0
//! let study = ShaftDesign::sample().run().unwrap();
//! let run = study.find("4140 Steel", 2.0).unwrap();
//! println!("{}", run);
//! ```
//!
//! ## Modules
//!
//! - [`design`] - Design container, metadata and study runner
//! - [`calculations`] - Stress evaluation, bisection and the component sizers
//! - [`loads`] - Load magnitudes and the two-bearing load analysis
//! - [`materials`] - Steel grades and custom materials
//! - [`catalogs`] - Standard shaft, snap ring and key sizes
//! - [`report`] - Run and study reports
//! - [`errors`] - Structured error types
//! - [`file_io`] - Design and report files with atomic saves

pub mod calculations;
pub mod catalogs;
pub mod design;
pub mod errors;
pub mod file_io;
pub mod loads;
pub mod materials;
pub mod report;

// Re-export commonly used types at crate root for convenience
pub use catalogs::{KeyCatalog, StandardCatalog};
pub use design::{DesignMetadata, ShaftDesign, SCHEMA_VERSION};
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_design, save_design, save_report};
pub use materials::{Material, MaterialSpec, SteelGrade};
pub use report::{DesignReport, StudyReport};
