//! # Error Types
//!
//! Structured error types for shaft_core. Every sizing failure carries enough
//! context (which quantity, which bound, which catalog) to tell an undersized
//! design apart from a bad input file.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::errors::{CalcError, CalcResult};
//!
//! fn validate_diameter(d_in: f64) -> CalcResult<()> {
//!     if d_in <= 0.0 {
//!         return Err(CalcError::degenerate_geometry(
//!             "diameter_in",
//!             format!("diameter must be positive, got {}", d_in),
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_diameter(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for shaft_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for sizing operations.
///
/// Serializes with a `type` discriminator so failed segments can be embedded
/// directly in JSON reports.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Material not found in the material library
    #[error("Material not found: {material_name}")]
    MaterialNotFound { material_name: String },

    /// Required dimension is larger than every entry of a standard catalog
    #[error("Out of range: {required:.4} in exceeds the largest {catalog} size ({max:.4} in)")]
    OutOfRange {
        catalog: String,
        required: f64,
        max: f64,
    },

    /// The target factor of safety cannot be reached inside the search bracket
    #[error(
        "Target unreachable: {quantity} reaches FoS {fos_at_bound:.4} at the {bound:.4} in bound, target is {target_fos}"
    )]
    TargetUnreachable {
        quantity: String,
        target_fos: f64,
        bound: f64,
        fos_at_bound: f64,
    },

    /// An iterative solver used its whole budget without meeting its tolerance
    #[error("Not converged: {solver} exhausted {iterations} iterations")]
    NotConverged { solver: String, iterations: usize },

    /// Zero, negative or non-finite geometry passed to a stress formula
    #[error("Degenerate geometry for '{quantity}': {reason}")]
    DegenerateGeometry { quantity: String, reason: String },

    /// Joint optimisation could not satisfy its bounds
    #[error("Infeasible {component}: {reason}")]
    Infeasible { component: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a MaterialNotFound error
    pub fn material_not_found(material_name: impl Into<String>) -> Self {
        CalcError::MaterialNotFound {
            material_name: material_name.into(),
        }
    }

    /// Create an OutOfRange error
    pub fn out_of_range(catalog: impl Into<String>, required: f64, max: f64) -> Self {
        CalcError::OutOfRange {
            catalog: catalog.into(),
            required,
            max,
        }
    }

    /// Create a TargetUnreachable error
    pub fn target_unreachable(quantity: impl Into<String>, target_fos: f64, bound: f64, fos_at_bound: f64) -> Self {
        CalcError::TargetUnreachable {
            quantity: quantity.into(),
            target_fos,
            bound,
            fos_at_bound,
        }
    }

    /// Create a NotConverged error
    pub fn not_converged(solver: impl Into<String>, iterations: usize) -> Self {
        CalcError::NotConverged {
            solver: solver.into(),
            iterations,
        }
    }

    /// Create a DegenerateGeometry error
    pub fn degenerate_geometry(quantity: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::DegenerateGeometry {
            quantity: quantity.into(),
            reason: reason.into(),
        }
    }

    /// Create an Infeasible error
    pub fn infeasible(component: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::Infeasible {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean the design itself does not work, as opposed
    /// to a problem with the input file or the filesystem.
    pub fn is_sizing_failure(&self) -> bool {
        matches!(
            self,
            CalcError::OutOfRange { .. }
                | CalcError::TargetUnreachable { .. }
                | CalcError::NotConverged { .. }
                | CalcError::Infeasible { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::MaterialNotFound { .. } => "MATERIAL_NOT_FOUND",
            CalcError::OutOfRange { .. } => "OUT_OF_RANGE",
            CalcError::TargetUnreachable { .. } => "TARGET_UNREACHABLE",
            CalcError::NotConverged { .. } => "NOT_CONVERGED",
            CalcError::DegenerateGeometry { .. } => "DEGENERATE_GEOMETRY",
            CalcError::Infeasible { .. } => "INFEASIBLE",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::out_of_range("shaft diameter", 10.0, 1.25);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"OutOfRange\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::missing_field("segments").error_code(), "MISSING_FIELD");
        assert_eq!(CalcError::material_not_found("AISI 9999").error_code(), "MATERIAL_NOT_FOUND");
        assert_eq!(CalcError::infeasible("keyway", "too long").error_code(), "INFEASIBLE");
    }

    #[test]
    fn test_sizing_failure_classification() {
        assert!(CalcError::out_of_range("snap ring", 3.0, 2.875).is_sizing_failure());
        assert!(CalcError::not_converged("shaft", 50).is_sizing_failure());
        assert!(!CalcError::invalid_input("target_fos", "-1", "must be positive").is_sizing_failure());
        assert!(!CalcError::degenerate_geometry("diameter_in", "zero").is_sizing_failure());
    }

    #[test]
    fn test_out_of_range_message() {
        let error = CalcError::out_of_range("shaft diameter", 10.0, 1.25);
        let message = error.to_string();
        assert!(message.contains("10.0000"));
        assert!(message.contains("1.2500"));
    }
}
