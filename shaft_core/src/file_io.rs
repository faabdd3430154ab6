//! # File I/O Module
//!
//! Design and report files with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **Version validation**: Ensure schema compatibility on load
//!
//! ## File Format
//!
//! Designs and reports are plain pretty-printed JSON. The `.json` extension
//! is conventional but not required.
//!
//! ## Example
//!
//! ```rust,no_run
//! use shaft_core::design::ShaftDesign;
//! use shaft_core::file_io::{load_design, save_design};
//! use std::path::Path;
//!
//! let design = ShaftDesign::sample();
//! let path = Path::new("gearbox_output_shaft.json");
//!
//! save_design(&design, path).unwrap();
//! let loaded = load_design(path).unwrap();
//! assert_eq!(loaded.segments.len(), 7);
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::design::{ShaftDesign, SCHEMA_VERSION};
use crate::errors::{CalcError, CalcResult};
use crate::report::StudyReport;

/// Temp file used while saving `path`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` to pretty JSON and write it with atomic write semantics.
///
/// The save process:
/// 1. Serialize to JSON
/// 2. Write to a temporary file (`<name>.tmp`)
/// 3. Sync to disk (fsync)
/// 4. Rename over the target (atomic on most filesystems)
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::debug!(path = %path.display(), bytes = json.len(), "file saved");
    Ok(())
}

/// Save a design file.
///
/// # Example
///
/// ```rust,no_run
/// use shaft_core::design::ShaftDesign;
/// use shaft_core::file_io::save_design;
/// use std::path::Path;
///
/// save_design(&ShaftDesign::sample(), Path::new("sample.json"))?;
/// # Ok::<(), shaft_core::errors::CalcError>(())
/// ```
pub fn save_design(design: &ShaftDesign, path: &Path) -> CalcResult<()> {
    write_json_atomic(design, path)
}

/// Save a study report as JSON.
pub fn save_report(report: &StudyReport, path: &Path) -> CalcResult<()> {
    write_json_atomic(report, path)
}

/// Load a design file.
///
/// # Returns
///
/// * `Ok(ShaftDesign)` - Successfully loaded design
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid JSON
/// * `Err(CalcError::FileError)` - I/O error
///
/// The design is not validated here; [`ShaftDesign::run`] does that.
pub fn load_design(path: &Path) -> CalcResult<ShaftDesign> {
    let mut file = File::open(path).map_err(|e| {
        CalcError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        CalcError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    let design: ShaftDesign =
        serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;

    validate_version(&design.meta.version)?;

    tracing::debug!(
        path = %path.display(),
        job_id = %design.meta.job_id,
        segments = design.segments.len(),
        "design loaded"
    );
    Ok(design)
}

/// Validate that a file version is compatible with the current schema.
pub fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version
        .split('.')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| mismatch())?;
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    match (file_parts.as_slice(), current_parts.as_slice()) {
        ([file_major, ..], [major, ..]) if file_major != major => Err(mismatch()),
        // 0.x allows breaking changes between minors; refuse newer files
        ([0, file_minor, ..], [0, minor, ..]) if file_minor > minor => Err(mismatch()),
        ([_, ..], [_, ..]) => Ok(()),
        _ => Err(mismatch()),
    }
}
