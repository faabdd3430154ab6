//! Shaft Steels
//!
//! Minimum yield strengths for common hot-rolled and heat-treated shaft
//! steels. Values are in psi.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::materials::SteelGrade;
//!
//! let grade = SteelGrade::from_str_flexible("4140 Steel").unwrap();
//! assert_eq!(grade, SteelGrade::Aisi4140);
//! assert_eq!(grade.yield_strength_psi(), 60_200.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Shaft steel grades with tabulated yield strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteelGrade {
    /// AISI 1018, hot rolled
    #[serde(rename = "AISI 1018")]
    Aisi1018,
    /// AISI 1020, hot rolled
    #[serde(rename = "AISI 1020")]
    Aisi1020,
    /// AISI 1045, hot rolled
    #[serde(rename = "AISI 1045")]
    Aisi1045,
    /// AISI 4140
    #[serde(rename = "AISI 4140")]
    Aisi4140,
}

impl SteelGrade {
    /// All grades, weakest first
    pub const ALL: [SteelGrade; 4] = [
        SteelGrade::Aisi1020,
        SteelGrade::Aisi1018,
        SteelGrade::Aisi1045,
        SteelGrade::Aisi4140,
    ];

    /// AISI designation number (e.g., "1020")
    pub fn code(&self) -> &'static str {
        match self {
            SteelGrade::Aisi1018 => "1018",
            SteelGrade::Aisi1020 => "1020",
            SteelGrade::Aisi1045 => "1045",
            SteelGrade::Aisi4140 => "4140",
        }
    }

    /// Minimum yield strength Sy (psi)
    pub fn yield_strength_psi(&self) -> f64 {
        match self {
            SteelGrade::Aisi1018 => 32_000.0,
            SteelGrade::Aisi1020 => 30_000.0,
            SteelGrade::Aisi1045 => 45_000.0,
            SteelGrade::Aisi4140 => 60_200.0,
        }
    }

    /// Get display name (e.g., "4140 Steel")
    pub fn display_name(&self) -> String {
        format!("{} Steel", self.code())
    }

    /// Parse from "1020", "AISI 1020", "1020 Steel", "aisi-1020", ...
    pub fn from_str_flexible(s: &str) -> CalcResult<Self> {
        let normalized = s
            .to_uppercase()
            .replace("AISI", "")
            .replace("STEEL", "")
            .replace(['-', '_', ' '], "");
        SteelGrade::ALL
            .iter()
            .copied()
            .find(|grade| grade.code() == normalized)
            .ok_or_else(|| CalcError::material_not_found(s))
    }
}

impl std::fmt::Display for SteelGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_yield_strengths() {
        assert_eq!(SteelGrade::Aisi1020.yield_strength_psi(), 30_000.0);
        assert_eq!(SteelGrade::Aisi4140.yield_strength_psi(), 60_200.0);
    }

    #[test]
    fn test_flexible_parsing() {
        assert_eq!(SteelGrade::from_str_flexible("1020").unwrap(), SteelGrade::Aisi1020);
        assert_eq!(SteelGrade::from_str_flexible("AISI 1045").unwrap(), SteelGrade::Aisi1045);
        assert_eq!(SteelGrade::from_str_flexible("4140 Steel").unwrap(), SteelGrade::Aisi4140);
        assert_eq!(SteelGrade::from_str_flexible("aisi-1018").unwrap(), SteelGrade::Aisi1018);
    }

    #[test]
    fn test_unknown_grade() {
        let err = SteelGrade::from_str_flexible("Unobtainium").unwrap_err();
        assert_eq!(err.error_code(), "MATERIAL_NOT_FOUND");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&SteelGrade::Aisi4140).unwrap();
        assert_eq!(json, "\"AISI 4140\"");
        let parsed: SteelGrade = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SteelGrade::Aisi4140);
    }
}
