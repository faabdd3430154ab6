//! Standard Size Catalogs
//!
//! Continuous solver output is always rounded *up* to a manufacturable size.
//! A catalog is an ascending list of sizes in inches; key sizes are
//! width × height pairs.
//!
//! ## Example
//!
//! ```rust
//! use shaft_core::catalogs::StandardCatalog;
//!
//! let catalog = StandardCatalog::shaft_diameters();
//! assert_eq!(catalog.snap(0.8).unwrap(), 1.0);
//! assert_eq!(catalog.snap(1.0).unwrap(), 1.0);
//! assert!(catalog.snap(10.0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Standard shaft diameters (in)
const SHAFT_DIAMETERS_IN: [f64; 7] = [
    0.25,  // 1/4"
    0.375, // 3/8"
    0.5,   // 1/2"
    0.625, // 5/8"
    0.75,  // 3/4"
    1.0,   // 1"
    1.25,  // 1 1/4"
];

/// Standard external snap-ring outer diameters (in)
const SNAP_RING_DIAMETERS_IN: [f64; 50] = [
    0.25, 0.28125, 0.3125, 0.34375, 0.375, 0.40625, 0.4375, 0.46875, 0.5, 0.5625,
    0.59375, 0.625, 0.6875, 0.75, 0.78125, 0.8125, 0.84375, 0.875, 0.9375, 0.984375,
    1.0, 1.0625, 1.125, 1.1875, 1.25, 1.3125, 1.375, 1.4375, 1.5, 1.5625,
    1.625, 1.6875, 1.75, 1.8125, 1.875, 1.96875, 2.0, 2.0625, 2.125, 2.15625,
    2.25, 2.3125, 2.375, 2.4375, 2.5, 2.559, 2.625, 2.6875, 2.75, 2.875,
];

/// Standard inch parallel keys (width, height), square and rectangular
const KEY_SIZES_IN: [(f64, f64); 17] = [
    (0.0625, 0.0625),
    (0.09375, 0.09375),
    (0.125, 0.125),
    (0.1875, 0.1875),
    (0.25, 0.1875),
    (0.25, 0.25),
    (0.3125, 0.25),
    (0.3125, 0.3125),
    (0.375, 0.25),
    (0.375, 0.375),
    (0.5, 0.375),
    (0.5, 0.5),
    (0.625, 0.4375),
    (0.625, 0.625),
    (0.75, 0.5),
    (0.75, 0.75),
    (1.0, 0.75),
];

/// An ascending list of allowed sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardCatalog {
    /// Catalog name used in error messages (e.g., "shaft diameter")
    pub name: String,
    /// Sizes in inches, strictly ascending
    pub sizes_in: Vec<f64>,
}

impl StandardCatalog {
    /// Create a catalog, validating that sizes are positive and strictly ascending.
    pub fn new(name: impl Into<String>, sizes_in: Vec<f64>) -> CalcResult<Self> {
        let catalog = StandardCatalog {
            name: name.into(),
            sizes_in,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The 7-entry standard shaft diameter list (1/4" to 1 1/4")
    pub fn shaft_diameters() -> Self {
        StandardCatalog {
            name: "shaft diameter".to_string(),
            sizes_in: SHAFT_DIAMETERS_IN.to_vec(),
        }
    }

    /// The 50-entry snap-ring outer diameter list (1/4" to 2 7/8")
    pub fn snap_ring_diameters() -> Self {
        StandardCatalog {
            name: "snap ring diameter".to_string(),
            sizes_in: SNAP_RING_DIAMETERS_IN.to_vec(),
        }
    }

    /// Check that the catalog is usable for snapping
    pub fn validate(&self) -> CalcResult<()> {
        if self.sizes_in.is_empty() {
            return Err(CalcError::invalid_input(
                "sizes_in",
                "[]",
                format!("Catalog '{}' has no sizes", self.name),
            ));
        }
        if let Some(bad) = self.sizes_in.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(CalcError::invalid_input(
                "sizes_in",
                bad.to_string(),
                format!("Catalog '{}' sizes must be positive", self.name),
            ));
        }
        if let Some(pair) = self.sizes_in.windows(2).find(|w| w[1] <= w[0]) {
            return Err(CalcError::invalid_input(
                "sizes_in",
                format!("{} then {}", pair[0], pair[1]),
                format!("Catalog '{}' must be strictly ascending", self.name),
            ));
        }
        Ok(())
    }

    /// Largest size in the catalog
    pub fn max(&self) -> f64 {
        self.sizes_in.last().copied().unwrap_or(0.0)
    }

    /// Whether `size` is exactly a catalog entry
    pub fn contains(&self, size: f64) -> bool {
        self.sizes_in.iter().any(|s| *s == size)
    }

    /// Smallest catalog size greater than or equal to `required`.
    ///
    /// Returns `OutOfRange` when `required` exceeds the largest entry.
    pub fn snap(&self, required: f64) -> CalcResult<f64> {
        if !required.is_finite() {
            return Err(CalcError::invalid_input(
                "required",
                required.to_string(),
                "Required size must be finite",
            ));
        }
        self.sizes_in
            .iter()
            .copied()
            .find(|s| *s >= required)
            .ok_or_else(|| CalcError::out_of_range(self.name.clone(), required, self.max()))
    }

    /// Smallest catalog size strictly greater than `size`.
    pub fn next_larger(&self, size: f64) -> CalcResult<f64> {
        self.sizes_in
            .iter()
            .copied()
            .find(|s| *s > size)
            .ok_or_else(|| CalcError::out_of_range(self.name.clone(), size, self.max()))
    }
}

/// A key cross-section (in)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeySize {
    /// Key width w (in)
    pub width_in: f64,
    /// Key height H (in)
    pub height_in: f64,
}

impl KeySize {
    /// Create a key size
    pub fn new(width_in: f64, height_in: f64) -> Self {
        KeySize { width_in, height_in }
    }

    /// True when both dimensions are at least the required ones
    pub fn dominates(&self, width_in: f64, height_in: f64) -> bool {
        self.width_in >= width_in && self.height_in >= height_in
    }

    /// Fractional-inch style label (e.g., "0.2500 x 0.1875")
    pub fn label(&self) -> String {
        format!("{:.4} x {:.4}", self.width_in, self.height_in)
    }
}

/// Result of selecting a key from a paired catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeySelection {
    /// The selected key size
    pub size: KeySize,
    /// True when no entry dominated the requirement and the largest key was
    /// returned instead. The selected key is then undersized in at least one
    /// dimension.
    pub fallback: bool,
}

/// Ordered list of key width/height pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCatalog {
    /// Key sizes ordered by width, then height
    pub sizes: Vec<KeySize>,
}

impl KeyCatalog {
    /// Standard inch square and rectangular parallel keys
    pub fn standard() -> Self {
        KeyCatalog {
            sizes: KEY_SIZES_IN
                .iter()
                .map(|(w, h)| KeySize::new(*w, *h))
                .collect(),
        }
    }

    /// First key whose width and height both cover the requirement.
    ///
    /// Falls back to the largest key (flagged) when none does.
    pub fn select(&self, required_width_in: f64, required_height_in: f64) -> CalcResult<KeySelection> {
        if let Some(size) = self
            .sizes
            .iter()
            .find(|k| k.dominates(required_width_in, required_height_in))
        {
            return Ok(KeySelection {
                size: *size,
                fallback: false,
            });
        }
        let largest = self.sizes.last().copied().ok_or_else(|| {
            CalcError::invalid_input("sizes", "[]", "Key catalog has no sizes")
        })?;
        tracing::warn!(
            required_width_in,
            required_height_in,
            fallback = %largest.label(),
            "no catalog key covers the required section, using the largest key"
        );
        Ok(KeySelection {
            size: largest,
            fallback: true,
        })
    }
}

impl Default for KeyCatalog {
    fn default() -> Self {
        KeyCatalog::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogs_are_valid() {
        assert!(StandardCatalog::shaft_diameters().validate().is_ok());
        assert!(StandardCatalog::snap_ring_diameters().validate().is_ok());
        assert_eq!(StandardCatalog::shaft_diameters().sizes_in.len(), 7);
        assert_eq!(StandardCatalog::snap_ring_diameters().sizes_in.len(), 50);
    }

    #[test]
    fn test_snap_rounds_up() {
        let catalog = StandardCatalog::shaft_diameters();
        assert_eq!(catalog.snap(0.1).unwrap(), 0.25);
        assert_eq!(catalog.snap(0.51).unwrap(), 0.625);
        assert_eq!(catalog.snap(1.1).unwrap(), 1.25);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let catalog = StandardCatalog::snap_ring_diameters();
        for size in &catalog.sizes_in {
            assert_eq!(catalog.snap(*size).unwrap(), *size);
        }
    }

    #[test]
    fn test_snap_is_monotonic() {
        let catalog = StandardCatalog::snap_ring_diameters();
        let mut previous = 0.0;
        let mut required = 0.05;
        while required < catalog.max() {
            let snapped = catalog.snap(required).unwrap();
            assert!(snapped >= previous, "snap({}) = {} < {}", required, snapped, previous);
            assert!(snapped >= required);
            previous = snapped;
            required += 0.0137;
        }
    }

    #[test]
    fn test_snap_out_of_range() {
        let catalog = StandardCatalog::shaft_diameters();
        let err = catalog.snap(10.0).unwrap_err();
        match err {
            CalcError::OutOfRange { required, max, .. } => {
                assert_eq!(required, 10.0);
                assert_eq!(max, 1.25);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_next_larger() {
        let catalog = StandardCatalog::shaft_diameters();
        assert_eq!(catalog.next_larger(0.75).unwrap(), 1.0);
        assert_eq!(catalog.next_larger(0.8).unwrap(), 1.0);
        assert!(catalog.next_larger(1.25).is_err());
    }

    #[test]
    fn test_custom_catalog_validation() {
        assert!(StandardCatalog::new("custom", vec![]).is_err());
        assert!(StandardCatalog::new("custom", vec![0.5, 0.5]).is_err());
        assert!(StandardCatalog::new("custom", vec![1.0, 0.5]).is_err());
        assert!(StandardCatalog::new("custom", vec![-0.5, 0.5]).is_err());
        assert!(StandardCatalog::new("custom", vec![0.5, 0.75, 1.5]).is_ok());
    }

    #[test]
    fn test_key_selection_dominates_both() {
        let catalog = KeyCatalog::standard();
        let selection = catalog.select(0.25, 0.2).unwrap();
        assert!(!selection.fallback);
        assert_eq!(selection.size, KeySize::new(0.25, 0.25));

        let selection = catalog.select(0.3, 0.1).unwrap();
        assert_eq!(selection.size, KeySize::new(0.3125, 0.25));
    }

    #[test]
    fn test_key_selection_fallback() {
        let catalog = KeyCatalog::standard();
        let selection = catalog.select(0.5, 1.5).unwrap();
        assert!(selection.fallback);
        assert_eq!(selection.size, KeySize::new(1.0, 0.75));
    }

    #[test]
    fn test_catalog_serialization() {
        let catalog = StandardCatalog::shaft_diameters();
        let json = serde_json::to_string(&catalog).unwrap();
        let parsed: StandardCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, catalog);
    }
}
