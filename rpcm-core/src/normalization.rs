use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Offset/scale constants mapping raw image and geographic coordinates into
/// the normalized domain (typically [-1, 1]) the polynomials are fitted on.
///
/// Built once from the coefficient bundle and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationTable {
    pub row_offset: f64,
    pub row_scale: f64,
    pub col_offset: f64,
    pub col_scale: f64,
    pub lat_offset: f64,
    pub lat_scale: f64,
    pub lon_offset: f64,
    pub lon_scale: f64,
    pub alt_offset: f64,
    pub alt_scale: f64,
}

impl NormalizationTable {
    /// Reject zero or non-finite scales. A zero scale would turn every
    /// normalization into a division by zero.
    pub fn validate(&self) -> Result<(), ModelError> {
        let scales = [
            ("row", self.row_scale),
            ("col", self.col_scale),
            ("lat", self.lat_scale),
            ("lon", self.lon_scale),
            ("alt", self.alt_scale),
        ];
        for (axis, value) in scales {
            if value == 0.0 || !value.is_finite() {
                return Err(ModelError::InvalidScale { axis, value });
            }
        }
        Ok(())
    }

    pub fn normalize_row(&self, v: f64) -> f64 {
        (v - self.row_offset) / self.row_scale
    }

    pub fn normalize_col(&self, v: f64) -> f64 {
        (v - self.col_offset) / self.col_scale
    }

    pub fn normalize_lat(&self, v: f64) -> f64 {
        (v - self.lat_offset) / self.lat_scale
    }

    pub fn normalize_lon(&self, v: f64) -> f64 {
        (v - self.lon_offset) / self.lon_scale
    }

    pub fn normalize_alt(&self, v: f64) -> f64 {
        (v - self.alt_offset) / self.alt_scale
    }

    pub fn denormalize_row(&self, v: f64) -> f64 {
        v * self.row_scale + self.row_offset
    }

    pub fn denormalize_col(&self, v: f64) -> f64 {
        v * self.col_scale + self.col_offset
    }

    pub fn denormalize_lat(&self, v: f64) -> f64 {
        v * self.lat_scale + self.lat_offset
    }

    pub fn denormalize_lon(&self, v: f64) -> f64 {
        v * self.lon_scale + self.lon_offset
    }

    pub fn denormalize_alt(&self, v: f64) -> f64 {
        v * self.alt_scale + self.alt_offset
    }
}
