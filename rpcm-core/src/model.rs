use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::localize::IterativeLocalizer;
use crate::normalization::NormalizationTable;
use crate::polynomial::{apply_rfm, apply_rfm_batch};

/// Numerator/denominator coefficient pair of one rational function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmPair {
    pub num: [f64; 20],
    pub den: [f64; 20],
}

impl RfmPair {
    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        apply_rfm(&self.num, &self.den, x, y, z)
    }

    pub fn eval_batch(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
        z: ArrayView1<f64>,
    ) -> Array1<f64> {
        apply_rfm_batch(&self.num, &self.den, x, y, z)
    }
}

/// Direct (image to ground) rational functions.
///
/// Vendors that do not ship these leave the model on the iterative
/// localization path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectModel {
    pub lon: RfmPair,
    pub lat: RfmPair,
}

/// Advisory pixel and geographic extents over which the model is considered
/// accurate. Carried through unchanged, never enforced during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityDomain {
    /// (first, last) row
    pub rows: Option<(f64, f64)>,
    /// (first, last) column
    pub cols: Option<(f64, f64)>,
    /// (first, last) longitude
    pub lons: Option<(f64, f64)>,
    /// (first, last) latitude
    pub lats: Option<(f64, f64)>,
}

/// Rational polynomial camera model for pushbroom satellite sensors.
///
/// Maps between image pixel coordinates (col, row) and geographic
/// coordinates (lon, lat, alt) through ratios of degree-3 polynomials
/// evaluated in a normalized domain. Read-only after construction; a shared
/// reference can be used from any number of threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcModel {
    normalization: NormalizationTable,
    col: RfmPair,
    row: RfmPair,
    direct: Option<DirectModel>,
    validity: Option<ValidityDomain>,
    // ERR_BIAS terms as shipped by the vendor. Stored for callers that want
    // to inspect them; the evaluated formulas do not apply them.
    localization_bias: Option<Vec<f64>>,
    projection_bias: Option<Vec<f64>>,
}

impl RpcModel {
    /// Build a model from the projection (ground to image) rational
    /// functions, which every valid bundle carries.
    pub fn new(normalization: NormalizationTable, col: RfmPair, row: RfmPair) -> Result<Self> {
        normalization.validate()?;
        Ok(Self {
            normalization,
            col,
            row,
            direct: None,
            validity: None,
            localization_bias: None,
            projection_bias: None,
        })
    }

    /// Attach direct localization coefficients, switching `localization`
    /// off the iterative path.
    pub fn with_direct(mut self, direct: DirectModel) -> Self {
        self.direct = Some(direct);
        self
    }

    pub fn with_validity(mut self, validity: ValidityDomain) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_localization_bias(mut self, bias: Vec<f64>) -> Self {
        self.localization_bias = Some(bias);
        self
    }

    pub fn with_projection_bias(mut self, bias: Vec<f64>) -> Self {
        self.projection_bias = Some(bias);
        self
    }

    pub fn normalization(&self) -> &NormalizationTable {
        &self.normalization
    }

    pub fn validity(&self) -> Option<&ValidityDomain> {
        self.validity.as_ref()
    }

    pub fn localization_bias(&self) -> Option<&[f64]> {
        self.localization_bias.as_deref()
    }

    pub fn projection_bias(&self) -> Option<&[f64]> {
        self.projection_bias.as_deref()
    }

    pub fn has_direct_localization(&self) -> bool {
        self.direct.is_some()
    }

    /// Project a geographic point to image coordinates (col, row).
    pub fn projection(&self, lon: f64, lat: f64, alt: f64) -> (f64, f64) {
        let n = &self.normalization;
        let (ncol, nrow) = self.projection_normalized(
            n.normalize_lat(lat),
            n.normalize_lon(lon),
            n.normalize_alt(alt),
        );
        (n.denormalize_col(ncol), n.denormalize_row(nrow))
    }

    /// Forward projection in the normalized domain. The coefficient
    /// convention puts latitude in the x slot and longitude in the y slot.
    pub(crate) fn projection_normalized(&self, nlat: f64, nlon: f64, nalt: f64) -> (f64, f64) {
        let col = self.col.eval(nlat, nlon, nalt);
        let row = self.row.eval(nlat, nlon, nalt);
        (col, row)
    }

    /// Batched [`projection`](Self::projection) over equal-length arrays.
    pub fn projection_batch(
        &self,
        lon: ArrayView1<f64>,
        lat: ArrayView1<f64>,
        alt: ArrayView1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        assert_eq!(lon.len(), lat.len(), "batch arrays must have equal length");
        assert_eq!(lon.len(), alt.len(), "batch arrays must have equal length");

        let n = &self.normalization;
        let nlon = lon.mapv(|v| n.normalize_lon(v));
        let nlat = lat.mapv(|v| n.normalize_lat(v));
        let nalt = alt.mapv(|v| n.normalize_alt(v));

        let col = self
            .col
            .eval_batch(nlat.view(), nlon.view(), nalt.view())
            .mapv(|v| n.denormalize_col(v));
        let row = self
            .row
            .eval_batch(nlat.view(), nlon.view(), nalt.view())
            .mapv(|v| n.denormalize_row(v));
        (col, row)
    }

    /// Locate the ground point imaged at (col, row), given its altitude.
    ///
    /// Uses the direct coefficients when the bundle carries them, otherwise
    /// falls back to the iterative solver with its default iteration cap.
    pub fn localization(&self, col: f64, row: f64, alt: f64) -> Result<(f64, f64)> {
        self.localize(col, row, alt, false)
    }

    /// Same as [`localization`](Self::localization) but leaves (lon, lat)
    /// in the normalized domain.
    pub fn localization_normalized(&self, col: f64, row: f64, alt: f64) -> Result<(f64, f64)> {
        self.localize(col, row, alt, true)
    }

    fn localize(&self, col: f64, row: f64, alt: f64, normalized: bool) -> Result<(f64, f64)> {
        let n = &self.normalization;
        let (lon, lat) = match &self.direct {
            Some(direct) => self.localize_direct(direct, col, row, alt),
            None => IterativeLocalizer::default().solve(self, col, row, alt)?,
        };
        if normalized {
            Ok((lon, lat))
        } else {
            Ok((n.denormalize_lon(lon), n.denormalize_lat(lat)))
        }
    }

    /// Direct localization in the normalized domain. Mirrors the argument
    /// swap of the projection: row lands in the x slot, col in the y slot.
    fn localize_direct(&self, direct: &DirectModel, col: f64, row: f64, alt: f64) -> (f64, f64) {
        let n = &self.normalization;
        let ncol = n.normalize_col(col);
        let nrow = n.normalize_row(row);
        let nalt = n.normalize_alt(alt);
        let lon = direct.lon.eval(nrow, ncol, nalt);
        let lat = direct.lat.eval(nrow, ncol, nalt);
        (lon, lat)
    }

    /// Batched [`localization`](Self::localization) over equal-length
    /// arrays. On the iterative path each point converges independently, so
    /// the batch is solved point-parallel.
    pub fn localization_batch(
        &self,
        col: ArrayView1<f64>,
        row: ArrayView1<f64>,
        alt: ArrayView1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        assert_eq!(col.len(), row.len(), "batch arrays must have equal length");
        assert_eq!(col.len(), alt.len(), "batch arrays must have equal length");

        let n = &self.normalization;
        match &self.direct {
            Some(direct) => {
                let ncol = col.mapv(|v| n.normalize_col(v));
                let nrow = row.mapv(|v| n.normalize_row(v));
                let nalt = alt.mapv(|v| n.normalize_alt(v));

                let lon = direct
                    .lon
                    .eval_batch(nrow.view(), ncol.view(), nalt.view())
                    .mapv(|v| n.denormalize_lon(v));
                let lat = direct
                    .lat
                    .eval_batch(nrow.view(), ncol.view(), nalt.view())
                    .mapv(|v| n.denormalize_lat(v));
                Ok((lon, lat))
            }
            None => {
                let localizer = IterativeLocalizer::default();
                let points = (0..col.len())
                    .into_par_iter()
                    .map(|i| {
                        let (nlon, nlat) = localizer.solve(self, col[i], row[i], alt[i])?;
                        Ok((n.denormalize_lon(nlon), n.denormalize_lat(nlat)))
                    })
                    .collect::<Result<Vec<(f64, f64)>>>()?;

                let (lon, lat): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
                Ok((Array1::from_vec(lon), Array1::from_vec(lat)))
            }
        }
    }
}
