//! Degree-3 trivariate polynomials and their ratios, the arithmetic core of
//! the RPC model.

use ndarray::{Array1, ArrayView1, Zip};

/// Evaluate a 20-coefficient degree-3 polynomial in three variables.
///
/// The term order follows the RPC coefficient convention, so a coefficient
/// file can be loaded into the array positionally.
pub fn apply_poly(poly: &[f64; 20], x: f64, y: f64, z: f64) -> f64 {
    poly[0]
        + poly[1] * y
        + poly[2] * x
        + poly[3] * z
        + poly[4] * y * x
        + poly[5] * y * z
        + poly[6] * x * z
        + poly[7] * y * y
        + poly[8] * x * x
        + poly[9] * z * z
        + poly[10] * x * y * z
        + poly[11] * y * y * y
        + poly[12] * y * x * x
        + poly[13] * y * z * z
        + poly[14] * y * y * x
        + poly[15] * x * x * x
        + poly[16] * x * z * z
        + poly[17] * y * y * z
        + poly[18] * x * x * z
        + poly[19] * z * z * z
}

/// Evaluate a rational function model, the ratio of two RPC polynomials.
///
/// A zero denominator yields IEEE infinity or NaN, propagated unchanged.
pub fn apply_rfm(num: &[f64; 20], den: &[f64; 20], x: f64, y: f64, z: f64) -> f64 {
    apply_poly(num, x, y, z) / apply_poly(den, x, y, z)
}

/// Batched [`apply_poly`] over equal-length coordinate arrays.
pub fn apply_poly_batch(
    poly: &[f64; 20],
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    z: ArrayView1<f64>,
) -> Array1<f64> {
    Zip::from(x)
        .and(y)
        .and(z)
        .map_collect(|&x, &y, &z| apply_poly(poly, x, y, z))
}

/// Batched [`apply_rfm`] over equal-length coordinate arrays.
pub fn apply_rfm_batch(
    num: &[f64; 20],
    den: &[f64; 20],
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    z: ArrayView1<f64>,
) -> Array1<f64> {
    Zip::from(x)
        .and(y)
        .and(z)
        .map_collect(|&x, &y, &z| apply_rfm(num, den, x, y, z))
}
