//! Iterative image-to-ground localization, used when a sensor ships no
//! direct inverse coefficients.

use nalgebra::Vector2;
use tracing::debug;

use crate::error::LocalizationError;
use crate::model::RpcModel;

/// Squared normalized-pixel residual below which a point counts as
/// converged.
const CONVERGENCE_TOLERANCE: f64 = 1e-18;

/// Perturbation step: wide on the first iteration, narrow afterwards.
const FIRST_STEP: f64 = 2.0;
const REFINE_STEP: f64 = 0.1;

/// Gauss-Newton-like fixed-point solver inverting the forward rational
/// functions.
///
/// Each update projects the pixel residual onto the local basis (e1, e2)
/// as if it were orthogonal. That holds only approximately for real RPC
/// fits; the shortcut is kept intentionally to match the established
/// numerical behavior instead of an exact 2x2 solve.
#[derive(Debug, Clone, Copy)]
pub struct IterativeLocalizer {
    /// Iteration cap. Exceeding it reports
    /// [`LocalizationError::DidNotConverge`] instead of looping forever.
    pub max_iterations: usize,
}

impl Default for IterativeLocalizer {
    fn default() -> Self {
        // well-posed RPC models converge in a handful of iterations
        Self { max_iterations: 100 }
    }
}

impl IterativeLocalizer {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Solve `projection(lon, lat, alt) = (col, row)` for one image point.
    ///
    /// Returns (lon, lat) in the normalized domain; the caller denormalizes
    /// if needed.
    pub fn solve(
        &self,
        model: &RpcModel,
        col: f64,
        row: f64,
        alt: f64,
    ) -> Result<(f64, f64), LocalizationError> {
        let n = model.normalization();
        let target = Vector2::new(n.normalize_col(col), n.normalize_row(row));
        let nalt = n.normalize_alt(alt);

        // start at a corner of the normalized domain
        let mut lon = -1.0;
        let mut lat = -1.0;
        let mut eps = FIRST_STEP;

        let mut x0 = project(model, lat, lon, nalt);
        let mut x1 = project(model, lat, lon + eps, nalt);
        let mut x2 = project(model, lat + eps, lon, nalt);

        for iteration in 0..=self.max_iterations {
            if (x0 - target).norm_squared() < CONVERGENCE_TOLERANCE {
                debug!(iteration, "iterative localization converged");
                return Ok((lon, lat));
            }
            if iteration == self.max_iterations {
                break;
            }

            let e1 = x1 - x0;
            let e2 = x2 - x0;
            let u = target - x0;

            // project u onto (e1, e2) assuming the basis is orthogonal:
            // a1 = <u, e1> / <e1, e1>, a2 = <u, e2> / <e2, e2>
            let a1 = u.dot(&e1) / e1.dot(&e1);
            let a2 = u.dot(&e2) / e2.dot(&e2);

            lon += a1 * eps;
            lat += a2 * eps;
            eps = REFINE_STEP;

            x0 = project(model, lat, lon, nalt);
            x1 = project(model, lat, lon + eps, nalt);
            x2 = project(model, lat + eps, lon, nalt);
        }

        Err(LocalizationError::DidNotConverge(self.max_iterations))
    }
}

fn project(model: &RpcModel, nlat: f64, nlon: f64, nalt: f64) -> Vector2<f64> {
    let (col, row) = model.projection_normalized(nlat, nlon, nalt);
    Vector2::new(col, row)
}
