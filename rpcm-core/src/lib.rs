//! Rational polynomial camera (RPC) model for pushbroom satellite sensors.
//!
//! Pure math, no I/O: coefficient bundles are produced by the loaders in
//! `rpcm-io` (or any other source) and evaluated here.

pub mod error;
pub mod localize;
pub mod model;
pub mod normalization;
pub mod polynomial;

pub use error::{LocalizationError, ModelError, Result, RpcError};
pub use localize::IterativeLocalizer;
pub use model::{DirectModel, RfmPair, RpcModel, ValidityDomain};
pub use normalization::NormalizationTable;
pub use polynomial::{apply_poly, apply_poly_batch, apply_rfm, apply_rfm_batch};
