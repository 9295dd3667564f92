use thiserror::Error;

/// Common errors across the RPC model crates
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Localization error: {0}")]
    Localization(#[from] LocalizationError),
}

/// Rejections raised while assembling a model from a coefficient bundle
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid {axis} scale: {value} (must be finite and nonzero)")]
    InvalidScale { axis: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum LocalizationError {
    #[error("Localization did not converge after {0} iterations")]
    DidNotConverge(usize),
}

pub type Result<T> = std::result::Result<T, RpcError>;
