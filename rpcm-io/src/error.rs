use thiserror::Error;

/// Errors raised while loading a coefficient bundle
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Missing tag: {0}")]
    MissingTag(String),

    #[error("Unsupported sensor: {0}")]
    UnsupportedSensor(String),

    #[error("Failed to parse value of {tag}: {value:?}")]
    Parse { tag: String, value: String },

    #[error("Expected 20 coefficients in {tag}, got {count}")]
    BadCoefficientCount { tag: String, count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Model error: {0}")]
    Model(#[from] rpcm_core::RpcError),
}

pub type Result<T> = std::result::Result<T, LoadError>;
