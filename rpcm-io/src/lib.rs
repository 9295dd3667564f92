//! Coefficient-bundle loaders for RPC camera models.
//!
//! Turns vendor metadata files into ready-to-evaluate
//! [`RpcModel`](rpcm_core::RpcModel)s. Every format problem (missing tag,
//! unknown sensor, malformed value) surfaces here at load time, never during
//! evaluation.

pub mod error;
pub mod ikonos;
pub mod xml;

use std::path::Path;

use rpcm_core::RpcModel;

pub use error::{LoadError, Result};
pub use xml::SensorProfile;

/// Load an RPC model from a file, picking the parser by extension: `.xml`
/// goes through the structured-tree parser, anything else is assumed to
/// follow the flat IKONOS convention.
pub fn load(path: impl AsRef<Path>) -> Result<RpcModel> {
    let path = path.as_ref();
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if is_xml {
        xml::from_path(path)
    } else {
        ikonos::from_path(path)
    }
}
