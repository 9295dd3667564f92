//! Flat key-value RPC files following the IKONOS convention.
//!
//! Lines of `TAG value`, where the tag names either an offset/scale
//! (`LINE_OFF:`, `SAMP_SCALE:`, ...) or a 1-indexed coefficient
//! (`LINE_NUM_COEFF_7:`, `SAMP_DEN_COEFF_13:`, ...). Only the projection
//! functions exist in this format, so loaded models localize iteratively.

use std::fs;
use std::path::Path;

use rpcm_core::{NormalizationTable, RfmPair, RpcModel};

use crate::error::{LoadError, Result};

/// Load an IKONOS-convention RPC file.
pub fn from_path(path: impl AsRef<Path>) -> Result<RpcModel> {
    from_str(&fs::read_to_string(path)?)
}

/// Parse IKONOS-convention RPC text.
pub fn from_str(text: &str) -> Result<RpcModel> {
    let mut builder = Builder::default();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(tag), Some(value)) = (parts.next(), parts.next()) {
            builder.add(tag, value)?;
        }
    }
    builder.build()
}

#[derive(Default)]
struct Builder {
    row_offset: Option<f64>,
    col_offset: Option<f64>,
    lat_offset: Option<f64>,
    lon_offset: Option<f64>,
    alt_offset: Option<f64>,
    row_scale: Option<f64>,
    col_scale: Option<f64>,
    lat_scale: Option<f64>,
    lon_scale: Option<f64>,
    alt_scale: Option<f64>,
    row_num: [Option<f64>; 20],
    row_den: [Option<f64>; 20],
    col_num: [Option<f64>; 20],
    col_den: [Option<f64>; 20],
}

impl Builder {
    /// Record one tag. Unrecognized tags are skipped, matching the lenient
    /// behavior expected of this format.
    fn add(&mut self, tag: &str, value: &str) -> Result<()> {
        let name = tag.trim_end_matches(':');
        let parts: Vec<&str> = name.split('_').collect();

        match parts.as_slice() {
            [field, kind @ ("OFF" | "SCALE")] => {
                let slot = match (*field, *kind) {
                    ("LINE", "OFF") => &mut self.row_offset,
                    ("SAMP", "OFF") => &mut self.col_offset,
                    ("LAT", "OFF") => &mut self.lat_offset,
                    ("LONG", "OFF") => &mut self.lon_offset,
                    ("HEIGHT", "OFF") => &mut self.alt_offset,
                    ("LINE", "SCALE") => &mut self.row_scale,
                    ("SAMP", "SCALE") => &mut self.col_scale,
                    ("LAT", "SCALE") => &mut self.lat_scale,
                    ("LONG", "SCALE") => &mut self.lon_scale,
                    ("HEIGHT", "SCALE") => &mut self.alt_scale,
                    _ => return Ok(()),
                };
                *slot = Some(parse_float(tag, value)?);
            }
            [field, kind @ ("NUM" | "DEN"), "COEFF", index] => {
                let Ok(index) = index.parse::<usize>() else {
                    return Ok(());
                };
                if !(1..=20).contains(&index) {
                    return Ok(());
                }
                let coeffs = match (*field, *kind) {
                    ("LINE", "NUM") => &mut self.row_num,
                    ("LINE", "DEN") => &mut self.row_den,
                    ("SAMP", "NUM") => &mut self.col_num,
                    ("SAMP", "DEN") => &mut self.col_den,
                    _ => return Ok(()),
                };
                // tags are 1-indexed, storage is 0-indexed
                coeffs[index - 1] = Some(parse_float(tag, value)?);
            }
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<RpcModel> {
        let normalization = NormalizationTable {
            row_offset: require(self.row_offset, "LINE_OFF")?,
            row_scale: require(self.row_scale, "LINE_SCALE")?,
            col_offset: require(self.col_offset, "SAMP_OFF")?,
            col_scale: require(self.col_scale, "SAMP_SCALE")?,
            lat_offset: require(self.lat_offset, "LAT_OFF")?,
            lat_scale: require(self.lat_scale, "LAT_SCALE")?,
            lon_offset: require(self.lon_offset, "LONG_OFF")?,
            lon_scale: require(self.lon_scale, "LONG_SCALE")?,
            alt_offset: require(self.alt_offset, "HEIGHT_OFF")?,
            alt_scale: require(self.alt_scale, "HEIGHT_SCALE")?,
        };
        let col = RfmPair {
            num: collect(self.col_num, "SAMP_NUM_COEFF")?,
            den: collect(self.col_den, "SAMP_DEN_COEFF")?,
        };
        let row = RfmPair {
            num: collect(self.row_num, "LINE_NUM_COEFF")?,
            den: collect(self.row_den, "LINE_DEN_COEFF")?,
        };
        Ok(RpcModel::new(normalization, col, row)?)
    }
}

fn require(value: Option<f64>, tag: &str) -> Result<f64> {
    value.ok_or_else(|| LoadError::MissingTag(tag.to_string()))
}

fn collect(values: [Option<f64>; 20], prefix: &str) -> Result<[f64; 20]> {
    let mut out = [0.0; 20];
    for (i, value) in values.into_iter().enumerate() {
        out[i] = value.ok_or_else(|| LoadError::MissingTag(format!("{}_{}", prefix, i + 1)))?;
    }
    Ok(out)
}

fn parse_float(tag: &str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| LoadError::Parse {
        tag: tag.to_string(),
        value: value.to_string(),
    })
}
