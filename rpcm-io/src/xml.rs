//! Structured XML RPC bundles.
//!
//! Two vendor families are recognized, dispatched on a discriminant tag read
//! before any coefficient: DIMAP products (Pleiades, SPOT 6/7) and
//! DigitalGlobe WorldView RPB metadata. Anything else is a hard
//! [`LoadError::UnsupportedSensor`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use rpcm_core::{DirectModel, NormalizationTable, RfmPair, RpcModel, ValidityDomain};
use tracing::debug;

use crate::error::{LoadError, Result};

/// Sensor families with a recognized RPC layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorProfile {
    /// DIMAP products: Pleiades (PHR) and SPOT 6/7.
    Dimap,
    /// DigitalGlobe WorldView 1/2/3.
    WorldView,
}

const DIMAP_PROFILES: [&str; 3] = ["PHR_SENSOR", "S6_SENSOR", "S7_SENSOR"];
const WORLDVIEW_SATIDS: [&str; 3] = ["WV01", "WV02", "WV03"];

const GLOBAL_RFM: &str = "Rational_Function_Model/Global_RFM";

/// Load an XML RPC file.
pub fn from_path(path: impl AsRef<Path>) -> Result<RpcModel> {
    from_str(&fs::read_to_string(path)?)
}

/// Parse an XML RPC document.
pub fn from_str(xml: &str) -> Result<RpcModel> {
    let doc = Document::parse(xml)?;
    match detect_profile(&doc)? {
        SensorProfile::Dimap => parse_dimap(&doc),
        SensorProfile::WorldView => parse_worldview(&doc),
    }
}

fn detect_profile(doc: &Document) -> Result<SensorProfile> {
    if let Some(profile) = doc.opt_text("Metadata_Identification/METADATA_PROFILE") {
        if DIMAP_PROFILES.contains(&profile) {
            debug!(profile, "detected DIMAP RPC product");
            return Ok(SensorProfile::Dimap);
        }
        return Err(LoadError::UnsupportedSensor(profile.to_string()));
    }
    if let Some(satid) = doc.opt_text("IMD/IMAGE/SATID") {
        if WORLDVIEW_SATIDS.contains(&satid) {
            debug!(satid, "detected WorldView RPC product");
            return Ok(SensorProfile::WorldView);
        }
        return Err(LoadError::UnsupportedSensor(satid.to_string()));
    }
    Err(LoadError::UnsupportedSensor(
        "no sensor discriminant tag found".to_string(),
    ))
}

fn parse_dimap(doc: &Document) -> Result<RpcModel> {
    let direct = format!("{GLOBAL_RFM}/Direct_Model");
    let inverse = format!("{GLOBAL_RFM}/Inverse_Model");
    let validity = format!("{GLOBAL_RFM}/RFM_Validity");

    // direct model: image to ground
    let lon = RfmPair {
        num: doc.coeff_array(&direct, "SAMP_NUM_COEFF")?,
        den: doc.coeff_array(&direct, "SAMP_DEN_COEFF")?,
    };
    let lat = RfmPair {
        num: doc.coeff_array(&direct, "LINE_NUM_COEFF")?,
        den: doc.coeff_array(&direct, "LINE_DEN_COEFF")?,
    };
    let localization_bias = vec![
        doc.float(&format!("{direct}/ERR_BIAS_X"))?,
        doc.float(&format!("{direct}/ERR_BIAS_Y"))?,
    ];

    // inverse model: ground to image
    let col = RfmPair {
        num: doc.coeff_array(&inverse, "SAMP_NUM_COEFF")?,
        den: doc.coeff_array(&inverse, "SAMP_DEN_COEFF")?,
    };
    let row = RfmPair {
        num: doc.coeff_array(&inverse, "LINE_NUM_COEFF")?,
        den: doc.coeff_array(&inverse, "LINE_DEN_COEFF")?,
    };
    let projection_bias = vec![
        doc.float(&format!("{inverse}/ERR_BIAS_ROW"))?,
        doc.float(&format!("{inverse}/ERR_BIAS_COL"))?,
    ];

    let vd = format!("{validity}/Direct_Model_Validity_Domain");
    let vi = format!("{validity}/Inverse_Model_Validity_Domain");
    let domain = ValidityDomain {
        rows: Some((
            doc.float(&format!("{vd}/FIRST_ROW"))?,
            doc.float(&format!("{vd}/LAST_ROW"))?,
        )),
        cols: Some((
            doc.float(&format!("{vd}/FIRST_COL"))?,
            doc.float(&format!("{vd}/LAST_COL"))?,
        )),
        lons: Some((
            doc.float(&format!("{vi}/FIRST_LON"))?,
            doc.float(&format!("{vi}/LAST_LON"))?,
        )),
        lats: Some((
            doc.float(&format!("{vi}/FIRST_LAT"))?,
            doc.float(&format!("{vi}/LAST_LAT"))?,
        )),
    };

    // DIMAP indexes the top-left pixel as (1, 1); shift the pixel offsets
    // to the 0-based convention used everywhere else
    let normalization = NormalizationTable {
        row_offset: doc.float(&format!("{validity}/LINE_OFF"))? - 1.0,
        col_offset: doc.float(&format!("{validity}/SAMP_OFF"))? - 1.0,
        lat_offset: doc.float(&format!("{validity}/LAT_OFF"))?,
        lon_offset: doc.float(&format!("{validity}/LONG_OFF"))?,
        alt_offset: doc.float(&format!("{validity}/HEIGHT_OFF"))?,
        row_scale: doc.float(&format!("{validity}/LINE_SCALE"))?,
        col_scale: doc.float(&format!("{validity}/SAMP_SCALE"))?,
        lat_scale: doc.float(&format!("{validity}/LAT_SCALE"))?,
        lon_scale: doc.float(&format!("{validity}/LONG_SCALE"))?,
        alt_scale: doc.float(&format!("{validity}/HEIGHT_SCALE"))?,
    };

    Ok(RpcModel::new(normalization, col, row)?
        .with_direct(DirectModel { lon, lat })
        .with_validity(domain)
        .with_localization_bias(localization_bias)
        .with_projection_bias(projection_bias))
}

fn parse_worldview(doc: &Document) -> Result<RpcModel> {
    let image = "RPB/IMAGE";

    let row = RfmPair {
        num: doc.coeff_list(&format!("{image}/LINENUMCOEFList/LINENUMCOEF"))?,
        den: doc.coeff_list(&format!("{image}/LINEDENCOEFList/LINEDENCOEF"))?,
    };
    let col = RfmPair {
        num: doc.coeff_list(&format!("{image}/SAMPNUMCOEFList/SAMPNUMCOEF"))?,
        den: doc.coeff_list(&format!("{image}/SAMPDENCOEFList/SAMPDENCOEF"))?,
    };
    let projection_bias = vec![doc.float(&format!("{image}/ERRBIAS"))?];

    let normalization = NormalizationTable {
        row_offset: doc.float(&format!("{image}/LINEOFFSET"))?,
        col_offset: doc.float(&format!("{image}/SAMPOFFSET"))?,
        lat_offset: doc.float(&format!("{image}/LATOFFSET"))?,
        lon_offset: doc.float(&format!("{image}/LONGOFFSET"))?,
        alt_offset: doc.float(&format!("{image}/HEIGHTOFFSET"))?,
        row_scale: doc.float(&format!("{image}/LINESCALE"))?,
        col_scale: doc.float(&format!("{image}/SAMPSCALE"))?,
        lat_scale: doc.float(&format!("{image}/LATSCALE"))?,
        lon_scale: doc.float(&format!("{image}/LONGSCALE"))?,
        alt_scale: doc.float(&format!("{image}/HEIGHTSCALE"))?,
    };

    // only the image extent is published; WorldView ships no direct model,
    // so localization goes through the iterative solver
    let domain = ValidityDomain {
        rows: Some((0.0, doc.float("IMD/NUMROWS")?)),
        cols: Some((0.0, doc.float("IMD/NUMCOLUMNS")?)),
        lons: None,
        lats: None,
    };

    Ok(RpcModel::new(normalization, col, row)?
        .with_validity(domain)
        .with_projection_bias(projection_bias))
}

/// Flattened view of the document: element paths (relative to the root
/// element, '/'-joined) mapped to their text content. The first occurrence
/// of a path wins, matching find-first tree lookups.
struct Document {
    tags: HashMap<String, String>,
}

impl Document {
    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        reader.trim_text(true);

        let mut tags = HashMap::new();
        let mut stack: Vec<String> = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(t) if stack.len() > 1 => {
                    let text = t.unescape()?;
                    let text = text.trim();
                    if !text.is_empty() {
                        tags.entry(stack[1..].join("/"))
                            .or_insert_with(|| text.to_string());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(Self { tags })
    }

    fn opt_text(&self, path: &str) -> Option<&str> {
        self.tags.get(path).map(String::as_str)
    }

    fn text(&self, path: &str) -> Result<&str> {
        self.opt_text(path)
            .ok_or_else(|| LoadError::MissingTag(path.to_string()))
    }

    fn float(&self, path: &str) -> Result<f64> {
        let value = self.text(path)?;
        value.parse().map_err(|_| LoadError::Parse {
            tag: path.to_string(),
            value: value.to_string(),
        })
    }

    /// Twenty sibling elements `{prefix}_1` .. `{prefix}_20` under `dir`.
    fn coeff_array(&self, dir: &str, prefix: &str) -> Result<[f64; 20]> {
        let mut out = [0.0; 20];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.float(&format!("{}/{}_{}", dir, prefix, i + 1))?;
        }
        Ok(out)
    }

    /// One element holding all 20 coefficients, whitespace-separated.
    fn coeff_list(&self, path: &str) -> Result<[f64; 20]> {
        let text = self.text(path)?;
        let mut out = [0.0; 20];
        let mut count = 0;
        for (i, token) in text.split_whitespace().enumerate() {
            count = i + 1;
            if i < 20 {
                out[i] = token.parse().map_err(|_| LoadError::Parse {
                    tag: path.to_string(),
                    value: token.to_string(),
                })?;
            }
        }
        if count != 20 {
            return Err(LoadError::BadCoefficientCount {
                tag: path.to_string(),
                count,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn coeff_elements(prefix: &str, values: &[f64; 20]) -> String {
        (1..=20)
            .map(|i| format!("<{prefix}_{i}>{}</{prefix}_{i}>", values[i - 1]))
            .collect()
    }

    /// A linear DIMAP document with an exact direct inverse: normalized col
    /// tracks lon, normalized row tracks lat.
    fn dimap_xml() -> String {
        let mut unit = [0.0; 20];
        unit[0] = 1.0;
        let mut y_term = [0.0; 20];
        y_term[1] = 1.0;
        let mut x_term = [0.0; 20];
        x_term[2] = 1.0;

        format!(
            "<Dimap_Document>\
               <Metadata_Identification>\
                 <METADATA_PROFILE>PHR_SENSOR</METADATA_PROFILE>\
               </Metadata_Identification>\
               <Rational_Function_Model><Global_RFM>\
                 <Direct_Model>\
                   {lon_num}{lon_den}{lat_num}{lat_den}\
                   <ERR_BIAS_X>0.5</ERR_BIAS_X>\
                   <ERR_BIAS_Y>0.7</ERR_BIAS_Y>\
                 </Direct_Model>\
                 <Inverse_Model>\
                   {col_num}{col_den}{row_num}{row_den}\
                   <ERR_BIAS_ROW>1.1</ERR_BIAS_ROW>\
                   <ERR_BIAS_COL>1.3</ERR_BIAS_COL>\
                 </Inverse_Model>\
                 <RFM_Validity>\
                   <Direct_Model_Validity_Domain>\
                     <FIRST_ROW>1</FIRST_ROW><FIRST_COL>1</FIRST_COL>\
                     <LAST_ROW>20000</LAST_ROW><LAST_COL>20000</LAST_COL>\
                   </Direct_Model_Validity_Domain>\
                   <Inverse_Model_Validity_Domain>\
                     <FIRST_LON>-73</FIRST_LON><FIRST_LAT>18</FIRST_LAT>\
                     <LAST_LON>-72</LAST_LON><LAST_LAT>19</LAST_LAT>\
                   </Inverse_Model_Validity_Domain>\
                   <LINE_OFF>10001</LINE_OFF><SAMP_OFF>10001</SAMP_OFF>\
                   <LAT_OFF>18.5</LAT_OFF><LONG_OFF>-72.5</LONG_OFF>\
                   <HEIGHT_OFF>500</HEIGHT_OFF>\
                   <LINE_SCALE>10000</LINE_SCALE><SAMP_SCALE>10000</SAMP_SCALE>\
                   <LAT_SCALE>0.5</LAT_SCALE><LONG_SCALE>0.5</LONG_SCALE>\
                   <HEIGHT_SCALE>500</HEIGHT_SCALE>\
                 </RFM_Validity>\
               </Global_RFM></Rational_Function_Model>\
             </Dimap_Document>",
            lon_num = coeff_elements("SAMP_NUM_COEFF", &y_term),
            lon_den = coeff_elements("SAMP_DEN_COEFF", &unit),
            lat_num = coeff_elements("LINE_NUM_COEFF", &x_term),
            lat_den = coeff_elements("LINE_DEN_COEFF", &unit),
            col_num = coeff_elements("SAMP_NUM_COEFF", &y_term),
            col_den = coeff_elements("SAMP_DEN_COEFF", &unit),
            row_num = coeff_elements("LINE_NUM_COEFF", &x_term),
            row_den = coeff_elements("LINE_DEN_COEFF", &unit),
        )
    }

    fn worldview_xml() -> String {
        let y_term = "0 1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let x_term = "0 0 1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let unit = "1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";

        format!(
            "<isd>\
               <IMD>\
                 <IMAGE><SATID>WV02</SATID></IMAGE>\
                 <NUMROWS>20000</NUMROWS>\
                 <NUMCOLUMNS>20000</NUMCOLUMNS>\
               </IMD>\
               <RPB><IMAGE>\
                 <ERRBIAS>2.1</ERRBIAS>\
                 <LINEOFFSET>10000</LINEOFFSET><SAMPOFFSET>10000</SAMPOFFSET>\
                 <LATOFFSET>18.5</LATOFFSET><LONGOFFSET>-72.5</LONGOFFSET>\
                 <HEIGHTOFFSET>500</HEIGHTOFFSET>\
                 <LINESCALE>10000</LINESCALE><SAMPSCALE>10000</SAMPSCALE>\
                 <LATSCALE>0.5</LATSCALE><LONGSCALE>0.5</LONGSCALE>\
                 <HEIGHTSCALE>500</HEIGHTSCALE>\
                 <LINENUMCOEFList><LINENUMCOEF>{x_term}</LINENUMCOEF></LINENUMCOEFList>\
                 <LINEDENCOEFList><LINEDENCOEF>{unit}</LINEDENCOEF></LINEDENCOEFList>\
                 <SAMPNUMCOEFList><SAMPNUMCOEF>{y_term}</SAMPNUMCOEF></SAMPNUMCOEFList>\
                 <SAMPDENCOEFList><SAMPDENCOEF>{unit}</SAMPDENCOEF></SAMPDENCOEFList>\
               </IMAGE></RPB>\
             </isd>"
        )
    }

    #[test]
    fn test_dimap_load() {
        let model = from_str(&dimap_xml()).unwrap();

        assert!(model.has_direct_localization());
        // the 1-based DIMAP pixel offsets are shifted down
        assert_eq!(model.normalization().row_offset, 10000.0);
        assert_eq!(model.normalization().col_offset, 10000.0);
        assert_eq!(model.localization_bias(), Some([0.5, 0.7].as_slice()));
        assert_eq!(model.projection_bias(), Some([1.1, 1.3].as_slice()));

        let domain = model.validity().unwrap();
        assert_eq!(domain.lons, Some((-73.0, -72.0)));
        assert_eq!(domain.lats, Some((18.0, 19.0)));
    }

    #[test]
    fn test_dimap_roundtrip() {
        let model = from_str(&dimap_xml()).unwrap();

        let (lon, lat) = model.localization(20000.0, 8000.0, 90.0).unwrap();
        assert_relative_eq!(lon, -72.0, epsilon = 1e-6);
        assert_relative_eq!(lat, 18.4, epsilon = 1e-6);

        let (col, row) = model.projection(lon, lat, 90.0);
        assert_relative_eq!(col, 20000.0, epsilon = 1e-3);
        assert_relative_eq!(row, 8000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_dimap_missing_coefficient() {
        let xml = dimap_xml().replace(
            "<ERR_BIAS_X>0.5</ERR_BIAS_X>",
            "",
        );

        let err = from_str(&xml).unwrap_err();
        assert!(matches!(err, LoadError::MissingTag(_)));
    }

    #[test]
    fn test_worldview_load() {
        let model = from_str(&worldview_xml()).unwrap();

        assert!(!model.has_direct_localization());
        assert_eq!(model.projection_bias(), Some([2.1].as_slice()));
        assert_eq!(model.validity().unwrap().rows, Some((0.0, 20000.0)));
        assert_eq!(model.validity().unwrap().lons, None);
    }

    #[test]
    fn test_worldview_roundtrip() {
        let model = from_str(&worldview_xml()).unwrap();

        let (lon, lat) = model.localization(20000.0, 8000.0, 90.0).unwrap();
        assert_relative_eq!(lon, -72.0, epsilon = 1e-6);
        assert_relative_eq!(lat, 18.4, epsilon = 1e-6);
    }

    #[test]
    fn test_worldview_short_coefficient_list() {
        let xml = worldview_xml().replace(
            "<LINENUMCOEF>0 0 1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0</LINENUMCOEF>",
            "<LINENUMCOEF>0 0 1</LINENUMCOEF>",
        );

        let err = from_str(&xml).unwrap_err();
        assert!(matches!(err, LoadError::BadCoefficientCount { count: 3, .. }));
    }

    #[test]
    fn test_unsupported_dimap_profile() {
        let xml = dimap_xml().replace("PHR_SENSOR", "K2_SENSOR");

        let err = from_str(&xml).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSensor(s) if s == "K2_SENSOR"));
    }

    #[test]
    fn test_unsupported_satid() {
        let xml = worldview_xml().replace("WV02", "QB02");

        let err = from_str(&xml).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSensor(s) if s == "QB02"));
    }

    #[test]
    fn test_no_discriminant_tag() {
        let err = from_str("<root><child>1</child></root>").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSensor(_)));
    }
}
