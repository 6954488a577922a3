use bincode::{Decode, Encode};

use crate::geometry::{Geometry, Ring};

pub const PLOT_FILE_MAGIC: [u8; 4] = *b"PMPF";
pub const PLOT_FILE_VERSION: u32 = 1;
const PLOT_HEADER_LEN: usize = PLOT_FILE_MAGIC.len() + std::mem::size_of::<u32>();

#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct PlotFileData {
    pub next_id: u64,
    pub plots: Vec<PlotRecord>,
}

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct PlotRecord {
    pub id: u64,
    pub name: String,
    pub polygons: Vec<Vec<Ring>>,
    pub multi: bool,
    pub area: f64,
    /// Microseconds since the Unix epoch.
    pub created_at_us: i64,
}

impl PlotRecord {
    pub fn geometry(&self) -> Geometry {
        if self.multi {
            Geometry::MultiPolygon {
                coordinates: self.polygons.clone(),
            }
        } else {
            Geometry::Polygon {
                coordinates: self.polygons.first().cloned().unwrap_or_default(),
            }
        }
    }
}

/// Splits a geometry into the record layout: polygons plus a multi flag.
pub fn geometry_parts(geometry: &Geometry) -> (Vec<Vec<Ring>>, bool) {
    let polygons = geometry
        .polygons()
        .into_iter()
        .map(|polygon| polygon.to_vec())
        .collect();
    (polygons, matches!(geometry, Geometry::MultiPolygon { .. }))
}

#[derive(Debug, thiserror::Error)]
pub enum PlotFileError {
    #[error("unsupported plot file version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid plot file data")]
    InvalidData,
    #[error("failed to encode plot file: {0}")]
    Encode(String),
}

pub fn encode_plot_file(data: &PlotFileData) -> Result<Vec<u8>, PlotFileError> {
    let body = bincode::encode_to_vec(data, bincode::config::standard())
        .map_err(|error| PlotFileError::Encode(error.to_string()))?;
    let mut payload = Vec::with_capacity(PLOT_HEADER_LEN + body.len());
    payload.extend_from_slice(&PLOT_FILE_MAGIC);
    payload.extend_from_slice(&PLOT_FILE_VERSION.to_le_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_plot_file(payload: &[u8]) -> Result<PlotFileData, PlotFileError> {
    if !(payload.len() >= PLOT_HEADER_LEN && payload.starts_with(&PLOT_FILE_MAGIC)) {
        return Err(PlotFileError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[PLOT_FILE_MAGIC.len()..PLOT_HEADER_LEN]
            .try_into()
            .map_err(|_| PlotFileError::InvalidData)?,
    );
    let body = &payload[PLOT_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|_| PlotFileError::InvalidData),
        _ => Err(PlotFileError::UnsupportedVersion(version)),
    }
}
