//! Landmark CSV: `id,x,y,z[,observations]`, keyed by track id.

use std::path::Path;

use csv::{ReaderBuilder, Writer};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::scene::{Landmark, LandmarkMap, TrackId};

const KIND: &str = "landmark";

#[derive(Debug, Deserialize, Serialize)]
struct LandmarkRecord {
    id: u64,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    observations: Option<u32>,
}

/// Read a landmark map from a CSV file.
pub fn read_landmarks(path: &Path) -> Result<LandmarkMap, DecodeError> {
    let csv_err = |source| DecodeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut landmarks = LandmarkMap::new();
    for record in rdr.deserialize::<LandmarkRecord>() {
        let record = record.map_err(csv_err)?;
        let loc = Vector3::new(record.x, record.y, record.z);
        if !loc.iter().all(|v| v.is_finite()) {
            return Err(DecodeError::malformed(
                KIND,
                path,
                format!("landmark {} has a non-finite position", record.id),
            ));
        }
        let id = TrackId::new(record.id);
        if landmarks.contains_key(&id) {
            return Err(DecodeError::malformed(KIND, path, format!("duplicate id {}", record.id)));
        }
        landmarks.insert(
            id,
            Landmark {
                loc,
                observations: record.observations.unwrap_or(0),
            },
        );
    }
    Ok(landmarks)
}

/// Write a landmark map to a CSV file.
pub fn write_landmarks(path: &Path, landmarks: &LandmarkMap) -> Result<(), DecodeError> {
    let csv_err = |source| DecodeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = Writer::from_path(path).map_err(csv_err)?;
    for (id, lm) in landmarks {
        wtr.serialize(LandmarkRecord {
            id: id.0,
            x: lm.loc.x,
            y: lm.loc.y,
            z: lm.loc.z,
            observations: Some(lm.observations),
        })
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|e| DecodeError::io(path, e))
}
