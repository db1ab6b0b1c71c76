//! Feature track CSV: one observation per row.
//!
//! ```text
//! track_id,frame_id,x,y
//! 0,0,101.5,220.0
//! 0,1,,
//! ```
//!
//! Empty `x`/`y` record an observation without a feature location.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::scene::{Feature, FrameId, Track, TrackId, TrackSet, TrackState};

const KIND: &str = "track";

#[derive(Debug, Deserialize, Serialize)]
struct TrackRecord {
    track_id: u64,
    frame_id: usize,
    x: Option<f64>,
    y: Option<f64>,
}

/// Read a track set from a CSV file.
pub fn read_tracks(path: &Path) -> Result<TrackSet, DecodeError> {
    let csv_err = |source| DecodeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut tracks: BTreeMap<TrackId, Track> = BTreeMap::new();
    for (line, record) in rdr.deserialize::<TrackRecord>().enumerate() {
        let record = record.map_err(csv_err)?;
        let state = match (record.x, record.y) {
            (Some(x), Some(y)) => TrackState::Feature(Feature::new(x, y)),
            (None, None) => TrackState::Bare,
            _ => {
                return Err(DecodeError::malformed(
                    KIND,
                    path,
                    format!("row {}: only one of x/y given", line + 1),
                ));
            }
        };
        let id = TrackId::new(record.track_id);
        tracks
            .entry(id)
            .or_insert_with(|| Track::new(id))
            .insert(FrameId::new(record.frame_id), state);
    }

    Ok(tracks.into_values().collect())
}

/// Write a track set to a CSV file, one row per track state.
pub fn write_tracks(path: &Path, tracks: &TrackSet) -> Result<(), DecodeError> {
    let csv_err = |source| DecodeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = Writer::from_path(path).map_err(csv_err)?;
    for track in tracks.iter() {
        for (frame, state) in track.states() {
            let loc = state.feature().map(|f| f.loc);
            wtr.serialize(TrackRecord {
                track_id: track.id.0,
                frame_id: frame.index(),
                x: loc.map(|l| l.x),
                y: loc.map(|l| l.y),
            })
            .map_err(csv_err)?;
        }
    }
    wtr.flush().map_err(|e| DecodeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_groups_rows_by_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "track_id,frame_id,x,y\n\
             # comment\n\
             3,0,10.0,20.0\n\
             1,0,1.0,2.0\n\
             3,2,,\n\
             3,1,11.0,21.0\n",
        )
        .unwrap();

        let tracks = read_tracks(&path).unwrap();
        assert_eq!(tracks.len(), 2);

        let t3 = tracks.get(TrackId::new(3)).unwrap();
        assert_eq!(t3.len(), 3);
        assert_eq!(t3.first_frame(), Some(FrameId::new(0)));
        assert_eq!(t3.last_frame(), Some(FrameId::new(2)));
        assert!(matches!(t3.find(FrameId::new(2)), Some(TrackState::Bare)));
        let f = t3.find(FrameId::new(1)).and_then(|s| s.feature()).unwrap();
        assert_eq!((f.loc.x, f.loc.y), (11.0, 21.0));
    }

    #[test]
    fn test_half_feature_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(&path, "track_id,frame_id,x,y\n0,0,1.0,\n").unwrap();
        assert!(matches!(
            read_tracks(&path),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_bad_number_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(&path, "track_id,frame_id,x,y\nzero,0,1.0,2.0\n").unwrap();
        assert!(matches!(read_tracks(&path), Err(DecodeError::Csv { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut bare = Track::new(TrackId::new(9));
        bare.insert(FrameId::new(4), TrackState::Bare);
        let tracks: TrackSet = [
            Track::new(TrackId::new(2))
                .with_feature(FrameId::new(0), 5.0, 6.0)
                .with_feature(FrameId::new(1), 7.0, 8.0),
            bare,
        ]
        .into_iter()
        .collect();

        write_tracks(&path, &tracks).unwrap();
        let loaded = read_tracks(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(TrackId::new(2)).unwrap().len(), 2);
        assert!(matches!(
            loaded.get(TrackId::new(9)).unwrap().find(FrameId::new(4)),
            Some(TrackState::Bare)
        ));
    }
}
