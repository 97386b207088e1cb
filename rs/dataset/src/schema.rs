use anyhow::{anyhow, Result};
use clustering::model::{FeatureVector, Record};
use serde::{Deserialize, Serialize};

/// Feature columns in vector order. `duration` is also accepted as `duration_ms`.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "acousticness",
    "danceability",
    "energy",
    "instrumentalness",
    "valence",
    "tempo",
    "liveness",
    "loudness",
    "speechiness",
    "duration",
    "popularity",
    "year",
    "key",
];

pub const DURATION_ALIAS: &str = "duration_ms";

pub const CLUSTER_ID_COLUMN: &str = "clusterId";

pub const DIMENSION: usize = FEATURE_COLUMNS.len();

/// One input row. Columns are matched by header name; unknown columns are ignored.
///
/// Duration may arrive as `duration_ms`, `duration` or both. `duration_ms` wins when both
/// are present and non-empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongRow {
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub duration_ms: Option<i64>,
    pub duration: Option<i64>,
    pub popularity: i64,
    pub year: i64,
    pub key: i64,
}

impl SongRow {
    pub fn duration(&self) -> Result<i64> {
        self.duration_ms
            .or(self.duration)
            .ok_or_else(|| anyhow!("No value in {} or duration", DURATION_ALIAS))
    }

    pub fn to_features(&self) -> Result<FeatureVector> {
        Ok(FeatureVector::new(vec![
            self.acousticness,
            self.danceability,
            self.energy,
            self.instrumentalness,
            self.valence,
            self.tempo,
            self.liveness,
            self.loudness,
            self.speechiness,
            self.duration()? as f64,
            self.popularity as f64,
            self.year as f64,
            self.key as f64,
        ]))
    }
}

/// One output row: the input schema plus the assigned cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledSongRow {
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub duration: i64,
    pub popularity: i64,
    pub year: i64,
    pub key: i64,
    #[serde(rename = "clusterId")]
    pub cluster_id: Option<usize>,
}

impl TryFrom<&Record> for LabelledSongRow {
    type Error = anyhow::Error;

    fn try_from(record: &Record) -> Result<Self> {
        let v = record.features.values();
        if v.len() != DIMENSION {
            return Err(anyhow!(
                "Record has {} features, the song schema has {}",
                v.len(),
                DIMENSION
            ));
        }
        Ok(Self {
            acousticness: v[0],
            danceability: v[1],
            energy: v[2],
            instrumentalness: v[3],
            valence: v[4],
            tempo: v[5],
            liveness: v[6],
            loudness: v[7],
            speechiness: v[8],
            duration: v[9].round() as i64,
            popularity: v[10].round() as i64,
            year: v[11].round() as i64,
            key: v[12].round() as i64,
            cluster_id: record.cluster_id,
        })
    }
}

/// Names of required columns absent from `headers`.
pub fn missing_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let present: Vec<&str> = headers.into_iter().collect();
    FEATURE_COLUMNS
        .iter()
        .copied()
        .filter(|&column| {
            let found = present.contains(&column)
                || (column == "duration" && present.contains(&DURATION_ALIAS));
            !found
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SongRow {
        SongRow {
            acousticness: 0.1,
            danceability: 0.2,
            energy: 0.3,
            instrumentalness: 0.4,
            valence: 0.5,
            tempo: 120.5,
            liveness: 0.6,
            loudness: -5.25,
            speechiness: 0.7,
            duration_ms: Some(215000),
            duration: None,
            popularity: 64,
            year: 1999,
            key: 7,
        }
    }

    #[test]
    fn test_features_follow_column_order() {
        let features = row().to_features().unwrap();
        assert_eq!(features.dimension(), DIMENSION);
        assert_eq!(
            features.values(),
            &[0.1, 0.2, 0.3, 0.4, 0.5, 120.5, 0.6, -5.25, 0.7, 215000.0, 64.0, 1999.0, 7.0]
        );
    }

    #[test]
    fn test_duration_prefers_duration_ms() {
        let both = SongRow {
            duration: Some(1000),
            ..row()
        };
        assert_eq!(both.duration().unwrap(), 215000);

        let plain = SongRow {
            duration_ms: None,
            duration: Some(1000),
            ..row()
        };
        assert_eq!(plain.duration().unwrap(), 1000);

        let neither = SongRow {
            duration_ms: None,
            ..row()
        };
        assert!(neither.duration().is_err());
        assert!(neither.to_features().is_err());
    }

    #[test]
    fn test_labelled_row_from_record() {
        let mut record = Record::new(row().to_features().unwrap());
        record.cluster_id = Some(2);
        let labelled = LabelledSongRow::try_from(&record).unwrap();
        assert_eq!(labelled.duration, 215000);
        assert_eq!(labelled.year, 1999);
        assert_eq!(labelled.loudness, -5.25);
        assert_eq!(labelled.cluster_id, Some(2));

        let short = Record::new(FeatureVector::new(vec![1.0, 2.0]));
        assert!(LabelledSongRow::try_from(&short).is_err());
    }

    #[test]
    fn test_missing_columns() {
        let all: Vec<&str> = FEATURE_COLUMNS.to_vec();
        assert!(missing_columns(all.iter().copied()).is_empty());

        let with_alias: Vec<&str> = FEATURE_COLUMNS
            .iter()
            .map(|&c| if c == "duration" { DURATION_ALIAS } else { c })
            .collect();
        assert!(missing_columns(with_alias.iter().copied()).is_empty());

        let partial = ["acousticness", "energy", "name"];
        let missing = missing_columns(partial.iter().copied());
        assert_eq!(missing.len(), 11);
        assert!(missing.contains(&"duration"));
        assert!(!missing.contains(&"energy"));
    }
}
