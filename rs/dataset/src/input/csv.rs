use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clustering::model::FeatureVector;
use csv::{ReaderBuilder, Trim};
use log::info;

use super::{Input, Row};
use crate::schema::{missing_columns, SongRow};

/// Header-driven reader for the song schema.
///
/// The whole file is parsed up front, so every error (a missing column, a malformed cell)
/// surfaces before clustering starts.
pub struct CsvReader {
    rows: Vec<FeatureVector>,
    row_idx: usize,
}

impl CsvReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = Self::from_reader(file)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        info!("Loaded {} rows from {}", reader.num_rows(), path.display());
        Ok(reader)
    }

    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

        let headers = reader.headers().context("Failed to read header row")?;
        let missing = missing_columns(headers.iter());
        if !missing.is_empty() {
            return Err(anyhow!("Missing required columns: {}", missing.join(", ")));
        }

        let mut rows = vec![];
        for (idx, result) in reader.deserialize::<SongRow>().enumerate() {
            // Row 1 is the header.
            let features = result
                .map_err(anyhow::Error::from)
                .and_then(|row| row.to_features())
                .with_context(|| format!("Malformed data on row {}", idx + 2))?;
            rows.push(features);
        }
        Ok(Self { rows, row_idx: 0 })
    }
}

impl Input for CsvReader {
    fn has_next(&self) -> bool {
        self.row_idx < self.rows.len()
    }

    // Caller is responsible for checking has_next first
    fn next(&mut self) -> Row<'_> {
        let idx = self.row_idx;
        self.row_idx += 1;
        Row {
            id: idx as u64,
            data: &self.rows[idx],
        }
    }

    fn reset(&mut self) {
        self.row_idx = 0;
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }
}
