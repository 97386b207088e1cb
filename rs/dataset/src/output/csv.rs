use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clustering::model::Record;
use csv::Writer;

use super::Output;
use crate::schema::LabelledSongRow;

/// Writes the song schema plus a trailing `clusterId` column. The header is emitted with the
/// first record.
pub struct CsvWriter<W: Write> {
    writer: Writer<W>,
    num_written: usize,
}

impl CsvWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: Writer::from_writer(sink),
            num_written: 0,
        }
    }

    pub fn num_written(&self) -> usize {
        self.num_written
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

impl<W: Write> Output for CsvWriter<W> {
    fn write(&mut self, record: &Record) -> Result<()> {
        let row = LabelledSongRow::try_from(record)?;
        self.writer
            .serialize(row)
            .with_context(|| format!("Failed to write row {}", self.num_written))?;
        self.num_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV output")
    }
}
