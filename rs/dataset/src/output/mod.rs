pub mod csv;

use anyhow::Result;
use clustering::model::Record;

pub trait Output {
    // Append one labelled record
    fn write(&mut self, record: &Record) -> Result<()>;

    // Flush everything written so far to the underlying sink
    fn flush(&mut self) -> Result<()>;
}

/// Write every record in order, then flush.
pub fn write_records(output: &mut impl Output, records: &[Record]) -> Result<()> {
    for record in records {
        output.write(record)?;
    }
    output.flush()
}
