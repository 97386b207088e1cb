pub mod csv;

use clustering::model::{FeatureVector, Record};

pub struct Row<'a> {
    pub id: u64,
    pub data: &'a FeatureVector,
}

pub trait Input {
    // Return true if there are more rows to read
    fn has_next(&self) -> bool;

    // Return the next row of data
    fn next(&mut self) -> Row;

    // Reset the state of the input to the beginning
    // This is helpful when we want to do multiple passes over the same input
    fn reset(&mut self);

    // Return the number of rows in the input
    fn num_rows(&self) -> usize;
}

/// Drain `input` into unlabelled records, in row order.
pub fn read_records(input: &mut impl Input) -> Vec<Record> {
    let mut records = Vec::with_capacity(input.num_rows());
    while input.has_next() {
        let row = input.next();
        records.push(Record::new(row.data.clone()));
    }
    records
}
