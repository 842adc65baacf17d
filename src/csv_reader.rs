use std::io::Read;

use anyhow::{Context, Result};

use crate::data::{rows_from_csv, Row};

/// Read CSV rows from stdin. The first record is the header row.
pub fn read_rows_from_stdin() -> Result<Vec<Row>> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    read_rows(input.as_bytes())
}

pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result.context("Failed to read CSV record")?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows_from_csv(&headers, &records))
}
