use crate::error::CliError;
use model::records::row::RowData;
use std::io::Write;

/// Writes `row` as a single-line JSON object.
pub fn write_record(out: &mut impl Write, row: &RowData) -> Result<(), CliError> {
    let line = serde_json::to_string(&row.to_json())?;
    writeln!(out, "{line}")?;
    Ok(())
}
