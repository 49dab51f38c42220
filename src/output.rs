//! Rendering of query and forecast results.
//!
//! Rows go out as pretty JSON or as CSV with a header line, to any writer.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

/// Writes a value as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes rows as CSV with a header line. Nothing is written for no rows.
pub fn write_csv<W: Write, T: Serialize>(out: W, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::{CommuneStats, TypeSplit};

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        write_json(
            &mut buf,
            &TypeSplit {
                total_mech: 2,
                total_ebike: 4,
            },
        )
        .unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["total_mech"], 2);
        assert_eq!(parsed["total_ebike"], 4);
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[commune("Paris", 14), commune("Clichy", 3)]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "commune,avg_bikes,sum_bikes");
        assert_eq!(lines.len(), 3);
    }

    fn commune(name: &str, sum: u64) -> CommuneStats {
        CommuneStats {
            commune: name.to_string(),
            avg_bikes: sum as f64 / 2.0,
            sum_bikes: sum,
        }
    }
}
