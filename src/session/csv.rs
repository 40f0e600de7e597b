//! Flat CSV encoding of a session: one header row, then one row per snapshot
//! in collection order.
//!
//! Floats use Rust's shortest round-trip formatting and timestamps keep
//! microseconds, so reading a file back reproduces the values that were
//! written.

use std::io::{self, BufRead, Write};

use chrono::NaiveDateTime;

use crate::system::snapshot::Snapshot;

pub const HEADER: [&str; 9] = [
    "timestamp",
    "total_system_cpu_percent",
    "total_system_memory_percent",
    "network_bytes_sent",
    "network_bytes_recv",
    "app_A_cpu_percent",
    "app_A_memory_percent",
    "app_B_cpu_percent",
    "app_B_memory_percent",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("file is empty, expected a header row")]
    MissingHeader,
    #[error("unexpected header: {0}")]
    UnexpectedHeader(String),
    #[error("line {line}: expected {expected} fields, found {found}", expected = HEADER.len())]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: bad timestamp {value:?}: {source}")]
    Timestamp {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("line {line}: bad value {value:?} in column {column}")]
    Number {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HEADER.join(","))
}

pub fn write_row<W: Write>(out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{}",
        snapshot.timestamp.format(TIMESTAMP_FORMAT),
        snapshot.system_cpu_percent,
        snapshot.system_memory_percent,
        snapshot.network_bytes_sent,
        snapshot.network_bytes_recv,
        snapshot.app_a_cpu_percent,
        snapshot.app_a_memory_percent,
        snapshot.app_b_cpu_percent,
        snapshot.app_b_memory_percent,
    )
}

pub fn write_rows<W: Write>(out: &mut W, snapshots: &[Snapshot]) -> io::Result<()> {
    write_header(out)?;
    for snapshot in snapshots {
        write_row(out, snapshot)?;
    }
    Ok(())
}

pub fn read_rows<R: BufRead>(input: R) -> Result<Vec<Snapshot>, CsvError> {
    let mut lines = input.lines();
    let header = lines.next().ok_or(CsvError::MissingHeader)??;
    if header.trim_end() != HEADER.join(",") {
        return Err(CsvError::UnexpectedHeader(header));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1.
        rows.push(parse_row(idx + 2, line.trim_end())?);
    }
    Ok(rows)
}

fn parse_row(line: usize, raw: &str) -> Result<Snapshot, CsvError> {
    let fields: Vec<&str> = raw.split(',').collect();
    if fields.len() != HEADER.len() {
        return Err(CsvError::FieldCount {
            line,
            found: fields.len(),
        });
    }

    let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT).map_err(|source| {
        CsvError::Timestamp {
            line,
            value: fields[0].to_string(),
            source,
        }
    })?;
    let float = |col: usize| -> Result<f64, CsvError> { parse_field(line, col, fields[col]) };
    let count = |col: usize| -> Result<u64, CsvError> { parse_field(line, col, fields[col]) };

    Ok(Snapshot {
        timestamp,
        system_cpu_percent: float(1)?,
        system_memory_percent: float(2)?,
        network_bytes_sent: count(3)?,
        network_bytes_recv: count(4)?,
        app_a_cpu_percent: float(5)?,
        app_a_memory_percent: float(6)?,
        app_b_cpu_percent: float(7)?,
        app_b_memory_percent: float(8)?,
    })
}

fn parse_field<T: std::str::FromStr>(line: usize, col: usize, value: &str) -> Result<T, CsvError> {
    value.trim().parse().map_err(|_| CsvError::Number {
        line,
        column: HEADER[col],
        value: value.to_string(),
    })
}
