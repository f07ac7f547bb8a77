//! Loading of the semicolon-separated reference tables.

mod postal;
mod tables;

pub use postal::{clean_locality_name, PostalCodeIndex};
pub use tables::{load_reference_tables, load_simc, load_terc, load_ulic};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Open a `;`-separated table, transparently decompressing `.gz` files.
pub(crate) fn open_table(path: &Path) -> Result<csv::Reader<Box<dyn Read>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader))
}

/// Header positions of a table, looked up by column name.
pub(crate) struct Columns {
    headers: StringRecord,
}

impl Columns {
    pub(crate) fn read(reader: &mut csv::Reader<Box<dyn Read>>) -> Result<Self> {
        let headers = reader.headers().context("Failed to read header row")?.clone();
        Ok(Self { headers })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
    }

    pub(crate) fn required(&self, name: &str) -> Result<usize> {
        self.position(name)
            .with_context(|| format!("Column '{}' not found", name))
    }

    pub(crate) fn optional(&self, name: &str) -> Option<usize> {
        self.position(name)
    }
}

/// Trimmed cell value; missing cells read as empty.
pub(crate) fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or_default()
}

/// Trimmed cell value, `None` when blank or missing.
pub(crate) fn optional_cell(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.map(|i| cell(record, i)).filter(|s| !s.is_empty())
}
