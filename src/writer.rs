//! CSV output.
//!
//! Records are written without a header row, with minimal quoting and CRLF
//! line endings.
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::transform::Record;

fn builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::CRLF);
    builder
}

/// Write `records` to any sink
pub fn write_to<W: io::Write>(records: &[Record], sink: W) -> io::Result<()> {
    let mut writer = builder().from_writer(sink);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()
}

/// Create or truncate `path`, write `records`, and return the file size
pub fn write_records(records: &[Record], path: &Path) -> Result<u64> {
    let access = |source: io::Error| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::create(path).map_err(access)?;
    write_to(records, io::BufWriter::new(file)).map_err(access)?;

    Ok(std::fs::metadata(path).map_err(access)?.len())
}
