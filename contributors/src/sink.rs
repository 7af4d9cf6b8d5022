use crate::api::Result;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OpenMode {
    Creating,
    Overwriting,
    Appending,
}

/// Output CSV file, written line by line.
///
/// Rows are opaque: producers quote their fields and strip line breaks.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    mode: OpenMode,
    no_header: bool,
    header_written: bool,
}

impl CsvSink {
    /// Creates, overwrites, or opens for append the output file.
    ///
    /// Appending to an existing file never adds a header.
    pub fn open(path: impl AsRef<Path>, append: bool, no_header: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, mode, no_header) = match (path.is_file(), append) {
            (true, true) => (OpenOptions::new().append(true).open(&path)?, OpenMode::Appending, true),
            (true, false) => (File::create(&path)?, OpenMode::Overwriting, no_header),
            (false, _) => (File::create(&path)?, OpenMode::Creating, no_header),
        };
        debug!(
            "Writing data to \"{}\" ({} {} header)",
            path.display(),
            mode,
            if no_header { "without" } else { "with" }
        );
        Ok(CsvSink {
            path,
            writer: BufWriter::new(file),
            mode,
            no_header,
            header_written: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Writes `rows`, preceded by `header` on the first call unless headers are suppressed.
    pub fn write_rows<I, S>(&mut self, header: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.no_header && !self.header_written {
            writeln!(self.writer, "{}", header)?;
            self.header_written = true;
        }
        for row in rows {
            writeln!(self.writer, "{}", row.as_ref())?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
