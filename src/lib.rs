//! # json2txt - JSON sidecar attribute extraction
//!
//! Pulls one top-level attribute out of a JSON metadata file (for example
//! the `SliceTiming` array of a BIDS sidecar) and writes it to a plain text
//! file, one printf-formatted value per line.
//!
//! ## Modules
//!
//! - **document**: load the JSON file and look up a top-level key
//! - **sequence**: normalize the value into rows of typed cells
//! - **format**: printf-style format specs
//! - **writer**: render rows and replace the output file atomically
//!
//! ## Quick Start
//!
//! ```rust
//! use json2txt::{FormatSpec, Table, writer};
//! use serde_json::json;
//!
//! # fn main() -> json2txt::Result<()> {
//! let table = Table::from_value(json!([0.0, 0.05, 0.10]))?;
//! let spec = FormatSpec::parse("%.8f")?;
//! let text = writer::render(&table, &spec, " ")?;
//!
//! assert_eq!(text, b"0.00000000\n0.05000000\n0.10000000\n");
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use tracing::debug;

pub mod document;
pub mod error;
pub mod format;
pub mod sequence;
pub mod writer;

pub use document::Document;
pub use error::{ConvertError, Result};
pub use format::FormatSpec;
pub use sequence::{Cell, Table};

/// Everything one conversion needs
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// JSON file to read
    pub input: PathBuf,

    /// Text file to create or overwrite
    pub output: PathBuf,

    /// Top-level key to extract
    pub key: String,

    /// printf-style spec applied to every element
    pub format: String,

    /// Separator between cells of a multi-column row
    pub delimiter: String,
}

impl ConvertConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        key: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        ConvertConfig {
            input: input.into(),
            output: output.into(),
            key: key.into(),
            format: format.into(),
            delimiter: String::from(" "),
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

/// Main entry point: load, extract, normalize, format and write.
///
/// Returns the number of lines written. The output file is only touched
/// once every line has been rendered.
pub fn convert(config: &ConvertConfig) -> Result<usize> {
    if same_file(&config.input, &config.output) {
        return Err(ConvertError::Usage(format!(
            "output path {} would overwrite the input",
            config.output.display()
        )));
    }
    let spec = FormatSpec::parse(&config.format)?;

    let value = Document::load(&config.input)?.take(&config.key)?;
    let table = Table::from_value(value)?;
    debug!(rows = table.len(), width = table.width(), "normalized value");

    let text = writer::render(&table, &spec, &config.delimiter)?;
    writer::commit(&config.output, &text)?;

    Ok(table.len())
}

/// Equal paths, or two existing paths that resolve to the same file
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
