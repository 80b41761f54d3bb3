use crate::error::{ConvertError, Result};
use crate::format::FormatSpec;
use crate::sequence::Table;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes formatted rows, one per line, to any `Write`
pub struct RowWriter<'a, W: Write> {
    writer: W,
    spec: &'a FormatSpec,
    delimiter: &'a str,
}

impl<'a, W: Write> RowWriter<'a, W> {
    pub fn new(writer: W, spec: &'a FormatSpec, delimiter: &'a str) -> Self {
        RowWriter {
            writer,
            spec,
            delimiter,
        }
    }

    /// Format and write every row of `table`; returns the number of lines
    pub fn write_table(&mut self, table: &Table) -> Result<usize> {
        for (index, row) in table.rows().iter().enumerate() {
            let line = self.spec.render_row(row, self.delimiter).map_err(|e| match e {
                ConvertError::Format(msg) => {
                    ConvertError::format(format!("line {}: {}", index + 1, msg))
                }
                other => other,
            })?;
            writeln!(self.writer, "{}", line)
                .map_err(|e| ConvertError::file("write", "output", e))?;
        }
        Ok(table.len())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render the whole table to text before anything touches the disk
pub fn render(table: &Table, spec: &FormatSpec, delimiter: &str) -> Result<Vec<u8>> {
    let mut writer = RowWriter::new(Vec::new(), spec, delimiter);
    writer.write_table(table)?;
    Ok(writer.into_inner())
}

/// Replace `path` with `contents`.
///
/// The bytes go to a temporary file next to the target which is then
/// renamed over it, so the target is either untouched or complete.
pub fn commit<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConvertError::file("create", path, e))?;
    debug!(tmp = %tmp.path().display(), "staging output");

    tmp.write_all(contents)
        .and_then(|_| tmp.flush())
        .map_err(|e| ConvertError::file("write", path, e))?;
    set_output_permissions(&tmp, path).map_err(|e| ConvertError::file("write", path, e))?;

    tmp.persist(path)
        .map_err(|e| ConvertError::file("replace", path, e.error))?;
    info!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

/// Temporary files are created owner-only; give the result the permissions
/// of the file it replaces, or the usual 0644 for a new file.
fn set_output_permissions(tmp: &NamedTempFile, target: &Path) -> std::io::Result<()> {
    let permissions = match std::fs::metadata(target) {
        Ok(meta) => meta.permissions(),
        Err(_) => default_permissions(tmp)?,
    };
    tmp.as_file().set_permissions(permissions)
}

#[cfg(unix)]
fn default_permissions(_tmp: &NamedTempFile) -> std::io::Result<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(tmp: &NamedTempFile) -> std::io::Result<std::fs::Permissions> {
    Ok(tmp.as_file().metadata()?.permissions())
}
