use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Result as IoResult, Write};
use std::path::PathBuf;

use crate::registry::FieldRegistry;

/// What a call to `parse_buffer` did with the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// `<start>`: the current row was cleared.
    RowStarted,
    /// `<complete>`: the current row was appended to the log.
    RowFlushed,
    /// A well-formed `field=value` token was recorded.
    FieldRecorded { new_field: bool },
    /// Malformed token, dropped without touching registry or row.
    Ignored,
}

/// Extracts `<field=value>` tokens into rows of a tab-separated log file.
///
/// Holds the field registry and the row being accumulated between a
/// `<start>` and the next `<complete>`. The log header is written once, at
/// file creation, from the registry as it stands at that moment; fields
/// discovered later widen subsequent rows but the header is never rewritten.
/// Whether that staleness should instead rewrite the file is an open
/// question; for now the log matches what the device sent, header included.
pub struct FieldExtractor {
    registry: FieldRegistry,
    row: HashMap<String, String>,
    log_path: PathBuf,
}

impl FieldExtractor {
    /// Creates an extractor logging to `log_path`, loading any previously
    /// persisted field names from `registry_path`.
    pub fn new(registry_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> IoResult<Self> {
        Ok(FieldExtractor {
            registry: FieldRegistry::load(registry_path)?,
            row: HashMap::new(),
            log_path: log_path.into(),
        })
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Handles one complete token (everything from `<` through `>`).
    ///
    /// `<start>` clears the row. `<complete>` appends the row to the log but
    /// does not clear it, so without an intervening `<start>` stale values
    /// carry over into the next row. Any other token must be of the form
    /// `<field=value>` with exactly one `=` and both parts non-empty;
    /// everything else is dropped silently.
    pub fn parse_buffer(&mut self, buffer: &str) -> IoResult<ParseOutcome> {
        if buffer == "<start>" {
            self.row.clear();
            return Ok(ParseOutcome::RowStarted);
        }
        if buffer == "<complete>" {
            self.append_row()?;
            return Ok(ParseOutcome::RowFlushed);
        }
        if !buffer.starts_with('<') || !buffer.ends_with('>') || buffer.len() < 2 {
            return Ok(ParseOutcome::Ignored);
        }

        let inner = &buffer[1..buffer.len() - 1];
        let mut parts = inner.split('=');
        let (field, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(field), Some(value), None) if !field.is_empty() && !value.is_empty() => {
                (field, value)
            }
            _ => return Ok(ParseOutcome::Ignored),
        };

        let new_field = self.registry.record(field)?;
        self.row.insert(field.to_string(), value.to_string());
        Ok(ParseOutcome::FieldRecorded { new_field })
    }

    /// Appends the current row to the log, one column per registered field
    /// in discovery order, empty string where the row has no value. Creates
    /// the file with a header line on first write.
    fn append_row(&self) -> IoResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", self.registry.header_line())?;
        }
        let columns: Vec<&str> = self
            .registry
            .iter()
            .map(|name| self.row.get(name).map(String::as_str).unwrap_or(""))
            .collect();
        writeln!(file, "{}", columns.join("\t"))?;
        Ok(())
    }
}
