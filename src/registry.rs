use indexmap::IndexSet;
use std::fs;
use std::io::{Result as IoResult, Write};
use std::path::PathBuf;

/// Ordered set of field names discovered so far.
///
/// Insertion order is discovery order and becomes the column order of the
/// output log. The set is backed by a plain text file, one name per line,
/// which is rewritten in full every time a new name is recorded.
#[derive(Debug)]
pub struct FieldRegistry {
    names: IndexSet<String>,
    path: PathBuf,
}

impl FieldRegistry {
    /// Loads the registry from `path`, or starts empty if the file does not
    /// exist yet.
    pub fn load(path: impl Into<PathBuf>) -> IoResult<Self> {
        let path = path.into();
        let mut names = IndexSet::new();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            for line in content.lines() {
                let name = line.trim();
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(FieldRegistry { names, path })
    }

    /// Records a field name. Returns true (after persisting the whole
    /// registry) if the name was new, false if it was already known.
    pub fn record(&mut self, name: &str) -> IoResult<bool> {
        if self.names.contains(name) {
            return Ok(false);
        }
        self.names.insert(name.to_string());
        self.persist()?;
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Tab-separated header line matching the current column order.
    pub fn header_line(&self) -> String {
        self.names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\t")
    }

    fn persist(&self) -> IoResult<()> {
        let mut file = fs::File::create(&self.path)?;
        for name in &self.names {
            writeln!(file, "{}", name)?;
        }
        Ok(())
    }
}
