use std::path::{Path, PathBuf};

use ahash::{HashMap, HashMapExt};
use tagcheck_unit::Unit;
use tracing_log_error::log_error;

/// Retrieve the source files that diagnostics point into.
///
/// Contents embedded in the unit win. Otherwise the file is read from disk:
/// absolute paths are used as-is, relative paths are resolved against the source root
/// (or the current directory, if there is no source root).
///
/// Each file is read at most once.
pub struct SourceCache<'u> {
    unit: &'u Unit,
    root: Option<PathBuf>,
    on_disk: HashMap<String, Option<String>>,
}

impl<'u> SourceCache<'u> {
    pub fn new(unit: &'u Unit, root: Option<&Path>) -> Self {
        Self {
            unit,
            root: root.map(Path::to_path_buf),
            on_disk: HashMap::new(),
        }
    }

    /// The contents of `file`, if they can be retrieved.
    pub fn contents(&mut self, file: &str) -> Option<&str> {
        let unit: &'u Unit = self.unit;
        if let Some(contents) = unit.file_contents(file) {
            return Some(contents);
        }
        if !self.on_disk.contains_key(file) {
            let contents = read_source_file(&self.resolve(file));
            self.on_disk.insert(file.to_owned(), contents);
        }
        self.on_disk.get(file).and_then(|c| c.as_deref())
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn read_source_file(path: &Path) -> Option<String> {
    match fs_err::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            log_error!(
                e,
                level: tracing::Level::WARN,
                "Failed to read a source file. Diagnostics pointing into it won't include a code snippet"
            );
            None
        }
    }
}
