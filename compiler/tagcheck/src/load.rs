use std::path::{Path, PathBuf};

use tagcheck_unit::{InvalidUnit, Unit};

/// Read, deserialize and validate the unit stored at `path`.
#[tracing::instrument(name = "Load unit", skip_all, fields(unit.path = %path.display()))]
pub fn load_unit(path: &Path) -> Result<Unit, LoadUnitError> {
    let contents = fs_err::read_to_string(path).map_err(|source| LoadUnitError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_unit(&contents).map_err(|e| e.at(path))
}

/// Deserialize and validate a unit from its JSON representation.
pub fn parse_unit(contents: &str) -> Result<Unit, LoadUnitError> {
    let deserializer = &mut serde_json::Deserializer::from_str(contents);
    let unit: Unit = serde_path_to_error::deserialize(deserializer)
        .map_err(|source| LoadUnitError::Deserialize { path: None, source })?;
    unit.validate()
        .map_err(|source| LoadUnitError::Invalid { path: None, source })?;
    tracing::debug!(
        package = %unit.package,
        n_types = unit.types.len(),
        n_calls = unit.calls.len(),
        "Unit loaded"
    );
    Ok(unit)
}

#[derive(Debug, thiserror::Error)]
pub enum LoadUnitError {
    #[error("Failed to read the unit at `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid unit: failed to deserialize `{}`", display_path(.path), .source.path())]
    Deserialize {
        path: Option<PathBuf>,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("{} is not a valid unit", display_path(.path))]
    Invalid {
        path: Option<PathBuf>,
        #[source]
        source: InvalidUnit,
    },
}

impl LoadUnitError {
    fn at(self, p: &Path) -> Self {
        match self {
            LoadUnitError::Deserialize { source, .. } => LoadUnitError::Deserialize {
                path: Some(p.to_owned()),
                source,
            },
            LoadUnitError::Invalid { source, .. } => LoadUnitError::Invalid {
                path: Some(p.to_owned()),
                source,
            },
            e @ LoadUnitError::Io { .. } => e,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("`{}`", p.display()),
        None => "The document".to_owned(),
    }
}
