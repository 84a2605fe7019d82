use crate::catalog::PresetId;
use std::path::PathBuf;

/// Failure kinds of catalog and preset lifecycle operations.
///
/// Whenever an operation returns one of these, the catalog, the current
/// preset path and the current preset id are exactly as they were before
/// the call.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// A blank name, path or id was given where a value is required.
    #[error("Empty input where a value is required")]
    EmptyInput,
    #[error("Preset with id {0} does not exist in the catalog")]
    NotFound(PresetId),
    #[error("Preset file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("Preset file is not in the catalog: {0}")]
    NotCatalogued(PathBuf),
    /// `next()` was asked to step from no current preset.
    #[error("No current preset to step from")]
    NoSelection,
    /// A preset name that would escape the preset root.
    #[error("Invalid preset name: {0:?}")]
    InvalidName(String),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid preset root: {0}")]
    InvalidRoot(PathBuf),
    #[error("Invalid preset snapshot: {0}")]
    Snapshot(String),
}

impl PresetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PresetError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the kinds the caller should surface as a diagnostic rather
    /// than silently ignore.
    pub fn is_diagnostic(&self) -> bool {
        !matches!(self, PresetError::EmptyInput)
    }
}
