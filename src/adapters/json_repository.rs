//! JSON implementation of the table repository.
//!
//! Writes the wrapped blob format shared with external collaborators and
//! reads both the wrapped and the legacy bare-map shape.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{Result, error::Error, ports::TableRepository, q_learning::PersistedTable};

/// Write `bytes` to `path` through a sibling temporary file and a rename
///
/// Readers never see a partially written blob. Missing parent directories
/// are created.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            operation: format!("create directory {parent:?}"),
            source,
        })?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).map_err(|source| Error::Io {
        operation: format!("create file {tmp_path:?}"),
        source,
    })?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|source| Error::Io {
            operation: format!("write file {tmp_path:?}"),
            source,
        })?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| Error::Io {
        operation: format!("move {tmp_path:?} to {path:?}"),
        source,
    })
}

/// Read a stored blob; a missing file is [`Error::NotFound`]
pub(crate) fn read_blob(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            location: path.display().to_string(),
        },
        _ => Error::Io {
            operation: format!("read file {path:?}"),
            source,
        },
    })
}

/// JSON-based table repository.
///
/// # Examples
///
/// ```no_run
/// use skirmish::adapters::JsonFileRepository;
/// use skirmish::ports::TableRepository;
/// use std::path::Path;
///
/// let repo = JsonFileRepository::pretty();
/// if let Some(table) = repo.load_or_empty(Path::new("qtable.json")) {
///     println!("loaded version {}", table.version);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileRepository {
    pretty: bool,
}

impl JsonFileRepository {
    /// Create a repository writing compact JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository writing indented JSON.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl TableRepository for JsonFileRepository {
    fn save(&self, table: &PersistedTable, path: &Path) -> Result<()> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(table)?
        } else {
            table.to_json_vec()?
        };
        write_atomically(path, &bytes)
    }

    fn load(&self, path: &Path) -> Result<PersistedTable> {
        PersistedTable::from_json_slice(&read_blob(path)?)
    }
}
