use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One immediate child of a directory as seen by a catalog scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl DirEntryInfo {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// File-system operations the preset engine needs.
///
/// The catalog builder and the preset manager only ever touch the disk
/// through this trait, so a host can route storage elsewhere.
pub trait PresetStorage {
    /// Create the directory and any missing parents.
    fn ensure_dir(&self, dir: &Path) -> io::Result<()>;

    /// List the immediate children of `dir`, in no particular order.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn read(&self, path: &Path) -> io::Result<String>;

    /// Overwrite (or create) the file at `path` with `content`.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Resolve `path` to the absolute form used as catalog identity.
    ///
    /// The containing directory is resolved but the final component is kept,
    /// so a linked preset file is identified by its link path.
    fn absolute(&self, path: &Path) -> PathBuf;
}

/// Storage backed by the local file system via `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemStorage;

impl FileSystemStorage {
    pub fn new() -> Self {
        Self
    }
}

impl PresetStorage for FileSystemStorage {
    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            // Linked files are kept under the link's own path; linked
            // directories are never descended into
            let is_file = file_type.is_file()
                || (file_type.is_symlink()
                    && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file()));
            if file_type.is_dir() {
                entries.push(DirEntryInfo {
                    path: entry.path(),
                    is_dir: true,
                });
            } else if is_file {
                entries.push(DirEntryInfo {
                    path: entry.path(),
                    is_dir: false,
                });
            }
        }
        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            if let Ok(parent) = fs::canonicalize(parent) {
                return parent.join(name);
            }
        }
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
