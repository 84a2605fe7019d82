use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary presets directory
pub fn create_test_presets_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a preset file (and any parent folders) relative to the presets directory
pub fn create_preset_file(presets_dir: &TempDir, relative: &str, content: &str) -> PathBuf {
    let file_path = presets_dir.path().join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}
