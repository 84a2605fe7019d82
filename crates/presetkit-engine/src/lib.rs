pub mod binding;
pub mod catalog;
pub mod error;
pub mod manager;
pub mod menu;
pub mod storage;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use binding::StateBinding;
pub use catalog::{Catalog, CatalogBuilder, DEFAULT_EXTENSION, PresetEntry, PresetId};
pub use error::PresetError;
pub use manager::{NO_PRESET_SELECTED, PresetManager};
pub use menu::{MenuFolder, MenuItem, MenuItemKind, MenuNode, MenuTree};
pub use storage::{DirEntryInfo, FileSystemStorage, PresetStorage};
pub use store::{ParameterKind, ParameterSpec, ParameterStore, StateStore, StateTree};
