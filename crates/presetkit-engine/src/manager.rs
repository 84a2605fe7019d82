//! Preset lifecycle and navigation over the last-built catalog.
//!
//! `PresetManager` owns the catalog produced by the most recent `rebuild()`
//! and derives the current preset id from the state store's current path.
//! Every id-based operation is resolved against that catalog only, so ids
//! must not be reused across rebuilds.
//!
//! Deleting a preset leaves its entry in the in-memory catalog until the next
//! `rebuild()`; callers that want the menu to drop it must rebuild.

use crate::binding::StateBinding;
use crate::catalog::{Catalog, CatalogBuilder, PresetEntry, PresetId};
use crate::error::PresetError;
use crate::menu::MenuTree;
use crate::storage::PresetStorage;
use crate::store::StateStore;
use std::path::{Path, PathBuf};

/// Value reported by `current_preset_number` when no preset is selected
pub const NO_PRESET_SELECTED: i64 = -1;

pub struct PresetManager<S: PresetStorage, T: StateStore> {
    storage: S,
    store: T,
    root: PathBuf,
    builder: CatalogBuilder,
    catalog: Catalog,
    menu: MenuTree,
    binding: StateBinding,
}

impl<S: PresetStorage, T: StateStore> PresetManager<S, T> {
    /// Create a manager over `root`, creating the directory if needed.
    ///
    /// The catalog starts empty; call `rebuild()` to scan the root.
    pub fn new(
        storage: S,
        store: T,
        root: impl Into<PathBuf>,
        extension: &str,
    ) -> Result<Self, PresetError> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(PresetError::EmptyInput);
        }
        if storage.exists(&root) && !storage.is_dir(&root) {
            return Err(PresetError::InvalidRoot(root));
        }
        if !storage.is_dir(&root) {
            storage
                .ensure_dir(&root)
                .map_err(|source| PresetError::io(&root, source))?;
            log::info!("Created preset directory {}", root.display());
        }
        let root = storage.absolute(&root);

        let catalog = Catalog::new();
        let mut binding = StateBinding::new();
        binding.rebind(&catalog, &store);

        Ok(Self {
            storage,
            store,
            root,
            builder: CatalogBuilder::new(extension),
            catalog,
            menu: MenuTree::default(),
            binding,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        self.builder.extension()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn menu(&self) -> &MenuTree {
        &self.menu
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    /// Mutable access to the state store.
    ///
    /// If the caller replaces the store root through this, the next manager
    /// operation re-binds automatically; `on_store_replaced` does it eagerly.
    pub fn store_mut(&mut self) -> &mut T {
        &mut self.store
    }

    /// Re-scan the root, replacing the catalog and menu wholesale.
    ///
    /// Returns the number of presets found.
    pub fn rebuild(&mut self) -> Result<usize, PresetError> {
        self.sync_store();
        let (catalog, menu) = self.builder.build(&self.storage, &self.root)?;
        self.catalog = catalog;
        self.menu = menu;
        self.binding.resync(&self.catalog, &self.store);
        log::info!(
            "Found {} presets under {}",
            self.catalog.len(),
            self.root.display()
        );
        Ok(self.catalog.len())
    }

    /// Write the full store content to `path`, overwriting any existing file.
    ///
    /// The path is trusted as given and need not be in the catalog or even
    /// under the root.
    pub fn save(&mut self, path: &Path) -> Result<(), PresetError> {
        self.sync_store();
        if path.as_os_str().is_empty() {
            log::debug!("Ignoring save with empty path");
            return Err(PresetError::EmptyInput);
        }

        let payload = self.store.serialize()?;
        if let Err(source) = self.storage.write(path, &payload) {
            log::warn!("Could not write preset file {}: {source}", path.display());
            return Err(PresetError::io(path, source));
        }

        let resolved = self.storage.absolute(path);
        self.store
            .set_current_preset_path(&resolved.to_string_lossy());
        self.binding.resync(&self.catalog, &self.store);
        log::info!("Saved preset {}", resolved.display());
        Ok(())
    }

    /// Save as `<root>/<name>.<extension>`, returning the written path.
    ///
    /// The name must be a single path component; separators and `.`/`..`
    /// are rejected so the file always lands directly in the root.
    pub fn save_named(&mut self, name: &str) -> Result<PathBuf, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            log::debug!("Ignoring save with empty preset name");
            return Err(PresetError::EmptyInput);
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            log::warn!("Refusing to save preset named {name:?}");
            return Err(PresetError::InvalidName(name.to_string()));
        }
        let path = self.root.join(format!("{name}.{}", self.extension()));
        self.save(&path)?;
        Ok(path)
    }

    /// Replace the store content with the preset catalogued as `id`
    pub fn load(&mut self, id: PresetId) -> Result<(), PresetError> {
        self.sync_store();
        let entry = self.entry(id)?.clone();
        self.apply_file(&entry.path)?;
        self.binding.set_loaded(id);
        log::info!("Loaded preset {id}: {}", entry.path.display());
        Ok(())
    }

    /// Load a preset file by path, whether or not it is catalogued.
    ///
    /// The current id is then derived by reverse lookup.
    pub fn load_path(&mut self, path: &Path) -> Result<(), PresetError> {
        self.sync_store();
        if path.as_os_str().is_empty() {
            log::debug!("Ignoring load with empty path");
            return Err(PresetError::EmptyInput);
        }
        let resolved = self.storage.absolute(path);
        self.apply_file(&resolved)?;
        self.binding.resync(&self.catalog, &self.store);
        log::info!("Loaded preset {}", resolved.display());
        Ok(())
    }

    /// Delete the file behind `id` and clear the current selection.
    ///
    /// The catalog keeps listing the entry until the next `rebuild()`.
    pub fn delete(&mut self, id: PresetId) -> Result<(), PresetError> {
        self.sync_store();
        let path = self.entry(id)?.path.clone();
        self.remove_file(&path)?;
        log::info!("Deleted preset {id}: {}", path.display());
        Ok(())
    }

    /// Delete a catalogued preset by its path.
    ///
    /// Only files listed in the current catalog can be deleted this way.
    pub fn delete_path(&mut self, path: &Path) -> Result<(), PresetError> {
        self.sync_store();
        if path.as_os_str().is_empty() {
            log::debug!("Ignoring delete with empty path");
            return Err(PresetError::EmptyInput);
        }
        let resolved = self.storage.absolute(path);
        match self.catalog.id_for_path(&resolved) {
            Some(id) => self.delete(id),
            None if !self.storage.is_file(&resolved) => {
                log::warn!("Preset file {} does not exist", resolved.display());
                Err(PresetError::MissingFile(resolved))
            }
            None => {
                log::warn!("Refusing to delete uncatalogued file {}", resolved.display());
                Err(PresetError::NotCatalogued(resolved))
            }
        }
    }

    /// Load the preset after the current one, wrapping to the first.
    ///
    /// Returns the loaded id, or `None` when the catalog is empty. With no
    /// current selection there is nothing to step from, and this fails with
    /// `NoSelection` without touching the store.
    pub fn next(&mut self) -> Result<Option<PresetId>, PresetError> {
        self.sync_store();
        let Some(last) = self.catalog.last_id() else {
            return Ok(None);
        };
        let target = match self.binding.current_id() {
            Some(current) if current < last => {
                PresetId::new(current.get() + 1).unwrap_or(PresetId::FIRST)
            }
            Some(_) => PresetId::FIRST,
            None => {
                log::warn!("No current preset to step forward from");
                return Err(PresetError::NoSelection);
            }
        };
        self.load(target)?;
        Ok(Some(target))
    }

    /// Load the preset before the current one, wrapping to the last.
    ///
    /// With no current selection this loads the last preset.
    pub fn previous(&mut self) -> Result<Option<PresetId>, PresetError> {
        self.sync_store();
        let Some(last) = self.catalog.last_id() else {
            return Ok(None);
        };
        let target = match self.binding.current_id() {
            Some(current) if current > PresetId::FIRST && current <= last => {
                PresetId::new(current.get() - 1).unwrap_or(last)
            }
            _ => last,
        };
        self.load(target)?;
        Ok(Some(target))
    }

    /// Preset names in catalog id order
    pub fn all_preset_names(&self) -> Vec<String> {
        self.catalog.names()
    }

    pub fn current_preset_id(&self) -> Option<PresetId> {
        self.binding.resolve(&self.catalog, &self.store)
    }

    /// Current id as a plain number, `NO_PRESET_SELECTED` when there is none
    pub fn current_preset_number(&self) -> i64 {
        self.current_preset_id()
            .map(|id| i64::from(id.get()))
            .unwrap_or(NO_PRESET_SELECTED)
    }

    pub fn current_preset_path(&self) -> String {
        self.store.current_preset_path()
    }

    /// Re-subscribe to the store after its owner replaced the root
    pub fn on_store_replaced(&mut self) -> Option<PresetId> {
        self.binding.rebind(&self.catalog, &self.store)
    }

    fn sync_store(&mut self) {
        self.binding.rebind_if_replaced(&self.catalog, &self.store);
    }

    fn entry(&self, id: PresetId) -> Result<&PresetEntry, PresetError> {
        self.catalog.get(id).ok_or_else(|| {
            log::warn!("Preset with id {id} does not exist");
            PresetError::NotFound(id)
        })
    }

    // Reads and applies a snapshot; the store is only touched once the payload is accepted
    fn apply_file(&mut self, path: &Path) -> Result<(), PresetError> {
        if !self.storage.is_file(path) {
            log::warn!("Preset file {} does not exist", path.display());
            return Err(PresetError::MissingFile(path.to_path_buf()));
        }
        let payload = self.storage.read(path).map_err(|source| {
            log::warn!("Could not read preset file {}: {source}", path.display());
            PresetError::io(path, source)
        })?;
        if let Err(e) = self.store.replace_state(&payload) {
            log::warn!("Could not apply preset {}: {e}", path.display());
            return Err(e);
        }
        self.store.set_current_preset_path(&path.to_string_lossy());
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), PresetError> {
        if !self.storage.is_file(path) {
            log::warn!("Preset file {} does not exist", path.display());
            return Err(PresetError::MissingFile(path.to_path_buf()));
        }
        if let Err(source) = self.storage.remove(path) {
            log::warn!("Preset file {} could not be deleted: {source}", path.display());
            return Err(PresetError::io(path, source));
        }
        self.store.set_current_preset_path("");
        self.binding.resync(&self.catalog, &self.store);
        Ok(())
    }
}
