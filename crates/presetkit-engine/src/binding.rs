use crate::catalog::{Catalog, PresetId};
use crate::store::StateStore;
use std::path::Path;

/// Keeps the current preset id consistent with the store's current path.
///
/// The id is derived: apart from a successful load, it is always the result
/// of looking the store's current path up in the live catalog. The binding
/// also remembers which store root it last resolved against, so a wholesale
/// replacement of the root by its owner is noticed and re-synced.
#[derive(Debug, Clone, Default)]
pub struct StateBinding {
    current_id: Option<PresetId>,
    bound_revision: Option<u64>,
}

impl StateBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> Option<PresetId> {
        self.current_id
    }

    /// Bind to the store's current root and re-derive the id
    pub fn rebind<T: StateStore + ?Sized>(
        &mut self,
        catalog: &Catalog,
        store: &T,
    ) -> Option<PresetId> {
        self.bound_revision = Some(store.root_revision());
        self.resync(catalog, store)
    }

    /// Re-bind only if the store root changed since the last bind.
    ///
    /// Returns true when a re-bind happened.
    pub fn rebind_if_replaced<T: StateStore + ?Sized>(
        &mut self,
        catalog: &Catalog,
        store: &T,
    ) -> bool {
        if self.is_stale(store) {
            log::debug!(
                "State store root replaced (revision {}), re-syncing current preset",
                store.root_revision()
            );
            self.rebind(catalog, store);
            true
        } else {
            false
        }
    }

    pub fn is_stale<T: StateStore + ?Sized>(&self, store: &T) -> bool {
        self.bound_revision != Some(store.root_revision())
    }

    /// Reverse lookup of the store's current path in `catalog`
    pub fn resync<T: StateStore + ?Sized>(
        &mut self,
        catalog: &Catalog,
        store: &T,
    ) -> Option<PresetId> {
        self.current_id = Self::lookup(catalog, store);
        self.current_id
    }

    /// The id the binding would hold after a re-sync, without mutating it
    pub fn resolve<T: StateStore + ?Sized>(&self, catalog: &Catalog, store: &T) -> Option<PresetId> {
        if self.is_stale(store) {
            Self::lookup(catalog, store)
        } else {
            self.current_id
        }
    }

    /// Record the id a load just selected
    pub fn set_loaded(&mut self, id: PresetId) {
        self.current_id = Some(id);
    }

    fn lookup<T: StateStore + ?Sized>(catalog: &Catalog, store: &T) -> Option<PresetId> {
        let path = store.current_preset_path();
        if path.is_empty() {
            return None;
        }
        catalog.id_for_path(Path::new(&path))
    }
}
