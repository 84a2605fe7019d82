use crate::error::PresetError;
use crate::menu::{MenuFolder, MenuNode, MenuTree};
use crate::storage::{DirEntryInfo, PresetStorage};
use relative_path::RelativePathBuf;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// File extension recognised as a preset when none is configured
pub const DEFAULT_EXTENSION: &str = "preset";

/// Sequential identifier of a preset within one catalog build.
///
/// Ids start at 1 and are only meaningful for the catalog that issued them;
/// a rebuild may hand the same id to a different file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PresetId(NonZeroU32);

impl PresetId {
    pub const FIRST: PresetId = PresetId(NonZeroU32::MIN);

    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(PresetId)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A preset file discovered during a catalog build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetEntry {
    pub id: PresetId,
    pub path: PathBuf,
    pub name: String,
}

/// Flat `id -> entry` index produced by one scan, with a reverse `path -> id`
/// index built alongside it.
///
/// Ids always form the contiguous run `1..=len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: BTreeMap<PresetId, PresetEntry>,
    by_path: HashMap<PathBuf, PresetId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: PresetId) -> Option<&PresetEntry> {
        self.entries.get(&id)
    }

    /// Reverse lookup of the id assigned to `path`
    pub fn id_for_path(&self, path: &Path) -> Option<PresetId> {
        self.by_path.get(path).copied()
    }

    /// Highest id in the catalog, which is also its size
    pub fn last_id(&self) -> Option<PresetId> {
        self.entries.keys().next_back().copied()
    }

    /// Entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &PresetEntry> {
        self.entries.values()
    }

    /// Preset names (file stems) in id order
    pub fn names(&self) -> Vec<String> {
        self.entries().map(|entry| entry.name.clone()).collect()
    }

    fn push(&mut self, path: PathBuf) -> PresetId {
        let raw = u32::try_from(self.entries.len() + 1).unwrap_or(u32::MAX);
        let id = PresetId::new(raw).unwrap_or(PresetId::FIRST);
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        self.by_path.insert(path.clone(), id);
        self.entries.insert(id, PresetEntry { id, path, name });
        id
    }
}

/// Scans a preset root and produces a fresh catalog and menu tree.
///
/// Traversal is depth-first pre-order: the preset files of a directory get
/// their ids (sorted by name) before any of its subdirectories are visited,
/// and subdirectories are visited in name order. Directories without any
/// preset beneath them are dropped from the menu.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    extension: String,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl CatalogBuilder {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether `path` carries the preset extension
    pub fn is_preset_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.extension.as_str())
            .unwrap_or(false)
    }

    pub fn build<S: PresetStorage + ?Sized>(
        &self,
        storage: &S,
        root: &Path,
    ) -> Result<(Catalog, MenuTree), PresetError> {
        if !storage.is_dir(root) {
            return Err(PresetError::InvalidRoot(root.to_path_buf()));
        }

        let entries = storage
            .list_dir(root)
            .map_err(|source| PresetError::io(root, source))?;

        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut catalog = Catalog::new();
        let root_folder = self
            .build_folder(
                storage,
                entries,
                root_name.clone(),
                RelativePathBuf::new(),
                &mut catalog,
            )
            .unwrap_or_else(|| MenuFolder::new(root_name, RelativePathBuf::new()));

        log::debug!(
            "Catalog rebuilt from {}: {} presets",
            root.display(),
            catalog.len()
        );
        Ok((catalog, MenuTree::new(root_folder)))
    }

    fn build_folder<S: PresetStorage + ?Sized>(
        &self,
        storage: &S,
        entries: Vec<DirEntryInfo>,
        name: String,
        relative_path: RelativePathBuf,
        catalog: &mut Catalog,
    ) -> Option<MenuFolder> {
        let (mut dirs, mut files): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .filter(|entry| !entry.file_name().starts_with('.'))
            .partition(|entry| entry.is_dir);

        files.retain(|entry| self.is_preset_file(&entry.path));
        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        dirs.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        let mut folder = MenuFolder::new(name, relative_path);

        for file in files {
            let id = catalog.push(file.path);
            let preset_name = catalog.get(id).map(|e| e.name.clone()).unwrap_or_default();
            folder.children.push(MenuNode::Preset {
                id,
                name: preset_name,
            });
        }

        for dir in dirs {
            let dir_name = dir.file_name();
            let child_entries = match storage.list_dir(&dir.path) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Skipping unreadable folder {}: {e}", dir.path.display());
                    continue;
                }
            };
            let child_rel = folder.relative_path.join(&dir_name);
            match self.build_folder(storage, child_entries, dir_name, child_rel, catalog) {
                Some(child) => folder.children.push(MenuNode::Folder(child)),
                None => log::debug!("Pruned empty folder {}", dir.path.display()),
            }
        }

        if folder.children.is_empty() {
            None
        } else {
            Some(folder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItemKind;
    use crate::storage::FileSystemStorage;
    use crate::tests::{create_preset_file, create_test_presets_dir};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn build(dir: &Path) -> (Catalog, MenuTree) {
        CatalogBuilder::default()
            .build(&FileSystemStorage::new(), dir)
            .unwrap()
    }

    fn relative_names(catalog: &Catalog, root: &Path) -> Vec<(u32, String)> {
        catalog
            .entries()
            .map(|entry| {
                let rel = entry.path.strip_prefix(root).unwrap();
                (entry.id.get(), rel.to_string_lossy().replace('\\', "/"))
            })
            .collect()
    }

    #[test]
    fn test_files_before_subfolders() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "b.preset", "b");
        create_preset_file(&presets_dir, "sub/c.preset", "c");
        create_preset_file(&presets_dir, "a.preset", "a");

        let (catalog, _) = build(presets_dir.path());

        assert_eq!(
            relative_names(&catalog, presets_dir.path()),
            vec![
                (1, "a.preset".to_string()),
                (2, "b.preset".to_string()),
                (3, "sub/c.preset".to_string()),
            ]
        );
    }

    #[test]
    fn test_subfolders_visited_in_name_order() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "zeta/one.preset", "");
        create_preset_file(&presets_dir, "alpha/two.preset", "");
        create_preset_file(&presets_dir, "alpha/deep/three.preset", "");
        create_preset_file(&presets_dir, "Mid/four.preset", "");

        let (catalog, _) = build(presets_dir.path());

        // byte order puts upper case before lower case
        assert_eq!(
            relative_names(&catalog, presets_dir.path()),
            vec![
                (1, "Mid/four.preset".to_string()),
                (2, "alpha/two.preset".to_string()),
                (3, "alpha/deep/three.preset".to_string()),
                (4, "zeta/one.preset".to_string()),
            ]
        );
    }

    #[rstest]
    #[case(&[], 0)]
    #[case(&["a.preset"], 1)]
    #[case(&["a.preset", "b.preset", "sub/c.preset"], 3)]
    #[case(&["x/y/z/deep.preset", "x/shallow.preset", "top.preset", "w/v.preset"], 4)]
    fn test_ids_are_contiguous(#[case] files: &[&str], #[case] expected: usize) {
        let presets_dir = create_test_presets_dir();
        for file in files {
            create_preset_file(&presets_dir, file, "");
        }

        let (catalog, tree) = build(presets_dir.path());

        assert_eq!(catalog.len(), expected);
        let ids: Vec<u32> = catalog.entries().map(|e| e.id.get()).collect();
        let expected_ids: Vec<u32> = (1..=expected as u32).collect();
        assert_eq!(ids, expected_ids);
        assert_eq!(tree.root.preset_count(), expected);
    }

    #[test]
    fn test_ignores_other_extensions_and_hidden_entries() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "keep.preset", "");
        create_preset_file(&presets_dir, "notes.txt", "");
        create_preset_file(&presets_dir, "upper.PRESET", "");
        create_preset_file(&presets_dir, ".hidden.preset", "");
        create_preset_file(&presets_dir, ".git/inside.preset", "");

        let (catalog, _) = build(presets_dir.path());

        assert_eq!(catalog.names(), vec!["keep".to_string()]);
    }

    #[test]
    fn test_empty_folders_are_pruned() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "full/a.preset", "");
        create_preset_file(&presets_dir, "only_text/readme.txt", "");
        std::fs::create_dir_all(presets_dir.path().join("empty/nested/deeper")).unwrap();

        let (_, tree) = build(presets_dir.path());
        let items = tree.items();

        let names: Vec<_> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["full", "a"]);
        assert_eq!(
            items[0].kind,
            MenuItemKind::Folder(RelativePathBuf::from("full"))
        );
    }

    #[test]
    fn test_folder_with_only_nested_presets_is_kept() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "outer/inner/a.preset", "");

        let (_, tree) = build(presets_dir.path());
        let items = tree.items();

        let summary: Vec<_> = items
            .iter()
            .map(|item| (item.depth, item.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(0, "outer"), (1, "inner"), (2, "a")]);
    }

    #[test]
    fn test_reverse_index_matches_entries() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "a.preset", "");
        create_preset_file(&presets_dir, "sub/b.preset", "");

        let (catalog, _) = build(presets_dir.path());

        for entry in catalog.entries() {
            assert_eq!(catalog.id_for_path(&entry.path), Some(entry.id));
        }
        assert_eq!(catalog.id_for_path(Path::new("/nowhere.preset")), None);
        assert_eq!(catalog.last_id(), PresetId::new(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_preset_files_are_catalogued() {
        use std::os::unix::fs::symlink;

        let presets_dir = create_test_presets_dir();
        let real = create_preset_file(&presets_dir, "store/real.preset", "");
        create_preset_file(&presets_dir, "store/other.preset", "");
        let root = presets_dir.path().join("root");
        create_preset_file(&presets_dir, "root/a.preset", "");
        symlink(&real, root.join("linked.preset")).unwrap();
        symlink(presets_dir.path().join("store"), root.join("shared")).unwrap();

        let (catalog, tree) = build(&root);

        assert_eq!(catalog.names(), vec!["a".to_string(), "linked".to_string()]);
        let linked = catalog.get(PresetId::new(2).unwrap()).unwrap();
        assert_eq!(linked.path, root.join("linked.preset"));
        assert_eq!(catalog.id_for_path(&root.join("linked.preset")), Some(linked.id));
        assert_eq!(tree.items().len(), 2);
    }

    #[test]
    fn test_custom_extension() {
        let presets_dir = create_test_presets_dir();
        create_preset_file(&presets_dir, "a.patch", "");
        create_preset_file(&presets_dir, "b.preset", "");

        let builder = CatalogBuilder::new(".patch");
        let (catalog, _) = builder
            .build(&FileSystemStorage::new(), presets_dir.path())
            .unwrap();

        assert_eq!(builder.extension(), "patch");
        assert_eq!(catalog.names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_missing_root_is_invalid() {
        let result =
            CatalogBuilder::default().build(&FileSystemStorage::new(), Path::new("/no/such/root"));
        assert!(matches!(result, Err(PresetError::InvalidRoot(_))));
    }

    #[test]
    fn test_rebuild_reassigns_ids() {
        let presets_dir = create_test_presets_dir();
        let a = create_preset_file(&presets_dir, "a.preset", "");
        create_preset_file(&presets_dir, "b.preset", "");

        let (before, _) = build(presets_dir.path());
        assert_eq!(before.names(), vec!["a".to_string(), "b".to_string()]);

        std::fs::remove_file(a).unwrap();
        let (after, _) = build(presets_dir.path());

        assert_eq!(after.len(), 1);
        assert_eq!(after.get(PresetId::FIRST).unwrap().name, "b");
    }

    #[test]
    fn test_preset_id_rejects_zero() {
        assert!(PresetId::new(0).is_none());
        assert_eq!(PresetId::new(7).unwrap().to_string(), "7");
        assert_eq!(PresetId::FIRST.get(), 1);
    }
}
