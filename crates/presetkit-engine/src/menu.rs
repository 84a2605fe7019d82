use crate::catalog::PresetId;
use relative_path::RelativePathBuf;

/// A node of the preset menu: either a preset or a folder of further nodes
#[derive(Debug, Clone, PartialEq)]
pub enum MenuNode {
    Preset { id: PresetId, name: String },
    Folder(MenuFolder),
}

/// A directory in the menu hierarchy.
///
/// Folders only ever exist in a built tree when at least one preset lives
/// somewhere beneath them.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuFolder {
    pub name: String,
    pub relative_path: RelativePathBuf,
    pub children: Vec<MenuNode>,
}

impl MenuFolder {
    pub fn new(name: String, relative_path: RelativePathBuf) -> Self {
        Self {
            name,
            relative_path,
            children: Vec::new(),
        }
    }

    /// Number of presets anywhere below this folder
    pub fn preset_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                MenuNode::Preset { .. } => 1,
                MenuNode::Folder(folder) => folder.preset_count(),
            })
            .sum()
    }

    fn flatten_into(&self, depth: usize, items: &mut Vec<MenuItem>) {
        for child in &self.children {
            match child {
                MenuNode::Preset { id, name } => items.push(MenuItem {
                    depth,
                    name: name.clone(),
                    kind: MenuItemKind::Preset(*id),
                }),
                MenuNode::Folder(folder) => {
                    items.push(MenuItem {
                        depth,
                        name: folder.name.clone(),
                        kind: MenuItemKind::Folder(folder.relative_path.clone()),
                    });
                    folder.flatten_into(depth + 1, items);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuItemKind {
    Preset(PresetId),
    Folder(RelativePathBuf),
}

/// One line of the flattened menu, for list-style presentation
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub depth: usize,
    pub name: String,
    pub kind: MenuItemKind,
}

impl MenuItem {
    pub fn preset_id(&self) -> Option<PresetId> {
        match self.kind {
            MenuItemKind::Preset(id) => Some(id),
            MenuItemKind::Folder(_) => None,
        }
    }
}

/// Pruned hierarchical projection of a catalog, mirroring the directory layout
#[derive(Debug, Clone, PartialEq)]
pub struct MenuTree {
    pub root: MenuFolder,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self {
            root: MenuFolder::new(String::new(), RelativePathBuf::new()),
        }
    }
}

impl MenuTree {
    pub fn new(root: MenuFolder) -> Self {
        Self { root }
    }

    /// Depth-first listing: a folder line is followed by its contents, and the
    /// root folder itself is not listed.
    pub fn items(&self) -> Vec<MenuItem> {
        let mut items = Vec::new();
        self.root.flatten_into(0, &mut items);
        items
    }

    /// Position of the preset in `items()`
    pub fn position_of(&self, id: PresetId) -> Option<usize> {
        self.items()
            .iter()
            .position(|item| item.preset_id() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(raw: u32) -> PresetId {
        PresetId::new(raw).unwrap()
    }

    fn sample_tree() -> MenuTree {
        let mut sub = MenuFolder::new("sub".to_string(), RelativePathBuf::from("sub"));
        sub.children.push(MenuNode::Preset {
            id: id(3),
            name: "c".to_string(),
        });

        let mut root = MenuFolder::new("presets".to_string(), RelativePathBuf::new());
        root.children.push(MenuNode::Preset {
            id: id(1),
            name: "a".to_string(),
        });
        root.children.push(MenuNode::Preset {
            id: id(2),
            name: "b".to_string(),
        });
        root.children.push(MenuNode::Folder(sub));
        MenuTree::new(root)
    }

    #[test]
    fn test_items_are_depth_first() {
        let tree = sample_tree();
        let items = tree.items();

        let summary: Vec<_> = items
            .iter()
            .map(|item| (item.depth, item.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(0, "a"), (0, "b"), (0, "sub"), (1, "c")]);
        assert_eq!(items[2].kind, MenuItemKind::Folder(RelativePathBuf::from("sub")));
        assert_eq!(items[3].preset_id(), Some(id(3)));
    }

    #[test]
    fn test_preset_count_includes_nested() {
        let tree = sample_tree();
        assert_eq!(tree.root.preset_count(), 3);
    }

    #[test]
    fn test_position_of() {
        let tree = sample_tree();
        assert_eq!(tree.position_of(id(1)), Some(0));
        assert_eq!(tree.position_of(id(3)), Some(3));
        assert_eq!(tree.position_of(id(9)), None);
    }

    #[test]
    fn test_default_tree_is_empty() {
        let tree = MenuTree::default();
        assert_eq!(tree.root.preset_count(), 0);
        assert!(tree.items().is_empty());
    }
}
