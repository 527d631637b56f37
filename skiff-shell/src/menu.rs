/// Data model for the header's dropdown menu bar. Rendering and dispatch
/// belong to the embedding view; items carry action ids, not callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Action {
        label: String,
        action: String,
        disabled: bool,
    },
    Separator,
}

impl MenuItem {
    pub fn action(label: &str, action: &str) -> Self {
        Self::Action {
            label: label.to_string(),
            action: action.to_string(),
            disabled: false,
        }
    }

    pub fn action_if(label: &str, action: &str, enabled: bool) -> Self {
        Self::Action {
            label: label.to_string(),
            action: action.to_string(),
            disabled: !enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub label: String,
    pub items: Vec<MenuItem>,
}

impl Menu {
    pub fn item(&self, action: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| match item {
            MenuItem::Action { action: id, .. } => id == action,
            MenuItem::Separator => false,
        })
    }

    pub fn is_enabled(&self, action: &str) -> bool {
        matches!(self.item(action), Some(MenuItem::Action { disabled, .. }) if !disabled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuBar {
    pub menus: Vec<Menu>,
}

impl MenuBar {
    pub fn menu(&self, label: &str) -> Option<&Menu> {
        self.menus.iter().find(|menu| menu.label == label)
    }
}

/// What the current archive and editor buffer allow; drives disabled flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuCaps {
    pub is_owner: bool,
    pub is_editable: bool,
    pub is_unsaved_buffer: bool,
}

pub fn standard_menu_bar(caps: MenuCaps) -> MenuBar {
    MenuBar {
        menus: vec![
            Menu {
                label: "File".to_string(),
                items: vec![
                    MenuItem::action_if("New file", "new-file", caps.is_owner),
                    MenuItem::action_if("New folder", "new-folder", caps.is_owner),
                    MenuItem::action_if("Import file(s)...", "import-files", caps.is_owner),
                    MenuItem::Separator,
                    MenuItem::action_if("Save file", "save-file", caps.is_editable),
                    MenuItem::action_if("Rename file", "rename-file", false),
                    MenuItem::action_if("Delete file", "delete-file", false),
                    MenuItem::Separator,
                    MenuItem::action("View site", "view-site"),
                    MenuItem::action_if("View current file", "view-file", !caps.is_unsaved_buffer),
                    MenuItem::action("Copy URL", "copy-url"),
                ],
            },
            Menu {
                label: "Edit".to_string(),
                items: vec![
                    MenuItem::action_if("Undo", "undo", caps.is_editable),
                    MenuItem::action_if("Redo", "redo", caps.is_editable),
                    MenuItem::Separator,
                    MenuItem::action_if("Cut", "cut", caps.is_editable),
                    MenuItem::action_if("Copy", "copy", caps.is_editable),
                    MenuItem::action_if("Paste", "paste", caps.is_editable),
                ],
            },
            Menu {
                label: "Tools".to_string(),
                items: vec![
                    MenuItem::action("Create new site", "new-site"),
                    MenuItem::action("Fork this site", "fork-site"),
                    MenuItem::action("Export site files...", "export-files"),
                    MenuItem::Separator,
                    MenuItem::action("Settings", "open-settings"),
                ],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_owner_cannot_mutate_files() {
        let bar = standard_menu_bar(MenuCaps {
            is_owner: false,
            is_editable: false,
            is_unsaved_buffer: false,
        });
        let file = bar.menu("File").unwrap();

        assert!(!file.is_enabled("new-file"));
        assert!(!file.is_enabled("import-files"));
        assert!(file.is_enabled("view-site"));
        assert!(file.is_enabled("copy-url"));
    }

    #[test]
    fn editable_buffer_enables_edit_menu() {
        let bar = standard_menu_bar(MenuCaps {
            is_owner: true,
            is_editable: true,
            is_unsaved_buffer: false,
        });
        let edit = bar.menu("Edit").unwrap();

        assert!(edit.is_enabled("undo"));
        assert!(edit.is_enabled("paste"));
        assert!(bar.menu("File").unwrap().is_enabled("save-file"));
    }

    #[test]
    fn unsaved_buffer_disables_view_current_file() {
        let bar = standard_menu_bar(MenuCaps {
            is_owner: true,
            is_editable: true,
            is_unsaved_buffer: true,
        });

        assert!(!bar.menu("File").unwrap().is_enabled("view-file"));
    }

    #[test]
    fn every_menu_is_present() {
        let bar = standard_menu_bar(MenuCaps::default());
        assert!(bar.menu("File").is_some());
        assert!(bar.menu("Edit").is_some());
        assert!(bar.menu("Tools").is_some());
        assert!(bar.menu("Help").is_none());
    }
}
