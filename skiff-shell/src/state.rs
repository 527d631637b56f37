use std::collections::BTreeSet;

/// Open/closed state for a view's toggleable widgets, keyed by widget id.
/// Owned by the view and passed to the renderer by reference; nothing here
/// is process-global.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleSet {
    open: BTreeSet<String>,
}

impl ToggleSet {
    /// Flips one widget. Only one toggleable is open at a time, so every
    /// other widget closes first. Returns the widget's new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.is_open(id);
        self.close_all();
        if next {
            self.open.insert(id.to_string());
        }
        next
    }

    pub fn open(&mut self, id: &str) {
        self.open.insert(id.to_string());
    }

    pub fn close(&mut self, id: &str) {
        self.open.remove(id);
    }

    pub fn close_all(&mut self) {
        self.open.clear();
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.contains(id)
    }

    pub fn any_open(&self) -> bool {
        !self.open.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKey {
    Enter,
    Escape,
}

/// Editor-header view state: the title-edit flow plus the header's own
/// dropdowns.
#[derive(Debug, Clone, Default)]
pub struct HeaderState {
    pub menus: ToggleSet,
    editing_title: bool,
    draft: String,
}

impl HeaderState {
    pub fn is_editing_title(&self) -> bool {
        self.editing_title
    }

    pub fn start_editing_title(&mut self, current: &str) {
        self.editing_title = true;
        self.draft = current.to_string();
    }

    /// Mirrors the contenteditable's text as the user types.
    pub fn set_draft(&mut self, text: &str) {
        if self.editing_title {
            self.draft = text.to_string();
        }
    }

    /// Enter commits, Escape cancels. Returns the new title when the edit
    /// actually changed it; the caller applies it through the archive.
    pub fn title_keydown(&mut self, key: TitleKey, current: &str) -> Option<String> {
        match key {
            TitleKey::Enter => self.commit_title(current),
            TitleKey::Escape => {
                self.cancel_editing();
                None
            }
        }
    }

    pub fn commit_title(&mut self, current: &str) -> Option<String> {
        if !self.editing_title {
            return None;
        }
        self.editing_title = false;
        let draft = self.draft.trim();
        if draft.is_empty() || draft == current {
            return None;
        }
        Some(draft.to_string())
    }

    pub fn cancel_editing(&mut self) {
        self.editing_title = false;
        self.draft.clear();
    }
}
