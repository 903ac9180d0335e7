//! Preview state: the decoded sheets plus the selected tab.
//!
//! Out-of-range selections are clamped: asking for a tab past the end selects
//! the last one, and selecting on an empty model does nothing. The active
//! index is therefore always valid whenever there is anything to show.

use crate::models::{PreviewSet, SheetPreview};

/// Parsed preview set and the currently selected sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewModel {
    set: PreviewSet,
    active_index: usize,
}

impl PreviewModel {
    pub fn new(set: PreviewSet) -> Self {
        Self {
            set,
            active_index: 0,
        }
    }

    /// Swap in a new set and select its first sheet.
    pub fn replace(&mut self, set: PreviewSet) {
        self.set = set;
        self.active_index = 0;
    }

    /// Drop everything, e.g. after a failed parse.
    pub fn clear(&mut self) {
        self.replace(PreviewSet::default());
    }

    /// Select sheet `index`, clamped to the last sheet.
    ///
    /// Returns the index actually selected, or `None` when there are no sheets.
    pub fn set_active(&mut self, index: usize) -> Option<usize> {
        let last = self.set.len().checked_sub(1)?;
        self.active_index = index.min(last);
        Some(self.active_index)
    }

    /// Select a sheet by name. Leaves the selection alone if no sheet matches.
    pub fn select_sheet(&mut self, name: &str) -> bool {
        match self.set.position(name) {
            Some(index) => {
                self.active_index = index;
                true
            }
            None => false,
        }
    }

    /// Sheet at the active index, `None` when empty.
    pub fn current(&self) -> Option<&SheetPreview> {
        self.set.get(self.active_index)
    }

    /// Active index, `None` when empty.
    pub fn active_index(&self) -> Option<usize> {
        (!self.set.is_empty()).then_some(self.active_index)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.set.sheet_names()
    }

    pub fn set(&self) -> &PreviewSet {
        &self.set
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
