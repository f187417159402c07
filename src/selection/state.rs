use super::chains::{ChainGroups, ChainInfo};

/// Input from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Select a chain (replaces any previous selection).
    Select(String),
    /// Clear the selection.
    Deselect,
    /// Pointer entered a chain.
    Hover(String),
    /// Pointer left the hovered chain.
    Unhover,
}

/// Hovered and selected chain. Single owner; ids are kept even if the
/// chain disappears from a later frame, in which case lookups yield `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<String>,
    hovered: Option<String>,
}

impl SelectionState {
    /// Nothing selected or hovered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `chain_id`.
    pub fn select(&mut self, chain_id: impl Into<String>) {
        self.selected = Some(chain_id.into());
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Mark `chain_id` as hovered.
    pub fn hover(&mut self, chain_id: impl Into<String>) {
        self.hovered = Some(chain_id.into());
    }

    /// Clear the hover.
    pub fn unhover(&mut self) {
        self.hovered = None;
    }

    /// Clear both (on trajectory load).
    pub fn reset(&mut self) {
        self.selected = None;
        self.hovered = None;
    }

    /// Apply a UI event.
    pub fn apply(&mut self, event: SelectionEvent) {
        match event {
            SelectionEvent::Select(id) => self.select(id),
            SelectionEvent::Deselect => self.deselect(),
            SelectionEvent::Hover(id) => self.hover(id),
            SelectionEvent::Unhover => self.unhover(),
        }
    }

    /// Selected chain id.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Hovered chain id.
    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Info for the selected chain, if it exists in `groups`.
    #[must_use]
    pub fn selected_info<'a>(&self, groups: &'a ChainGroups) -> Option<&'a ChainInfo> {
        self.selected.as_deref().and_then(|id| groups.get(id))
    }

    /// Info for the hovered chain, if it exists in `groups`.
    #[must_use]
    pub fn hovered_info<'a>(&self, groups: &'a ChainGroups) -> Option<&'a ChainInfo> {
        self.hovered.as_deref().and_then(|id| groups.get(id))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::selection::compute_groups;
    use crate::trajectory::Particle;

    fn groups(chains: &[&str]) -> ChainGroups {
        let frame: Vec<_> = chains
            .iter()
            .map(|c| Particle {
                position: Vec3::ZERO,
                element: "C".into(),
                name: "CA".into(),
                chain: (*c).into(),
                residue: "ALA".into(),
                residue_index: Some(1),
                color: [1.0; 3],
            })
            .collect();
        compute_groups(&frame)
    }

    #[test]
    fn events_update_state() {
        let mut state = SelectionState::new();
        state.apply(SelectionEvent::Select("A".into()));
        state.apply(SelectionEvent::Hover("B".into()));
        assert_eq!(state.selected(), Some("A"));
        assert_eq!(state.hovered(), Some("B"));

        state.apply(SelectionEvent::Unhover);
        assert_eq!(state.hovered(), None);
        state.apply(SelectionEvent::Deselect);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn lookups_resolve_against_groups() {
        let g = groups(&["A", "A", "B"]);
        let mut state = SelectionState::new();
        state.select("A");
        state.hover("B");
        assert_eq!(state.selected_info(&g).map(|c| c.atom_count), Some(2));
        assert_eq!(state.hovered_info(&g).map(|c| c.atom_count), Some(1));
    }

    #[test]
    fn vanished_chain_stays_selected_but_resolves_to_none() {
        let mut state = SelectionState::new();
        state.select("B");
        let later = groups(&["A"]);
        assert_eq!(state.selected(), Some("B"));
        assert!(state.selected_info(&later).is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = SelectionState::new();
        state.select("A");
        state.hover("A");
        state.reset();
        assert_eq!(state, SelectionState::default());
    }
}
