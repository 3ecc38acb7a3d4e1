//! Focus, multi-select and navigation over the active record set

use std::collections::BTreeSet;

/// Modifier held while clicking a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// No modifier: single selection
    Plain,
    /// Shift: contiguous range from the anchor
    Range,
    /// Ctrl/Cmd: flip one index
    Toggle,
}

/// Where a rating command was issued from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    Viewer,
}

/// Selection state of one session.
///
/// `current` is always a valid index while the record set is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    len: usize,
    current: usize,
    anchor: Option<usize>,
    selected: BTreeSet<usize>,
}

impl Selection {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Focused index, `None` for an empty record set
    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.current)
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Apply a click on `index`. Out-of-range clicks are ignored.
    pub fn click(&mut self, index: usize, mode: ClickMode) {
        if index >= self.len {
            return;
        }
        match mode {
            ClickMode::Plain => {
                self.selected.clear();
                self.anchor = Some(index);
            }
            ClickMode::Range => {
                // Without an anchor the range starts at the focused record
                let pivot = self.anchor.unwrap_or(self.current);
                let (lo, hi) = (pivot.min(index), pivot.max(index));
                self.selected = (lo..=hi).collect();
            }
            ClickMode::Toggle => {
                if !self.selected.remove(&index) {
                    self.selected.insert(index);
                }
                self.anchor = Some(index);
            }
        }
        self.current = index;
    }

    /// Advance focus, wrapping from the last record to the first
    pub fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.current = (self.current + 1) % self.len;
        Some(self.current)
    }

    /// Step focus back, wrapping from the first record to the last
    pub fn prev(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.current = (self.current + self.len - 1) % self.len;
        Some(self.current)
    }

    /// Circular neighbours of the focused record (previous, next)
    pub fn neighbours(&self) -> Option<(usize, usize)> {
        if self.len == 0 {
            return None;
        }
        Some((
            (self.current + self.len - 1) % self.len,
            (self.current + 1) % self.len,
        ))
    }

    /// Indices a rating command applies to
    pub fn targets(&self, view: ViewMode) -> Vec<usize> {
        match (view, self.current()) {
            (_, None) => Vec::new(),
            (ViewMode::Grid, Some(_)) if !self.selected.is_empty() => {
                self.selected.iter().copied().collect()
            }
            (_, Some(current)) => vec![current],
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_click_resets() {
        let mut sel = Selection::new(10);
        sel.click(2, ClickMode::Toggle);
        sel.click(4, ClickMode::Toggle);
        sel.click(7, ClickMode::Plain);
        assert!(sel.selected().is_empty());
        assert_eq!(sel.current(), Some(7));
        assert_eq!(sel.anchor(), Some(7));
    }

    #[test]
    fn test_range_is_order_independent() {
        for (a, b) in [(2, 6), (6, 2), (4, 4)] {
            let mut sel = Selection::new(10);
            sel.click(a, ClickMode::Plain);
            sel.click(b, ClickMode::Range);
            let expected: BTreeSet<usize> = (a.min(b)..=a.max(b)).collect();
            assert_eq!(sel.selected(), &expected);
            assert_eq!(sel.current(), Some(b));
            assert_eq!(sel.anchor(), Some(a));
        }
    }

    #[test]
    fn test_range_replaces_previous_range() {
        let mut sel = Selection::new(10);
        sel.click(5, ClickMode::Plain);
        sel.click(8, ClickMode::Range);
        sel.click(3, ClickMode::Range);
        assert_eq!(sel.selected().iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_range_without_anchor_starts_at_focus() {
        let mut sel = Selection::new(10);
        sel.next();
        sel.next();
        sel.click(4, ClickMode::Range);
        assert_eq!(sel.selected().iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(sel.anchor(), None);
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut sel = Selection::new(5);
        sel.click(1, ClickMode::Toggle);
        sel.click(3, ClickMode::Toggle);
        assert!(sel.is_selected(1) && sel.is_selected(3));
        sel.click(1, ClickMode::Toggle);
        assert!(!sel.is_selected(1));
        assert_eq!(sel.anchor(), Some(1));
        assert_eq!(sel.current(), Some(1));
    }

    #[test]
    fn test_navigation_wraps_and_keeps_selection() {
        let mut sel = Selection::new(3);
        sel.click(1, ClickMode::Toggle);
        assert_eq!(sel.prev(), Some(0));
        assert_eq!(sel.prev(), Some(2));
        assert_eq!(sel.next(), Some(0));
        assert_eq!(sel.prev(), Some(2));
        assert_eq!(sel.next(), Some(0));
        assert!(sel.is_selected(1));
    }

    #[test]
    fn test_targets_per_view() {
        let mut sel = Selection::new(6);
        sel.click(4, ClickMode::Plain);
        assert_eq!(sel.targets(ViewMode::Grid), vec![4]);

        sel.click(1, ClickMode::Range);
        assert_eq!(sel.targets(ViewMode::Grid), vec![1, 2, 3, 4]);
        // The viewer only ever rates the focused record
        assert_eq!(sel.targets(ViewMode::Viewer), vec![1]);
    }

    #[test]
    fn test_empty_set() {
        let mut sel = Selection::new(0);
        assert_eq!(sel.current(), None);
        assert_eq!(sel.next(), None);
        assert_eq!(sel.prev(), None);
        sel.click(0, ClickMode::Plain);
        assert!(sel.targets(ViewMode::Grid).is_empty());
    }

    #[test]
    fn test_neighbours() {
        let mut sel = Selection::new(4);
        assert_eq!(sel.neighbours(), Some((3, 1)));
        assert_eq!(sel.prev(), Some(3));
        assert_eq!(sel.neighbours(), Some((2, 0)));
        assert_eq!(Selection::new(1).neighbours(), Some((0, 0)));
    }
}
