use crate::parser::tokenize;
use crate::types::{Item, ItemId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Position of the cursor within the current match set, 1-based for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPosition {
    pub id: ItemId,
    pub ordinal: usize,
    pub total: usize,
}

/// Cyclic navigation through the items that contain a selected tag
#[derive(Debug, Clone, Default)]
pub struct MatchNavigator {
    selected_tag: Option<String>,
    matches: Vec<ItemId>,
    cursor: usize,
}

impl MatchNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a tag. Returns `None` and keeps the previous state when no item matches.
    pub fn select(&mut self, tag: &str, items: &[Item]) -> Option<MatchPosition> {
        let matches: Vec<ItemId> = items
            .iter()
            .filter(|item| tokenize(&item.caption).contains(&tag))
            .map(|item| item.id.clone())
            .collect();

        if matches.is_empty() {
            log::debug!("No items contain tag {tag:?}");
            return None;
        }

        self.selected_tag = Some(tag.to_string());
        self.matches = matches;
        self.cursor = 0;
        self.current()
    }

    pub fn next(&mut self) -> Option<MatchPosition> {
        self.step(1)
    }

    pub fn prev(&mut self) -> Option<MatchPosition> {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Option<MatchPosition> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let len = len as isize;
        self.cursor = ((self.cursor as isize + delta + len) % len) as usize;
        self.current()
    }

    pub fn current(&self) -> Option<MatchPosition> {
        self.matches.get(self.cursor).map(|id| MatchPosition {
            id: id.clone(),
            ordinal: self.cursor + 1,
            total: self.matches.len(),
        })
    }

    pub fn selected_tag(&self) -> Option<&str> {
        self.selected_tag.as_deref()
    }

    pub fn matches(&self) -> &[ItemId] {
        &self.matches
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Drop a removed item from the match set, keeping the cursor on the same item when possible
    pub fn forget(&mut self, id: &ItemId) {
        let Some(pos) = self.matches.iter().position(|m| m == id) else {
            return;
        };
        self.matches.remove(pos);
        if self.matches.is_empty() {
            self.clear();
            return;
        }
        if pos < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.matches.len() {
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        self.selected_tag = None;
        self.matches.clear();
        self.cursor = 0;
    }
}

/// Byte range of the first occurrence of `tag` in `caption`, for highlighting
pub fn highlight_range(caption: &str, tag: &str) -> Option<Range<usize>> {
    if tag.is_empty() {
        return None;
    }
    caption.find(tag).map(|start| start..start + tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collection() -> Vec<Item> {
        vec![
            Item::new("A", "a.png", "x, cat"),
            Item::new("B", "b.png", "dog, x"),
            Item::new("skip", "s.png", "xx, box"),
            Item::new("C", "c.png", " x "),
        ]
    }

    #[test]
    fn select_collects_exact_token_matches_in_order() {
        let mut nav = MatchNavigator::new();
        let first = nav.select("x", &collection()).unwrap();
        assert_eq!(first.id, ItemId::new("A"));
        assert_eq!((first.ordinal, first.total), (1, 3));
        assert_eq!(
            nav.matches(),
            &[ItemId::new("A"), ItemId::new("B"), ItemId::new("C")]
        );
    }

    #[test]
    fn next_wraps_around() {
        let mut nav = MatchNavigator::new();
        nav.select("x", &collection());
        nav.next();
        nav.next();
        let back = nav.next().unwrap();
        assert_eq!(back.id, ItemId::new("A"));
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn prev_from_start_goes_to_last() {
        let mut nav = MatchNavigator::new();
        nav.select("x", &collection());
        let last = nav.prev().unwrap();
        assert_eq!(nav.cursor(), 2);
        assert_eq!(last.id, ItemId::new("C"));
        assert_eq!(last.ordinal, 3);
    }

    #[test]
    fn no_match_keeps_previous_state() {
        let mut nav = MatchNavigator::new();
        nav.select("x", &collection());
        nav.next();
        assert!(nav.select("missing", &collection()).is_none());
        assert_eq!(nav.selected_tag(), Some("x"));
        assert_eq!(nav.cursor(), 1);
    }

    #[test]
    fn stepping_empty_navigator_is_noop() {
        let mut nav = MatchNavigator::new();
        assert!(nav.next().is_none());
        assert!(nav.prev().is_none());
        assert!(nav.current().is_none());
    }

    #[test]
    fn forget_keeps_cursor_on_same_item() {
        let mut nav = MatchNavigator::new();
        nav.select("x", &collection());
        nav.next();
        nav.next();
        nav.forget(&ItemId::new("A"));
        assert_eq!(nav.current().unwrap().id, ItemId::new("C"));

        nav.forget(&ItemId::new("C"));
        assert_eq!(nav.current().unwrap().id, ItemId::new("B"));

        nav.forget(&ItemId::new("B"));
        assert!(nav.is_empty());
        assert_eq!(nav.selected_tag(), None);
    }

    #[test]
    fn highlight_finds_first_occurrence() {
        assert_eq!(highlight_range("a cat, cat", "cat"), Some(2..5));
        assert_eq!(highlight_range("dog", "cat"), None);
        assert_eq!(highlight_range("dog", ""), None);
    }
}
