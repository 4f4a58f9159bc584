use crate::parser::{dedup_tokens, item_tags, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tag with the number of distinct items that contain it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

impl TagCount {
    pub fn new(tag: impl Into<String>, count: usize) -> Self {
        Self {
            tag: tag.into(),
            count,
        }
    }
}

/// Map from tag to the number of distinct items containing it.
///
/// Always rebuilt from the full caption set; there is no incremental update.
/// Never holds zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    counts: HashMap<String, usize>,
}

impl TagIndex {
    /// Build the index with the default minimum tag length of 2 characters
    pub fn recompute<'a, I>(captions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::recompute_with(captions, 2)
    }

    /// Build the index, skipping tags shorter than `min_tag_chars` characters
    pub fn recompute_with<'a, I>(captions: I, min_tag_chars: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for caption in captions {
            if caption.trim().is_empty() {
                continue;
            }
            let tokens = tokenize(caption);
            for tag in dedup_tokens(&tokens) {
                if tag.chars().count() < min_tag_chars {
                    continue;
                }
                *counts.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Build the index from explicit counts, dropping zero entries
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            counts: counts
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(tag, count)| (tag.into(), count))
                .collect(),
        }
    }

    /// Tags sorted by count descending, ties broken by ascending tag
    pub fn ranked(&self) -> Vec<TagCount> {
        let mut ranked: Vec<TagCount> = self
            .counts
            .iter()
            .map(|(tag, count)| TagCount::new(tag.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        ranked
    }

    /// Number of items containing the tag (0 when absent)
    pub fn count(&self, tag: &str) -> usize {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.counts.contains_key(tag)
    }

    /// Number of distinct tags
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Highest count in the index, never below 1
    pub fn max_count(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0).max(1)
    }

    /// Relative frequency of a tag in `[0, 1]`
    pub fn weight(&self, tag: &str) -> f32 {
        self.count(tag) as f32 / self.max_count() as f32
    }

    /// Unique tags of one caption with their collection-wide counts
    pub fn tags_for_item(&self, caption: &str) -> Vec<TagCount> {
        item_tags(caption)
            .into_iter()
            .map(|tag| TagCount::new(tag, self.count(tag)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn counts_each_item_once_per_tag() {
        let index = TagIndex::recompute(["cat, cat, dog", "cat", "dog, bird"]);
        assert_eq!(index.count("cat"), 2);
        assert_eq!(index.count("dog"), 2);
        assert_eq!(index.count("bird"), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn excludes_single_char_tags() {
        let index = TagIndex::recompute(["a, b, ok", " x , ok"]);
        assert_eq!(index.count("a"), 0);
        assert!(!index.contains("x"));
        assert_eq!(index.count("ok"), 2);
    }

    #[test]
    fn respects_custom_min_length() {
        let index = TagIndex::recompute_with(["ab, abc, abcd"], 3);
        assert!(!index.contains("ab"));
        assert!(index.contains("abc"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // one character, two bytes
        let index = TagIndex::recompute(["é, éé"]);
        assert!(!index.contains("é"));
        assert!(index.contains("éé"));
    }

    #[test]
    fn blank_captions_contribute_nothing() {
        let index = TagIndex::recompute(["", "   ", " , "]);
        assert!(index.is_empty());
        assert!(index.ranked().is_empty());
    }

    #[test]
    fn ranked_breaks_ties_by_tag() {
        let index = TagIndex::from_counts([("b", 2), ("a", 2), ("c", 1)]);
        assert_eq!(
            index.ranked(),
            vec![
                TagCount::new("a", 2),
                TagCount::new("b", 2),
                TagCount::new("c", 1)
            ]
        );
    }

    #[test]
    fn from_counts_drops_zero_entries() {
        let index = TagIndex::from_counts([("gone", 0), ("kept", 3)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.max_count(), 3);
    }

    #[test]
    fn weights_are_relative_to_max() {
        let index = TagIndex::recompute(["cat, dog", "cat", "cat, bird", "dog"]);
        assert_eq!(index.max_count(), 3);
        assert_eq!(index.weight("cat"), 1.0);
        assert!((index.weight("bird") - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(index.weight("missing"), 0.0);
        assert_eq!(TagIndex::default().max_count(), 1);
    }

    #[test]
    fn tags_for_item_reports_global_counts() {
        let index = TagIndex::recompute(["cat, dog", "cat, x"]);
        assert_eq!(
            index.tags_for_item("cat, x, cat"),
            vec![TagCount::new("cat", 2), TagCount::new("x", 0)]
        );
    }

    proptest! {
        #[test]
        fn proptest_recompute_is_order_independent(
            captions in proptest::collection::vec("[a-d]{1,3}(, [a-d]{1,3}){0,4}", 0..12),
            seed in any::<u64>(),
        ) {
            let forward = TagIndex::recompute(captions.iter().map(String::as_str));

            let mut shuffled = captions.clone();
            // deterministic Fisher-Yates driven by the seed
            let mut state = seed;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }
            let backward = TagIndex::recompute(shuffled.iter().map(String::as_str));

            prop_assert_eq!(forward.ranked(), backward.ranked());
        }
    }
}
