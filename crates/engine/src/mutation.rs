//! Bulk caption rewriting.
//!
//! Every operation is planned against a snapshot of the collection before
//! anything is written. Planning is pure: it validates input, compiles any
//! pattern, and computes the new caption of every item that changes. A bad
//! pattern therefore aborts the whole operation with nothing modified.
//!
//! Tag operations (delete, rename) rebuild captions from tokens. Free-text
//! operations (replace, insert, delete text) edit the raw caption; deleting
//! text repairs the comma separators afterwards.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::parser::{append_segment_with, join_with, repair_separators, tokenize};
use crate::pattern::PatternSpec;
use crate::types::{Item, ItemId};
use serde::{Deserialize, Serialize};

/// Where inserted text goes relative to the first match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Prepend,
    Append,
}

/// A bulk caption operation over the whole collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Remove every token equal to `tag`
    DeleteTag { tag: String },

    /// Replace the first token equal to `old` with `new`
    RenameTag { old: String, new: String },

    /// Replace every match of `pattern`; `replacement` may reference groups (`$1`)
    SearchReplace {
        pattern: PatternSpec,
        replacement: String,
    },

    /// Insert `text` next to the first match of `target`
    InsertAtMatch {
        target: PatternSpec,
        text: String,
        position: InsertPosition,
        #[serde(default)]
        only_if_absent: bool,
    },

    /// Delete every match of `target`; literal targets only match whole words
    DeleteText { target: PatternSpec },

    /// Append `text` as a new segment of every caption
    AppendCaption { text: String },
}

impl Operation {
    /// Short, stable name used in logs and reports
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeleteTag { .. } => "delete_tag",
            Self::RenameTag { .. } => "rename_tag",
            Self::SearchReplace { .. } => "search_replace",
            Self::InsertAtMatch { .. } => "insert_at_match",
            Self::DeleteText { .. } => "delete_text",
            Self::AppendCaption { .. } => "append_caption",
        }
    }
}

/// The planned change to one caption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionEdit {
    pub id: ItemId,
    pub before: String,
    pub after: String,
    /// Matches of the target in this caption
    pub occurrences: usize,
}

/// Result of planning an operation against a collection snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationPlan {
    /// Items that contain the target (or all items for append)
    pub eligible: usize,

    /// Total matches across all eligible items
    pub occurrences: usize,

    /// Only the items whose caption actually changes
    pub edits: Vec<CaptionEdit>,
}

impl MutationPlan {
    fn record(&mut self, item: &Item, after: String, occurrences: usize) {
        self.eligible += 1;
        self.occurrences += occurrences;
        if after != item.caption {
            self.edits.push(CaptionEdit {
                id: item.id.clone(),
                before: item.caption.clone(),
                after,
                occurrences,
            });
        }
    }
}

/// Plan an operation over `items` without touching any store
pub fn plan(operation: &Operation, items: &[Item], config: &EngineConfig) -> Result<MutationPlan> {
    let plan = match operation {
        Operation::DeleteTag { tag } => plan_delete_tag(tag, items, config)?,
        Operation::RenameTag { old, new } => plan_rename_tag(old, new, items, config)?,
        Operation::SearchReplace {
            pattern,
            replacement,
        } => plan_search_replace(pattern, replacement, items)?,
        Operation::InsertAtMatch {
            target,
            text,
            position,
            only_if_absent,
        } => plan_insert_at_match(target, text, *position, *only_if_absent, items, config)?,
        Operation::DeleteText { target } => plan_delete_text(target, items)?,
        Operation::AppendCaption { text } => plan_append_caption(text, items, config)?,
    };

    log::debug!(
        "Planned {}: {} eligible, {} occurrences, {} edits",
        operation.name(),
        plan.eligible,
        plan.occurrences,
        plan.edits.len()
    );
    Ok(plan)
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MissingInput(field));
    }
    Ok(trimmed)
}

fn plan_delete_tag(tag: &str, items: &[Item], config: &EngineConfig) -> Result<MutationPlan> {
    let tag = required(tag, "tag")?;
    let mut plan = MutationPlan::default();

    for item in items {
        let tokens = tokenize(&item.caption);
        let kept: Vec<&str> = tokens.iter().copied().filter(|token| *token != tag).collect();
        let removed = tokens.len() - kept.len();
        if removed == 0 {
            continue;
        }
        plan.record(item, join_with(&kept, &config.join_separator), removed);
    }

    Ok(plan)
}

fn plan_rename_tag(
    old: &str,
    new: &str,
    items: &[Item],
    config: &EngineConfig,
) -> Result<MutationPlan> {
    let old = required(old, "old tag")?;
    let new = required(new, "new tag")?;

    let mut plan = MutationPlan::default();
    for item in items {
        let mut tokens = tokenize(&item.caption);
        let Some(position) = tokens.iter().position(|token| *token == old) else {
            continue;
        };
        // renaming to itself never rewrites the caption
        if old == new {
            plan.record(item, item.caption.clone(), 1);
            continue;
        }
        tokens[position] = new;
        plan.record(item, join_with(&tokens, &config.join_separator), 1);
    }

    Ok(plan)
}

fn plan_search_replace(
    pattern: &PatternSpec,
    replacement: &str,
    items: &[Item],
) -> Result<MutationPlan> {
    let regex = pattern.compile()?;
    let replacement = expand_group_refs(replacement);
    let mut plan = MutationPlan::default();

    for item in items {
        let matches = regex.find_iter(&item.caption).count();
        if matches == 0 {
            continue;
        }
        let after = regex
            .replace_all(&item.caption, replacement.as_str())
            .into_owned();
        plan.record(item, after, matches);
    }

    Ok(plan)
}

/// Brace numbered group references that run into a word character.
///
/// The regex crate reads `$1_hair` as a group named `1_hair`; captions are
/// written expecting group 1 followed by `_hair`, so it becomes `${1}_hair`.
fn expand_group_refs(replacement: &str) -> String {
    let bytes = replacement.as_bytes();
    let mut out = String::with_capacity(replacement.len() + 4);
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] != b'$' {
            let next = replacement[idx..]
                .find('$')
                .map_or(replacement.len(), |offset| idx + offset);
            out.push_str(&replacement[idx..next]);
            idx = next;
            continue;
        }
        if bytes.get(idx + 1) == Some(&b'$') {
            out.push_str("$$");
            idx += 2;
            continue;
        }

        let digits_end = bytes[idx + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |offset| idx + 1 + offset);
        let has_digits = digits_end > idx + 1;
        let runs_on = bytes
            .get(digits_end)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_');
        if has_digits && runs_on {
            out.push_str("${");
            out.push_str(&replacement[idx + 1..digits_end]);
            out.push('}');
        } else {
            out.push_str(&replacement[idx..digits_end]);
        }
        idx = digits_end;
    }

    out
}

fn plan_insert_at_match(
    target: &PatternSpec,
    text: &str,
    position: InsertPosition,
    only_if_absent: bool,
    items: &[Item],
    config: &EngineConfig,
) -> Result<MutationPlan> {
    let regex = target.compile()?;
    let text = required(text, "text")?;
    let separator = config.insert_separator.as_str();
    let mut plan = MutationPlan::default();

    for item in items {
        let caption = item.caption.as_str();
        let Some(found) = regex.find(caption) else {
            continue;
        };

        let (head, tail) = match position {
            InsertPosition::Prepend => caption.split_at(found.start()),
            InsertPosition::Append => caption.split_at(found.end()),
        };

        if only_if_absent && already_adjacent(head, tail, text, position) {
            plan.record(item, item.caption.clone(), 1);
            continue;
        }

        let after = match position {
            InsertPosition::Prepend => format!("{head}{text}{separator}{tail}"),
            InsertPosition::Append => format!("{head}{separator}{text}{tail}"),
        };
        plan.record(item, after, 1);
    }

    Ok(plan)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when `text` already sits directly on the insertion side of the match
/// as a whole word, not as the end or start of a longer one
fn already_adjacent(head: &str, tail: &str, text: &str, position: InsertPosition) -> bool {
    match position {
        InsertPosition::Prepend => head
            .trim_end()
            .strip_suffix(text)
            .is_some_and(|rest| !rest.chars().next_back().is_some_and(is_word_char)),
        InsertPosition::Append => tail
            .trim_start()
            .strip_prefix(text)
            .is_some_and(|rest| !rest.chars().next().is_some_and(is_word_char)),
    }
}

fn plan_delete_text(target: &PatternSpec, items: &[Item]) -> Result<MutationPlan> {
    let finder = target.compile()?;
    let deleter = target.compile_word_bounded()?;
    let mut plan = MutationPlan::default();

    for item in items {
        // literal candidates are picked by exact substring, regex ones by match
        let candidate = if target.use_regex {
            finder.is_match(&item.caption)
        } else {
            item.caption.contains(target.text.as_str())
        };
        if !candidate {
            continue;
        }
        let matches = deleter.find_iter(&item.caption).count();
        if matches == 0 {
            plan.record(item, item.caption.clone(), 0);
            continue;
        }
        let stripped = deleter.replace_all(&item.caption, regex::NoExpand(""));
        plan.record(item, repair_separators(&stripped), matches);
    }

    Ok(plan)
}

fn plan_append_caption(text: &str, items: &[Item], config: &EngineConfig) -> Result<MutationPlan> {
    let text = required(text, "text")?;
    let mut plan = MutationPlan::default();

    for item in items {
        let after = append_segment_with(&item.caption, text, &config.join_separator);
        plan.record(item, after, 1);
    }

    Ok(plan)
}
