//! Structured-field extraction from narrative text.
//!
//! The model embeds game-state deltas as tagged lines inside free-form
//! prose (`LOCATION: SALOON`, `ACQUIRED_ITEMS: [gold coin, revolver]`).
//! This module recovers those fields tolerantly and strips the tag lines
//! so the remaining text is clean story content for display.
//!
//! The grammar is table-driven: each recognized tag is a [`TagRule`] row
//! pairing a keyword with a value shape and an apply function, so adding
//! a new tagged field is a data change.

use crate::error::DecisionError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Side-channel game-state deltas parsed from narrative text.
///
/// Every field is optional or default-empty; absence is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeUpdate {
    /// New location, if the narration moved the player.
    pub location_change: Option<String>,

    /// Items gained. Duplicates preserved; callers dedupe if needed.
    pub acquired_items: Vec<String>,

    /// Items lost or spent.
    pub removed_items: Vec<String>,

    /// Whether the narration triggered combat.
    pub combat_triggered: bool,

    /// Free-text descriptor of the opponent, when combat was triggered.
    pub opponent: Option<String>,

    /// Short follow-up actions the model suggests to the player.
    pub suggested_actions: Vec<String>,
}

impl NarrativeUpdate {
    /// True when no field carries any data.
    pub fn is_empty(&self) -> bool {
        self.location_change.is_none()
            && self.acquired_items.is_empty()
            && self.removed_items.is_empty()
            && !self.combat_triggered
            && self.suggested_actions.is_empty()
    }
}

/// A malformed tag field, scoped to the single tag that failed.
///
/// One bad field never voids the rest of the update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {tag} field: {reason}")]
pub struct TagError {
    pub tag: &'static str,
    pub reason: String,
}

impl From<TagError> for DecisionError {
    fn from(err: TagError) -> Self {
        DecisionError::Parsing(err.to_string())
    }
}

/// Result of a field-extraction pass.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub update: NarrativeUpdate,
    pub errors: Vec<TagError>,
}

/// Caller-owned record of which metadata lines were stripped from prose.
///
/// Constructed per caller; there is deliberately no process-wide instance,
/// so independent sessions (and tests) never observe each other's history.
#[derive(Debug, Clone, Default)]
pub struct CleanupLog {
    removed: Vec<String>,
}

impl CleanupLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines removed so far, in document order.
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    fn record(&mut self, line: &str) {
        self.removed.push(line.to_string());
    }
}

// ============================================================================
// Tag grammar
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum ValueShape {
    /// Free text up to end of line.
    Line,
    /// Bracketed or bare comma-separated list on one line.
    ItemList,
    /// Bracketed list that may span multiple lines.
    MultilineList,
}

/// Parsed value handed to a rule's apply function. `None` means the tag
/// was present with empty content.
enum TagValue {
    Text(String),
    List(Vec<String>),
}

struct TagRule {
    keyword: &'static str,
    shape: ValueShape,
    apply: fn(&mut NarrativeUpdate, Option<TagValue>),
}

const TAG_RULES: &[TagRule] = &[
    TagRule {
        keyword: "LOCATION",
        shape: ValueShape::Line,
        apply: apply_location,
    },
    TagRule {
        keyword: "ACQUIRED_ITEMS",
        shape: ValueShape::ItemList,
        apply: apply_acquired_items,
    },
    TagRule {
        keyword: "REMOVED_ITEMS",
        shape: ValueShape::ItemList,
        apply: apply_removed_items,
    },
    TagRule {
        keyword: "SUGGESTED_ACTIONS",
        shape: ValueShape::MultilineList,
        apply: apply_suggested_actions,
    },
    TagRule {
        keyword: "COMBAT",
        shape: ValueShape::Line,
        apply: apply_combat,
    },
];

fn apply_location(update: &mut NarrativeUpdate, value: Option<TagValue>) {
    if let Some(TagValue::Text(text)) = value {
        update.location_change = Some(text);
    }
}

fn apply_acquired_items(update: &mut NarrativeUpdate, value: Option<TagValue>) {
    if let Some(TagValue::List(items)) = value {
        update.acquired_items.extend(items);
    }
}

fn apply_removed_items(update: &mut NarrativeUpdate, value: Option<TagValue>) {
    if let Some(TagValue::List(items)) = value {
        update.removed_items.extend(items);
    }
}

fn apply_suggested_actions(update: &mut NarrativeUpdate, value: Option<TagValue>) {
    if let Some(TagValue::List(items)) = value {
        update.suggested_actions.extend(items);
    }
}

fn apply_combat(update: &mut NarrativeUpdate, value: Option<TagValue>) {
    // Presence of the tag alone is the combat signal; the text, when
    // there is any, names the opponent.
    update.combat_triggered = true;
    if let Some(TagValue::Text(text)) = value {
        update.opponent = Some(text);
    }
}

// ============================================================================
// Scanning
// ============================================================================

/// Extract all recognized tagged fields from narrative text.
///
/// Missing tags are not errors; defaults apply. A tag whose content cannot
/// be tokenized (e.g. an unterminated bracketed list) yields a [`TagError`]
/// for that field alone while the others still extract.
pub fn extract_fields(text: &str) -> Extraction {
    let scan = scan(text);
    Extraction {
        update: scan.update,
        errors: scan.errors,
    }
}

/// Strip every recognized metadata line from the text.
///
/// Untouched prose is copied byte-for-byte, so stripping an
/// already-stripped string yields the identical string.
pub fn strip_metadata(text: &str) -> String {
    let mut log = CleanupLog::new();
    strip_metadata_logged(text, &mut log)
}

/// Strip metadata lines, recording each removed line in the given log.
pub fn strip_metadata_logged(text: &str, log: &mut CleanupLog) -> String {
    let scan = scan(text);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in &scan.consumed {
        out.push_str(&text[cursor..range.start]);
        log.record(line_content(&text[range.clone()]));
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

struct Scan {
    update: NarrativeUpdate,
    errors: Vec<TagError>,
    /// Byte ranges of consumed lines (including terminators), ascending.
    consumed: Vec<Range<usize>>,
}

fn scan(text: &str) -> Scan {
    let mut update = NarrativeUpdate::default();
    let mut errors = Vec::new();
    let mut consumed = Vec::new();

    let lines = line_spans(text);
    let mut i = 0;
    while i < lines.len() {
        let content = line_content(&text[lines[i].clone()]);
        let Some((rule, value)) = match_tag(content) else {
            i += 1;
            continue;
        };

        let value = value.trim();
        match rule.shape {
            ValueShape::Line => {
                let parsed = (!value.is_empty()).then(|| TagValue::Text(value.to_string()));
                (rule.apply)(&mut update, parsed);
                consumed.push(lines[i].clone());
                i += 1;
            }
            ValueShape::ItemList => {
                match parse_item_list(value) {
                    Ok(parsed) => (rule.apply)(&mut update, parsed),
                    Err(reason) => errors.push(TagError {
                        tag: rule.keyword,
                        reason,
                    }),
                }
                consumed.push(lines[i].clone());
                i += 1;
            }
            ValueShape::MultilineList => {
                i = scan_multiline_list(
                    text, &lines, i, rule, value, &mut update, &mut errors, &mut consumed,
                );
            }
        }
    }

    Scan {
        update,
        errors,
        consumed,
    }
}

/// Parse a single-line list value: `[a, b]` or a bare `a, b` line.
fn parse_item_list(value: &str) -> Result<Option<TagValue>, String> {
    if value.is_empty() {
        return Ok(None);
    }

    let inner = if let Some(rest) = value.strip_prefix('[') {
        match rest.find(']') {
            Some(end) => &rest[..end],
            None => return Err("unterminated bracketed list".to_string()),
        }
    } else {
        value
    };

    let items = split_items(inner);
    Ok((!items.is_empty()).then_some(TagValue::List(items)))
}

/// Handle a bracketed list that may span multiple lines. Returns the index
/// of the next unconsumed line.
#[allow(clippy::too_many_arguments)]
fn scan_multiline_list(
    text: &str,
    lines: &[Range<usize>],
    start: usize,
    rule: &TagRule,
    value: &str,
    update: &mut NarrativeUpdate,
    errors: &mut Vec<TagError>,
    consumed: &mut Vec<Range<usize>>,
) -> usize {
    // Single-line forms (including empty and bare lists) share the
    // item-list path.
    if value.is_empty() || !value.starts_with('[') || value.contains(']') {
        match parse_item_list(value) {
            Ok(parsed) => (rule.apply)(update, parsed),
            Err(reason) => errors.push(TagError {
                tag: rule.keyword,
                reason,
            }),
        }
        consumed.push(lines[start].clone());
        return start + 1;
    }

    // Opening bracket without a close on this line: gather until one
    // appears. An unterminated list consumes to end of input so the
    // malformed region never leaks into display prose.
    let mut inner = value[1..].to_string();
    let mut next = start + 1;
    let mut terminated = false;
    while next < lines.len() {
        let content = line_content(&text[lines[next].clone()]);
        next += 1;
        if let Some(end) = content.find(']') {
            inner.push('\n');
            inner.push_str(&content[..end]);
            terminated = true;
            break;
        }
        inner.push('\n');
        inner.push_str(content);
    }

    consumed.extend(lines[start..next].iter().cloned());

    if terminated {
        let items = split_multiline_items(&inner);
        (rule.apply)(update, (!items.is_empty()).then_some(TagValue::List(items)));
    } else {
        errors.push(TagError {
            tag: rule.keyword,
            reason: "unterminated bracketed list".to_string(),
        });
    }
    next
}

fn match_tag(content: &str) -> Option<(&'static TagRule, &str)> {
    let trimmed = content.trim_start();
    for rule in TAG_RULES {
        if let Some(rest) = trimmed.strip_prefix(rule.keyword) {
            if let Some(value) = rest.strip_prefix(':') {
                return Some((rule, value));
            }
        }
    }
    None
}

fn split_items(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Like [`split_items`] but collapses whitespace (including the embedded
/// newlines a multi-line list carries) inside each item.
fn split_multiline_items(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Byte ranges of each line, terminators included.
fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            spans.push(start..idx + 1);
            start = idx + 1;
        }
    }
    if start < text.len() {
        spans.push(start..text.len());
    }
    spans
}

fn line_content(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}
