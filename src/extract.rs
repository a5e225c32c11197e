//! Marker extraction for single checklist lines.
//!
//! A checklist line looks like
//! `- [ ] Pack bags #travel 🆔 t2 ⛔ t1 ⏳ 2024-05-01 🛫 2024-04-28 ^pack`.
//! Markers are pulled out in a fixed order (tags, identifiers, dates) and
//! each stage strips what it consumed, so a later stage never re-matches text
//! an earlier stage already claimed. Whatever is left becomes the display text.

use chrono::NaiveDate;
use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Compiled marker patterns, shared by every call.
struct MarkerPatterns {
    checklist: Regex,
    tag: Regex,
    id: Regex,
    blocker: Regex,
    scheduled: Regex,
    start: Regex,
    block_id: Regex,
    outlink: Regex,
    spaces: Regex,
}

static PATTERNS: LazyLock<MarkerPatterns> = LazyLock::new(|| MarkerPatterns {
    checklist: Regex::new(r"^([ \t]*)[-*+] \[([^\]])\](?:[ \t]+(.*))?$").expect("checklist pattern"),
    tag: Regex::new(r"(^|\s)(#[^\s#][^\s]*)").expect("tag pattern"),
    // Emoji markers may carry a trailing variation selector.
    id: Regex::new("🆔\u{fe0f}?\\s*([A-Za-z0-9_-]+)").expect("id pattern"),
    blocker: Regex::new("⛔\u{fe0f}?\\s*([A-Za-z0-9_,-]+)").expect("blocker pattern"),
    scheduled: Regex::new("⏳\u{fe0f}?\\s*(\\d{4}-\\d{2}-\\d{2})").expect("scheduled pattern"),
    start: Regex::new("🛫\u{fe0f}?\\s*(\\d{4}-\\d{2}-\\d{2})").expect("start pattern"),
    block_id: Regex::new(r"(^|\s)\^([A-Za-z0-9-]+)\s*$").expect("block id pattern"),
    outlink: Regex::new(r"\[\[[^\]|#]*#\^([A-Za-z0-9-]+)(?:\|[^\]]*)?\]\]").expect("outlink pattern"),
    spaces: Regex::new(r"\s{2,}").expect("whitespace pattern"),
});

/// Fields extracted from one checklist line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedTask {
    pub completed: bool,
    pub text: String,
    pub tags: BTreeSet<String>,
    pub id: Option<String>,
    pub blockers: BTreeSet<String>,
    pub scheduled: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub block_id: Option<String>,
    pub outlinks: BTreeSet<String>,
}

/// A recognized checklist line together with its raw indentation width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLine {
    /// Leading whitespace measured in characters; tabs count as one.
    pub indent: usize,
    pub task: ExtractedTask,
}

/// Extract a task from `line`, or `None` when the line is not a checklist item.
pub fn extract_line(line: &str) -> Option<ChecklistLine> {
    let p = &*PATTERNS;
    let caps = p.checklist.captures(line)?;
    let indent = caps.get(1).map_or(0, |m| m.as_str().chars().count());
    let status = caps.get(2)?.as_str();
    let content = caps.get(3).map_or("", |m| m.as_str());

    let mut task = ExtractedTask {
        completed: status != " ",
        ..ExtractedTask::default()
    };

    let content = strip_tags(content, &mut task.tags);
    let content = strip_identifiers(&content, &mut task);
    let content = strip_dates(&content, &mut task);
    task.text = p.spaces.replace_all(content.trim(), " ").into_owned();

    Some(ChecklistLine { indent, task })
}

fn strip_tags(content: &str, tags: &mut BTreeSet<String>) -> String {
    let p = &*PATTERNS;
    for caps in p.tag.captures_iter(content) {
        if let Some(tag) = caps.get(2) {
            tags.insert(tag.as_str().to_lowercase());
        }
    }
    p.tag.replace_all(content, "${1}").into_owned()
}

fn strip_identifiers(content: &str, task: &mut ExtractedTask) -> String {
    let p = &*PATTERNS;

    // Only the first id marker counts; repeats are dropped from the text.
    task.id = p
        .id
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let content = p.id.replace_all(content, "");

    for caps in p.blocker.captures_iter(&content) {
        if let Some(list) = caps.get(1) {
            task.blockers.extend(
                list.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            );
        }
    }
    let content = p.blocker.replace_all(&content, "");

    for caps in p.outlink.captures_iter(&content) {
        if let Some(block) = caps.get(1) {
            task.outlinks.insert(block.as_str().to_string());
        }
    }

    task.block_id = p
        .block_id
        .captures(&content)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string());
    p.block_id.replace(&content, "${1}").into_owned()
}

fn strip_dates(content: &str, task: &mut ExtractedTask) -> String {
    let p = &*PATTERNS;
    let (content, scheduled) = take_date(&p.scheduled, content);
    let (content, start) = take_date(&p.start, &content);
    task.scheduled = scheduled;
    task.start = start;
    content
}

/// Remove the first well-formed date marker matched by `pattern`.
/// A marker whose payload is not a real calendar date stays in the text.
fn take_date(pattern: &Regex, content: &str) -> (String, Option<NaiveDate>) {
    let Some(caps) = pattern.captures(content) else {
        return (content.to_string(), None);
    };
    let (Some(whole), Some(payload)) = (caps.get(0), caps.get(1)) else {
        return (content.to_string(), None);
    };
    match NaiveDate::parse_from_str(payload.as_str(), "%Y-%m-%d") {
        Ok(date) => {
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..whole.start()]);
            out.push_str(&content[whole.end()..]);
            (out, Some(date))
        }
        Err(_) => (content.to_string(), None),
    }
}
