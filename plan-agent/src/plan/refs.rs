//! Reference expression parsing and resolution
//!
//! A reference expression addresses part of a node's content:
//! `id:part[filter]` where `part` is `summary` or `info` and the optional
//! `filter` narrows `info` to one typed block (`llm`, `search`, `all`).
//! Comma-separated lists are supported. Parsing is tolerant of case and
//! surrounding whitespace; tokens that do not parse or that name an unknown
//! node are dropped silently so stale refs can never corrupt downstream
//! context.
//!
//! Resolution is total: an empty `info` falls back to the summary, an empty
//! summary falls back to the title, so early rounds (before any execution)
//! still hand the planner a non-empty signal.

use crate::plan::blocks::extract_info_block;
use crate::plan::types::{PlanDocument, PlanNode};

/// Which part of a node a reference selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPart {
    Summary,
    Info,
}

/// Filter on the `info` part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoFilter {
    Llm,
    Search,
    All,
}

/// A parsed reference expression
#[derive(Debug, Clone, PartialEq)]
pub struct RefExpr {
    /// Node id, lowercased for lookup
    pub node: String,
    pub part: RefPart,
    pub filter: InfoFilter,
}

/// A resolved reference: the original expression and the text it produced
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    pub expr: String,
    pub value: String,
}

/// Parse a single reference token. Returns `None` for anything that does not
/// fit the grammar; callers drop such tokens.
pub fn parse_ref(raw: &str) -> Option<RefExpr> {
    let s = raw.trim();
    let (id_part, rest) = s.split_once(':')?;
    let node = id_part.trim();
    if node.is_empty() || !node.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let rest = rest.trim_start();
    let part_end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let part = match rest[..part_end].to_ascii_lowercase().as_str() {
        "summary" => RefPart::Summary,
        "info" => RefPart::Info,
        _ => return None,
    };

    let mut filter = InfoFilter::All;
    let tail = rest[part_end..].trim_start();
    if let Some(tail) = tail.strip_prefix('[') {
        if let Some(end) = tail.find(']') {
            filter = match tail[..end].trim().to_ascii_lowercase().as_str() {
                "llm" => InfoFilter::Llm,
                "search" => InfoFilter::Search,
                // Unknown filters behave like no filter
                _ => InfoFilter::All,
            };
        }
    }

    Some(RefExpr {
        node: node.to_ascii_lowercase(),
        part,
        filter,
    })
}

/// Summary with title fallback
fn fallback_summary(node: &PlanNode) -> String {
    if node.summary.trim().is_empty() {
        node.title.clone()
    } else {
        node.summary.clone()
    }
}

fn resolve_expr(doc: &PlanDocument, expr: &RefExpr) -> Option<String> {
    let node = doc.find_node(&expr.node)?;
    let value = match expr.part {
        RefPart::Summary => fallback_summary(node),
        RefPart::Info => {
            let selected = match expr.filter {
                InfoFilter::Llm => extract_info_block(&node.info, "llm")
                    .map(str::to_string)
                    .unwrap_or_default(),
                InfoFilter::Search => extract_info_block(&node.info, "search")
                    .map(str::to_string)
                    .unwrap_or_default(),
                InfoFilter::All => node.info.clone(),
            };
            if selected.trim().is_empty() {
                fallback_summary(node)
            } else {
                selected
            }
        }
    };
    Some(value)
}

/// Resolve a list of reference tokens against the document, dropping any
/// token that does not parse or resolve.
pub fn resolve_refs(doc: &PlanDocument, refs: &[String]) -> Vec<ResolvedRef> {
    refs.iter()
        .filter_map(|raw| {
            let expr = parse_ref(raw)?;
            let value = resolve_expr(doc, &expr)?;
            Some(ResolvedRef {
                expr: raw.trim().to_string(),
                value,
            })
        })
        .collect()
}

/// Resolve a comma-separated reference list (a node's `p_node`)
pub fn resolve_ref_list(doc: &PlanDocument, list: &str) -> Vec<ResolvedRef> {
    let refs: Vec<String> = list
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    resolve_refs(doc, &refs)
}

/// Concatenate resolved parent references into executor context text
pub fn build_context(doc: &PlanDocument, p_node: &str) -> String {
    resolve_ref_list(doc, p_node)
        .into_iter()
        .map(|r| format!("# {}\n{}", r.expr, r.value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sanitize a planner-provided `p_node`: normalize separators and rewrite
/// `:title` references to `:summary` — title is not an addressable content
/// kind for downstream tasks.
pub fn sanitize_p_node(p_node: &str) -> String {
    p_node
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(rewrite_title_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

fn rewrite_title_ref(token: &str) -> String {
    let lower = token.to_ascii_lowercase();
    if let Some(pos) = lower.find(":title") {
        let after = pos + ":title".len();
        let bounded = lower[after..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        if bounded {
            return format!("{}:summary{}", &token[..pos], &token[after..]);
        }
    }
    token.to_string()
}

/// Resolve `NEW1..NEW3` placeholders in planner check-list entries to the
/// ids just assigned to this round's tasks. Entries whose placeholder has no
/// corresponding task are dropped rather than leaked into persisted state.
pub fn resolve_placeholders(entries: &[String], assigned_ids: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| resolve_placeholder(entry, assigned_ids))
        .filter(|s| !s.is_empty())
        .collect()
}

fn resolve_placeholder(entry: &str, assigned_ids: &[String]) -> Option<String> {
    let s = entry.trim();
    let lower = s.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("new") {
        let start = from + rel;
        from = start + "new".len();
        let digit_pos = start + "new".len();
        let digit = match bytes.get(digit_pos) {
            Some(b @ b'1'..=b'3') => (b - b'0') as usize,
            _ => continue,
        };
        // Word boundaries so that ids like "anew1x" are left alone
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }
        if let Some(next) = bytes.get(digit_pos + 1) {
            if next.is_ascii_alphanumeric() {
                continue;
            }
        }
        let id = assigned_ids.get(digit - 1)?;
        return Some(format!("{}{}{}", &s[..start], id, &s[digit_pos + 1..]));
    }
    Some(s.to_string())
}
