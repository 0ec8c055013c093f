//! Tagged-block extraction from executor payload text
//!
//! Executor agents return free text containing one `<summary>` block and
//! zero or more `<info type="...">` blocks. The scan is tolerant: prose
//! around the blocks and blocks of unknown type are ignored, tag and
//! attribute matching is case-insensitive, and attribute values may use
//! single or double quotes. Extracted blocks keep their surrounding tags so
//! they can be stored and re-parsed verbatim.

/// One typed `<info>` block, tags included
#[derive(Debug, Clone, PartialEq)]
pub struct InfoBlock {
    pub kind: String,
    pub xml: String,
}

/// Parsed executor payload: at most one summary block, any number of typed
/// info blocks in source order.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub summary: Option<String>,
    pub info_blocks: Vec<InfoBlock>,
}

/// Parse a payload into its tagged blocks
pub fn parse_payload(text: &str) -> Payload {
    Payload {
        summary: extract_summary(text).map(str::to_string),
        info_blocks: scan_info_blocks(text),
    }
}

/// The first `<summary>...</summary>` block, tags included
pub fn extract_summary(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("<summary")?;
    let open_end = start + lower[start..].find('>')?;
    let close = open_end + lower[open_end..].find("</summary>")?;
    Some(&text[start..close + "</summary>".len()])
}

/// The first `<info type="...">` block of the given kind, tags included
pub fn extract_info_block<'a>(text: &'a str, kind: &str) -> Option<&'a str> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("<info") {
        let start = from + rel;
        let open_end = match lower[start..].find('>') {
            Some(pos) => start + pos,
            None => return None,
        };
        from = open_end + 1;
        let attrs = &text[start + "<info".len()..open_end];
        if let Some(block_kind) = attr_value(attrs, "type") {
            if block_kind.eq_ignore_ascii_case(kind) {
                let close = open_end + lower[open_end..].find("</info>")?;
                return Some(&text[start..close + "</info>".len()]);
            }
        }
    }
    None
}

fn scan_info_blocks(text: &str) -> Vec<InfoBlock> {
    let lower = text.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("<info") {
        let start = from + rel;
        let open_end = match lower[start..].find('>') {
            Some(pos) => start + pos,
            None => break,
        };
        from = open_end + 1;
        let attrs = &text[start + "<info".len()..open_end];
        let kind = match attr_value(attrs, "type") {
            Some(kind) => kind.to_ascii_lowercase(),
            None => continue,
        };
        let close = match lower[open_end..].find("</info>") {
            Some(pos) => open_end + pos,
            None => continue,
        };
        blocks.push(InfoBlock {
            kind,
            xml: text[start..close + "</info>".len()].to_string(),
        });
        from = close + "</info>".len();
    }
    blocks
}

/// Value of a named attribute inside a tag's attribute text
fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let lower = attrs.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(name) {
        let start = from + rel;
        from = start + name.len();
        // Word boundary on the left: start of attrs or non-alphanumeric
        if start > 0 {
            let prev = lower.as_bytes()[start - 1];
            if prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'-' {
                continue;
            }
        }
        let rest = attrs[start + name.len()..].trim_start();
        let rest = match rest.strip_prefix('=') {
            Some(rest) => rest.trim_start(),
            None => continue,
        };
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let inner = &rest[1..];
        let end = inner.find(quote)?;
        return Some(&inner[..end]);
    }
    None
}
