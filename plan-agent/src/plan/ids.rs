//! Node identifier allocation
//!
//! Identifiers follow spreadsheet column naming: `a..z, aa..az, ba..`, a
//! bijective base-26 sequence over lowercase letters. The successor of the
//! highest allocated id is the only state needed to mint fresh ids, so the
//! plan document only persists `check_list.latest_id`.

/// Next identifier in the sequence. The empty id maps to `a`.
pub fn next_id(id: &str) -> String {
    to_str(to_num(id) + 1)
}

fn to_num(id: &str) -> u64 {
    id.trim()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .fold(0u64, |n, c| {
            n * 26 + (c.to_ascii_lowercase() as u64 - 'a' as u64 + 1)
        })
}

fn to_str(mut n: u64) -> String {
    let mut out = Vec::new();
    while n > 0 {
        let r = ((n - 1) % 26) as u8;
        out.push(b'a' + r);
        n = (n - 1) / 26;
    }
    if out.is_empty() {
        return "a".to_string();
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
