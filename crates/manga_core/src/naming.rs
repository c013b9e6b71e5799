use std::collections::HashSet;

const MAX_COMPONENT_BYTES: usize = 80;

/// Windows-safe, deterministic path component for titles and unit names.
pub fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    // Collapse runs of underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut name = truncate_on_char_boundary(trim_edges(&compacted), MAX_COMPONENT_BYTES);
    name = trim_edges(&name).to_string();
    if name.is_empty() {
        return "untitled".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

/// Returns `name`, or a ` (n)` variant of it, whose sanitized form is not yet
/// in `taken`, and records that form. Comparison ignores case.
pub fn claim_unique_name(taken: &mut HashSet<String>, name: &str) -> String {
    let sanitized = sanitize_component(name);
    if taken.insert(sanitized.to_lowercase()) {
        return name.to_string();
    }
    let mut n = 2u32;
    loop {
        let suffix = format!(" ({n})");
        let head = truncate_on_char_boundary(&sanitized, MAX_COMPONENT_BYTES - suffix.len());
        let candidate = format!("{}{suffix}", trim_edges(&head));
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(&['_', ' ', '.'][..])
}

fn truncate_on_char_boundary(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_deterministically() {
        let a = sanitize_component("One Piece: Vol. 1 / Chapter 2?");
        assert_eq!(a, "One Piece_ Vol. 1 _ Chapter 2");
        assert_eq!(a, sanitize_component("One Piece: Vol. 1 / Chapter 2?"));
        assert_eq!(sanitize_component("???"), "untitled");
        assert_eq!(sanitize_component("  ..hidden.. "), "hidden");
        assert_eq!(sanitize_component("con"), "con_");
        assert_eq!(sanitize_component("a\u{7}b"), "a_b");
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let name = "漫".repeat(40); // 120 bytes
        let out = sanitize_component(&name);
        assert!(out.len() <= MAX_COMPONENT_BYTES);
        assert_eq!(out, "漫".repeat(26));
    }

    #[test]
    fn names_that_sanitize_alike_are_told_apart() {
        let mut taken = HashSet::new();
        assert_eq!(claim_unique_name(&mut taken, "Who?"), "Who?");
        assert_eq!(claim_unique_name(&mut taken, "Who"), "Who (2)");
        assert_eq!(claim_unique_name(&mut taken, "WHO"), "WHO (3)");
        assert_eq!(claim_unique_name(&mut taken, "Who (2)"), "Who (2) (2)");
    }

    #[test]
    fn suffix_survives_truncation_of_long_names() {
        let mut taken = HashSet::new();
        let first = format!("{} one", "x".repeat(80));
        let second = format!("{} two", "x".repeat(80));
        assert_eq!(claim_unique_name(&mut taken, &first), first);
        let renamed = claim_unique_name(&mut taken, &second);
        assert_eq!(renamed, format!("{} (2)", "x".repeat(76)));
        assert_eq!(sanitize_component(&renamed), renamed);
        assert_ne!(sanitize_component(&first), sanitize_component(&renamed));
    }
}
