//! Splitting registry eligibility text into inclusion and exclusion criteria.
//!
//! ClinicalTrials.gov stores eligibility as one markdown-ish block:
//!
//! ```text
//! Inclusion Criteria:
//!
//! * Male age 18 and older
//! * No known history of prostate cancer
//!
//! Exclusion Criteria:
//!
//! * Lack of a rectum
//! ```
//!
//! The criteria table wants each side as newline-separated criteria with the
//! bullets and blank lines removed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Inclusion,
    Exclusion,
}

/// Split eligibility text into `(inclusion, exclusion)` criteria.
///
/// # Algorithm
///
/// 1. Walk the text line by line, starting in the inclusion section.
/// 2. A line whose text (ignoring markdown emphasis, a leading "Key" and a
///    trailing colon) starts with "Inclusion Criteria" or "Exclusion Criteria"
///    switches section. Anything after the colon on the same line is kept as
///    a criterion.
/// 3. Every other line is trimmed and stripped of a leading bullet
///    (`*`, `-`, `•`) or list number (`1.`, `2)`); blank lines are dropped.
/// 4. Each section is joined with `\n`.
///
/// Text without any heading ends up wholly in the inclusion section.
pub fn split_eligibility(text: &str) -> (String, String) {
    let mut inclusion: Vec<&str> = Vec::new();
    let mut exclusion: Vec<&str> = Vec::new();
    let mut section = Section::Inclusion;

    for raw in text.lines() {
        let line = match parse_heading(raw) {
            Some((heading, rest)) => {
                section = heading;
                rest
            }
            None => raw,
        };

        let item = strip_list_marker(line.trim());
        if item.is_empty() {
            continue;
        }
        match section {
            Section::Inclusion => inclusion.push(item),
            Section::Exclusion => exclusion.push(item),
        }
    }

    (inclusion.join("\n"), exclusion.join("\n"))
}

/// Recognise a section heading, returning the section and any trailing text.
fn parse_heading(line: &str) -> Option<(Section, &str)> {
    let trimmed = line.trim().trim_start_matches(['#', '*', '_', ' ']);
    let lower = trimmed.to_ascii_lowercase();
    let (lower, skipped) = match lower.strip_prefix("key ") {
        Some(rest) => (rest.to_string(), 4),
        None => (lower, 0),
    };

    let section = if lower.starts_with("inclusion criteria") {
        Section::Inclusion
    } else if lower.starts_with("exclusion criteria") {
        Section::Exclusion
    } else {
        return None;
    };

    // Both headings are 18 bytes long.
    let rest = trimmed[skipped + 18..].trim_start_matches(['*', '_', ' ']);
    if rest.is_empty() {
        return Some((section, ""));
    }
    let rest = rest.strip_prefix(':')?;
    Some((section, rest.trim_start_matches(['*', '_', ' '])))
}

fn strip_list_marker(line: &str) -> &str {
    for bullet in ["* ", "- ", "• ", "*\t", "-\t"] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    if line == "*" || line == "-" || line == "•" {
        return "";
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && digits < line.len() {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return after.trim_start();
        }
    }
    line
}
