//! Coarse classification of verdict text.
//!
//! The verdict itself stays free text; this only reads the class the model
//! named so runs can be summarised.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EligibilityClass {
    Eligible,
    ProvisionallyEligible,
    Ineligible,
}

impl EligibilityClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::ProvisionallyEligible => "provisionally eligible",
            Self::Ineligible => "ineligible",
        }
    }
}

impl fmt::Display for EligibilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrases checked against lowercased text. At equal offsets the earlier
/// entry wins.
const PHRASES: &[(&str, EligibilityClass)] = &[
    ("not provisionally eligible", EligibilityClass::Ineligible),
    ("provisionally eligible", EligibilityClass::ProvisionallyEligible),
    ("not eligible", EligibilityClass::Ineligible),
    ("ineligible", EligibilityClass::Ineligible),
    ("eligible", EligibilityClass::Eligible),
];

/// Read the eligibility class out of a verdict.
///
/// The labeled `Eligibility:` line is consulted first; without one, the
/// earliest class phrase anywhere in the text decides. `None` when no class
/// is named.
pub fn classify(verdict: &str) -> Option<EligibilityClass> {
    if let Some(line) = eligibility_line(verdict)
        && let Some(class) = earliest_phrase(line)
    {
        return Some(class);
    }
    earliest_phrase(verdict)
}

/// The value of the first `Eligibility:` line, tolerating markdown emphasis
/// and heading marks around the label.
fn eligibility_line(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let line = line.trim().trim_start_matches(['#', '*', '_', ' ']);
        let (label, rest) = line.split_once(':')?;
        let label = label.trim_end_matches(['*', '_']).trim();
        label
            .eq_ignore_ascii_case("eligibility")
            .then_some(rest)
    })
}

fn earliest_phrase(text: &str) -> Option<EligibilityClass> {
    let lower = text.to_lowercase();
    PHRASES
        .iter()
        .filter_map(|(phrase, class)| lower.find(phrase).map(|pos| (pos, *class)))
        // min_by_key keeps the first of equal keys, preserving PHRASES order
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, class)| class)
}
