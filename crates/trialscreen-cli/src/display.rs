//! Banner-delimited verdict blocks for the `screen` and `prompt` commands.
//!
//! Each trial renders as a bulleted header (NCT ID, URL), the body text,
//! then a closing banner. A single banner opens the run.

use trialscreen_ai::{EligibilityClass, Outcome, ScreeningResult, classify};

const BANNER_WIDTH: usize = 148;

/// The horizontal rule between blocks.
pub fn banner() -> String {
    "-".repeat(BANNER_WIDTH)
}

/// Block for a successful evaluation. With `show_class`, a classification
/// line follows the verdict.
pub fn result_block(result: &ScreeningResult, show_class: bool) -> String {
    let mut out = header(&result.nct_id, &result.url);
    out.push_str(&result.verdict);
    out.push('\n');
    if show_class {
        out.push_str(&class_line(classify(&result.verdict)));
    }
    out.push_str(&banner());
    out
}

/// Block for an isolated-mode outcome; failures render the error in place
/// of the verdict.
pub fn outcome_block(outcome: &Outcome, show_class: bool) -> String {
    let mut out = header(&outcome.nct_id, &outcome.url);
    match &outcome.result {
        Ok(verdict) => {
            out.push_str(verdict);
            out.push('\n');
            if show_class {
                out.push_str(&class_line(classify(verdict)));
            }
        }
        Err(e) => {
            out.push_str(&format!("• Error: {e}\n"));
        }
    }
    out.push_str(&banner());
    out
}

/// Block for a rendered prompt.
pub fn prompt_block(nct_id: &str, url: &str, prompt: &str) -> String {
    let mut out = header(nct_id, url);
    out.push_str(prompt.trim_end());
    out.push('\n');
    out.push_str(&banner());
    out
}

fn header(nct_id: &str, url: &str) -> String {
    format!("• NCT ID: {nct_id}\n• URL: {url}\n")
}

fn class_line(class: Option<EligibilityClass>) -> String {
    match class {
        Some(c) => format!("• Classification: {c}\n"),
        None => "• Classification: unclassified\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialscreen_ai::EvaluationError;

    fn result(verdict: &str) -> ScreeningResult {
        ScreeningResult {
            nct_id: "NCT05608694".into(),
            url: "https://clinicaltrials.gov/study/NCT05608694".into(),
            verdict: verdict.into(),
        }
    }

    #[test]
    fn banner_is_148_dashes() {
        let b = banner();
        assert_eq!(b.len(), 148);
        assert!(b.chars().all(|c| c == '-'));
    }

    #[test]
    fn result_block_layout() {
        let block = result_block(&result("Eligibility: eligible"), false);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "• NCT ID: NCT05608694");
        assert_eq!(lines[1], "• URL: https://clinicaltrials.gov/study/NCT05608694");
        assert_eq!(lines[2], "Eligibility: eligible");
        assert_eq!(lines[3], banner());
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn verdict_printed_verbatim() {
        let verdict = "Eligibility: Ineligible\n\nJustification: the trial is for women.";
        let block = result_block(&result(verdict), false);
        assert!(block.contains(verdict));
    }

    #[test]
    fn classification_line_when_requested() {
        let block = result_block(&result("Eligibility: provisionally eligible"), true);
        assert!(block.contains("• Classification: provisionally eligible\n"));

        let block = result_block(&result("No idea."), true);
        assert!(block.contains("• Classification: unclassified\n"));
    }

    #[test]
    fn failed_outcome_shows_error() {
        let outcome = Outcome {
            nct_id: "NCT00000001".into(),
            url: "https://clinicaltrials.gov/study/NCT00000001".into(),
            result: Err(EvaluationError::NoCompletions),
        };
        let block = outcome_block(&outcome, true);
        assert!(block.contains("• Error: completion response contained no choices"));
        assert!(!block.contains("Classification"));
        assert!(block.ends_with(&banner()));
    }

    #[test]
    fn prompt_block_trims_trailing_blank_lines() {
        let block = prompt_block("NCT1", "u", "body\n\n\n");
        assert_eq!(block, format!("• NCT ID: NCT1\n• URL: u\nbody\n{}", banner()));
    }
}
