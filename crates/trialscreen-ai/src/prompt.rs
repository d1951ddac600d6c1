//! Eligibility prompt template.
//!
//! The wording is the contract with the model: section order, the labels in
//! the response format, and the field dump at the end are all relied on by
//! downstream readers of the verdict text.

use trialscreen_core::{CriteriaRecord, Participant};

const FRAMING: &str = "I am evaluating potential participants for the clinical trial described below.";

const TRAITS_RULE: &str = "That is, do the participant's traits meet at least some of the inclusion criteria \
without contradicting any of them, while also not matching any of the exclusion criteria?";

const CLOSED_WORLD_RULE: &str = "The given characteristics of the prospective participant are all you can know \
about them. Don't conclude they have any other traits, and don't treat a trait that isn't mentioned as \
evidence of its opposite beyond what is explicitly stated.";

const AGE_RULE: &str = "Don't forget to check whether the participant's age lies between the trial's \
minimum and maximum acceptable ages.";

const PRESENT_CONDITIONS_RULE: &str = "Also, please do not take into account any future possibility of the \
participant developing a match to a criterion: only the known existing conditions matter.";

const MINORS_ADULTS_RULE: &str = "Finally, please take into account whether the trial is looking for children \
or for adults: if the trial only enrolls children and the prospective volunteer is an adult, they are \
ineligible, and if the trial only enrolls adults and the prospective volunteer is a minor, they are also \
ineligible.";

const RESPONSE_FORMAT: &str = "Please format your response in exactly two labeled sections:\n\
\n\
Eligibility: whether the prospective participant is eligible, provisionally eligible, or ineligible for the trial\n\
Justification: an explanation of how you determined eligibility\n";

/// Rendered in place of the condition list when a participant has none.
const NO_CONDITIONS: &str = "no stated medical conditions";

/// Build the eligibility prompt for one participant and one trial.
///
/// Pure: the same inputs always give the same string. The criteria lists
/// are rendered one entry per line under their headings; an empty entry
/// renders as an empty line.
pub fn build_prompt(participant: &Participant, record: &CriteriaRecord) -> String {
    let conditions = if participant.conditions.is_empty() {
        NO_CONDITIONS.to_string()
    } else {
        participant.conditions.join(", ")
    };

    let mut prompt = String::with_capacity(2048);

    prompt.push_str(FRAMING);
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "Could you please assess if a {age}-year-old {gender} with {conditions} meets the inclusion \
         criteria and does not match any exclusion criteria for the following clinical trial? ",
        age = participant.age,
        gender = participant.gender,
    ));
    for rule in [
        TRAITS_RULE,
        CLOSED_WORLD_RULE,
        AGE_RULE,
        PRESENT_CONDITIONS_RULE,
    ] {
        prompt.push_str(rule);
        prompt.push(' ');
    }
    prompt.push_str(MINORS_ADULTS_RULE);
    prompt.push_str("\n\n");

    prompt.push_str(RESPONSE_FORMAT);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("NCT ID: {}\n", record.nct_id));
    prompt.push_str(&format!("URL: {}\n\n", record.url));
    prompt.push_str(&format!("Minimum Age: {}\n\n", record.minimum_age));
    prompt.push_str(&format!("Maximum Age: {}\n\n", record.maximum_age));
    prompt.push_str(&format!("Gender: {}\n\n", record.gender));

    prompt.push_str("Inclusion Criteria:\n\n");
    prompt.push_str(&record.inclusion_criteria.join("\n"));
    prompt.push_str("\n\n");

    prompt.push_str("Exclusion Criteria:\n\n");
    prompt.push_str(&record.exclusion_criteria.join("\n"));
    prompt.push_str("\n\n");

    prompt
}
