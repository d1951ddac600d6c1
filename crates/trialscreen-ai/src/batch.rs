//! Batch runs: one participant against the front of a list of trials.
//!
//! Records are evaluated strictly in order, one request at a time. The
//! default [`FailureMode::Halt`] stops at the first failed evaluation;
//! [`FailureMode::Isolate`] records the failure and moves on.

use thiserror::Error;
use tracing::{info, warn};
use trialscreen_core::{CriteriaRecord, Participant};

use crate::config::ScreeningConfig;
use crate::evaluator::{EvaluationError, Evaluator};
use crate::prompt::build_prompt;

/// What a batch run does when an evaluation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop at the first failure and return it.
    #[default]
    Halt,
    /// Keep going; every record gets its own [`Outcome`].
    Isolate,
}

/// The verdict for one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningResult {
    pub nct_id: String,
    pub url: String,
    /// The model's text, unparsed.
    pub verdict: String,
}

/// Per-record result of an isolated run.
#[derive(Debug)]
pub struct Outcome {
    pub nct_id: String,
    pub url: String,
    pub result: Result<String, EvaluationError>,
}

/// A halted batch run.
///
/// Results completed before the failing record are kept in `completed`.
#[derive(Debug, Error)]
#[error("evaluating {nct_id} (record {index}): {source}")]
pub struct BatchError {
    pub nct_id: String,
    pub index: usize,
    pub completed: Vec<ScreeningResult>,
    #[source]
    pub source: EvaluationError,
}

/// Evaluates up to `max_records` trials for one participant.
pub struct BatchRunner {
    evaluator: Evaluator,
    max_records: usize,
}

impl BatchRunner {
    pub fn new(evaluator: Evaluator, max_records: usize) -> Self {
        Self {
            evaluator,
            max_records,
        }
    }

    /// Runner taking its record limit from a validated config.
    pub fn from_config(evaluator: Evaluator, config: &ScreeningConfig) -> Self {
        Self::new(evaluator, config.max_records)
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Evaluate records in input order and collect the results.
    ///
    /// Halts at the first failed evaluation.
    pub async fn evaluate_all(
        &self,
        participant: &Participant,
        records: &[CriteriaRecord],
    ) -> Result<Vec<ScreeningResult>, BatchError> {
        self.evaluate_all_with(participant, records, |_| {}).await
    }

    /// Like [`evaluate_all`](Self::evaluate_all), calling `on_result` as each
    /// verdict arrives.
    pub async fn evaluate_all_with<F>(
        &self,
        participant: &Participant,
        records: &[CriteriaRecord],
        mut on_result: F,
    ) -> Result<Vec<ScreeningResult>, BatchError>
    where
        F: FnMut(&ScreeningResult),
    {
        let batch = self.window(records);
        info!(
            total = records.len(),
            evaluating = batch.len(),
            model = self.evaluator.model(),
            "starting batch"
        );

        let mut results = Vec::with_capacity(batch.len());
        for (index, record) in batch.iter().enumerate() {
            let prompt = build_prompt(participant, record);
            match self.evaluator.evaluate(&prompt).await {
                Ok(verdict) => {
                    let result = ScreeningResult {
                        nct_id: record.nct_id.clone(),
                        url: record.url.clone(),
                        verdict,
                    };
                    on_result(&result);
                    results.push(result);
                }
                Err(source) => {
                    warn!(nct_id = %record.nct_id, index, error = %source, "evaluation failed; halting batch");
                    return Err(BatchError {
                        nct_id: record.nct_id.clone(),
                        index,
                        completed: results,
                        source,
                    });
                }
            }
        }

        info!(evaluated = results.len(), "batch complete");
        Ok(results)
    }

    /// Evaluate records in input order, giving every record its own outcome.
    pub async fn evaluate_each(
        &self,
        participant: &Participant,
        records: &[CriteriaRecord],
    ) -> Vec<Outcome> {
        self.evaluate_each_with(participant, records, |_| {}).await
    }

    /// Like [`evaluate_each`](Self::evaluate_each), calling `on_outcome` as each
    /// outcome arrives.
    pub async fn evaluate_each_with<F>(
        &self,
        participant: &Participant,
        records: &[CriteriaRecord],
        mut on_outcome: F,
    ) -> Vec<Outcome>
    where
        F: FnMut(&Outcome),
    {
        let batch = self.window(records);
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut failures = 0usize;

        for record in batch {
            let prompt = build_prompt(participant, record);
            let result = self.evaluator.evaluate(&prompt).await;
            if let Err(e) = &result {
                warn!(nct_id = %record.nct_id, error = %e, "evaluation failed");
                failures += 1;
            }
            let outcome = Outcome {
                nct_id: record.nct_id.clone(),
                url: record.url.clone(),
                result,
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        info!(evaluated = outcomes.len(), failures, "isolated batch complete");
        outcomes
    }

    fn window<'r>(&self, records: &'r [CriteriaRecord]) -> &'r [CriteriaRecord] {
        &records[..records.len().min(self.max_records)]
    }
}
