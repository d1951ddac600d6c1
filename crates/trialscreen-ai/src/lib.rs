//! Eligibility screening: prompts from (participant, trial) pairs, judged by a
//! chat-completion model, one trial at a time.

pub mod batch;
pub mod config;
pub mod evaluator;
pub mod prompt;
pub mod verdict;

#[cfg(feature = "openai")]
mod openai;
#[cfg(feature = "openai")]
pub use openai::{DEFAULT_BASE_URL, OpenAiClient};

pub use batch::{BatchError, BatchRunner, FailureMode, Outcome, ScreeningResult};
pub use config::{ConfigurationError, ScreeningConfig};
pub use evaluator::{ChatCompletion, ChatRequest, EvaluationError, Evaluator};
pub use prompt::build_prompt;
pub use verdict::{EligibilityClass, classify};
