//! Prospective trial participants.

use serde::{Deserialize, Serialize};

/// A prospective participant, fixed for the duration of a batch.
///
/// `conditions` holds known traits as free text, including explicit
/// absences such as "No known history of cancer".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub age: u32,
    pub gender: String,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl Participant {
    pub fn new(age: u32, gender: impl Into<String>, conditions: Vec<String>) -> Self {
        Self {
            age,
            gender: gender.into(),
            conditions,
        }
    }

    /// Parse a participant from JSON such as
    /// `{"age": 49, "gender": "Male", "conditions": ["No known history of cancer"]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
