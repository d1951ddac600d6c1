//! ClinicalTrials.gov v2 study records, trimmed to the fields the ETL keeps.
//!
//! Every field is optional: the registry omits modules freely, and a study
//! without an NCT ID is dropped later by the transformation step rather
//! than rejected on parse.

use serde::{Deserialize, Serialize};

/// Base URL for a study's public page; the NCT ID is appended.
pub const STUDY_URL_PREFIX: &str = "https://clinicaltrials.gov/study/";

/// One page of `GET /studies`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPage {
    #[serde(default)]
    pub studies: Vec<Study>,
    pub next_page_token: Option<String>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    #[serde(default)]
    pub protocol_section: ProtocolSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSection {
    #[serde(default)]
    pub identification_module: IdentificationModule,
    #[serde(default)]
    pub status_module: StatusModule,
    #[serde(default)]
    pub eligibility_module: EligibilityModule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationModule {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusModule {
    pub overall_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityModule {
    /// Free text, usually with "Inclusion Criteria:" and "Exclusion Criteria:" headings.
    pub eligibility_criteria: Option<String>,
    pub healthy_volunteers: Option<bool>,
    /// ALL, MALE or FEMALE.
    pub sex: Option<String>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
    /// CHILD, ADULT and/or OLDER_ADULT.
    #[serde(default)]
    pub std_ages: Vec<String>,
}

impl Study {
    pub fn nct_id(&self) -> Option<&str> {
        self.protocol_section
            .identification_module
            .nct_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn eligibility(&self) -> &EligibilityModule {
        &self.protocol_section.eligibility_module
    }

    /// Public study page, if the study has an NCT ID.
    pub fn url(&self) -> Option<String> {
        self.nct_id().map(|id| format!("{STUDY_URL_PREFIX}{id}"))
    }
}

/// `GET /version` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVersion {
    pub api_version: String,
    /// ISO 8601 timestamp of the registry data snapshot.
    pub data_timestamp: String,
}
