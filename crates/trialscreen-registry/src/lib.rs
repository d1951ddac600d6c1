//! Registry layer: paginated harvesting from the ClinicalTrials.gov v2 API.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{RegistryClient, RegistryError, StudyPager, StudyQuery, endpoints};
