pub mod criteria;
pub mod eligibility_text;
pub mod participant;
pub mod schema;
pub mod study;

pub use criteria::{CriteriaRecord, DataFormatError, DEFAULT_DELIMITER, REQUIRED_COLUMNS};
pub use eligibility_text::split_eligibility;
pub use participant::Participant;
pub use schema::criteria_table_schema;
pub use study::{DataVersion, Study, StudyPage};
