//! DuckDB warehouse for harvested studies and the criteria export.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use duckdb::{Connection, params};
use tracing::{debug, info};
use trialscreen_core::criteria::records_from_batches;
use trialscreen_core::study::STUDY_URL_PREFIX;
use trialscreen_core::{CriteriaRecord, DataFormatError, Study, split_eligibility};

use crate::StoreError;

const STUDIES_TABLE: &str = "clinical_trials";
const CRITERIA_TABLE: &str = "inclusion_exclusion_criteria";

/// DuckDB store backing the ETL stage.
///
/// Two tables:
/// - `clinical_trials`: one row per harvested study, replaced on every run,
///   with the eligibility text already split into inclusion and exclusion
/// - `inclusion_exclusion_criteria`: the transformation output, one row per
///   distinct NCT ID, which is what gets exported for screening
///
/// Supports both in-memory and persistent (file-backed) modes.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Check whether both tables exist.
    pub fn has_tables(&self) -> bool {
        self.studies_count().is_ok() && self.criteria_count().is_ok()
    }

    // ── Load ──

    /// Drop and recreate `clinical_trials`.
    ///
    /// Every ETL run starts here, so a run replaces the previous harvest
    /// rather than appending to it.
    pub fn reset_studies(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {STUDIES_TABLE} (
                nct_id               VARCHAR,
                brief_title          VARCHAR,
                overall_status       VARCHAR,
                minimum_age          VARCHAR,
                maximum_age          VARCHAR,
                sex                  VARCHAR,
                healthy_volunteers   BOOLEAN,
                std_ages             VARCHAR,
                eligibility_criteria VARCHAR,
                inclusion_criteria   VARCHAR,
                exclusion_criteria   VARCHAR,
                loaded_at            TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
            )"
        ))?;
        debug!(table = STUDIES_TABLE, "reset studies table");
        Ok(())
    }

    /// Append one page of studies to `clinical_trials` in a single transaction.
    ///
    /// Returns the number of rows inserted.
    pub fn insert_studies(&self, studies: &[Study]) -> Result<usize, StoreError> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match self.insert_rows(studies) {
            Ok(n) => {
                self.conn.execute_batch("COMMIT")?;
                debug!(rows = n, "inserted studies");
                Ok(n)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn insert_rows(&self, studies: &[Study]) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {STUDIES_TABLE} (
                nct_id, brief_title, overall_status, minimum_age, maximum_age, sex,
                healthy_volunteers, std_ages, eligibility_criteria,
                inclusion_criteria, exclusion_criteria
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))?;

        for study in studies {
            let section = &study.protocol_section;
            let elig = study.eligibility();
            let (inclusion, exclusion) =
                split_eligibility(elig.eligibility_criteria.as_deref().unwrap_or(""));
            let std_ages = (!elig.std_ages.is_empty()).then(|| elig.std_ages.join(","));

            stmt.execute(params![
                study.nct_id(),
                section.identification_module.brief_title,
                section.status_module.overall_status,
                elig.minimum_age,
                elig.maximum_age,
                elig.sex,
                elig.healthy_volunteers,
                std_ages,
                elig.eligibility_criteria,
                inclusion,
                exclusion,
            ])?;
        }
        Ok(studies.len())
    }

    // ── Transform ──

    /// Materialise `inclusion_exclusion_criteria` from `clinical_trials`.
    ///
    /// Studies without an NCT ID are dropped, duplicates keep one row, and
    /// missing text columns become empty strings. Returns the row count.
    pub fn build_criteria_table(&self) -> Result<usize, StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {CRITERIA_TABLE} AS
            SELECT DISTINCT ON (nct_id)
                nct_id,
                '{STUDY_URL_PREFIX}' || nct_id             AS url,
                coalesce(minimum_age, '')                  AS minimum_age,
                coalesce(maximum_age, '')                  AS maximum_age,
                coalesce(sex, '')                          AS gender,
                coalesce(inclusion_criteria, '')           AS inclusion_criteria,
                coalesce(exclusion_criteria, '')           AS exclusion_criteria
            FROM {STUDIES_TABLE}
            WHERE nct_id IS NOT NULL AND trim(nct_id) <> ''
            ORDER BY nct_id"
        ))?;
        let count = self.criteria_count()?;
        info!(count, table = CRITERIA_TABLE, "built criteria table");
        Ok(count)
    }

    // ── Export / import ──

    /// Write `inclusion_exclusion_criteria` to a delimited file with a header row.
    ///
    /// Returns the number of rows exported.
    pub fn export_criteria(&self, path: &Path, delimiter: char) -> Result<usize, StoreError> {
        let delimiter = check_delimiter(delimiter)?;
        let sql = format!(
            "COPY (
                SELECT nct_id, url, minimum_age, maximum_age, gender,
                       inclusion_criteria, exclusion_criteria
                FROM {CRITERIA_TABLE}
                ORDER BY nct_id
            ) TO '{path}' (HEADER, DELIMITER '{delimiter}')",
            path = sql_escape(&path.display().to_string()),
        );
        self.conn.execute_batch(&sql)?;
        let count = self.criteria_count()?;
        info!(count, path = %path.display(), "exported criteria");
        Ok(count)
    }

    /// Read a delimited criteria file into records, in file order.
    ///
    /// Every column is read as text; nulls become empty strings and the
    /// criteria columns are split into one entry per line. Missing required
    /// columns, unreadable rows and empty NCT IDs are data format errors.
    pub fn load_criteria(
        &self,
        path: &Path,
        delimiter: char,
    ) -> Result<Vec<CriteriaRecord>, StoreError> {
        if !path.exists() {
            return Err(StoreError::CriteriaNotFound(path.to_path_buf()));
        }
        let delimiter = check_delimiter(delimiter)?;
        let sql = format!(
            "SELECT * FROM read_csv('{path}',
                delim = '{delimiter}',
                header = true,
                quote = '\"',
                escape = '\"',
                strict_mode = true,
                null_padding = false,
                all_varchar = true)",
            path = sql_escape(&path.display().to_string()),
        );

        let unreadable = |e: duckdb::Error| DataFormatError::Unreadable(e.to_string());
        let mut stmt = self.conn.prepare(&sql).map_err(unreadable)?;
        let arrow = stmt.query_arrow([]).map_err(unreadable)?;
        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();

        let records = records_from_batches(&schema, &batches)?;
        info!(count = records.len(), path = %path.display(), "loaded criteria");
        Ok(records)
    }

    // ── Counts ──

    /// Number of rows in `clinical_trials`.
    pub fn studies_count(&self) -> Result<usize, StoreError> {
        self.count_table(STUDIES_TABLE)
    }

    /// Number of rows in `inclusion_exclusion_criteria`.
    pub fn criteria_count(&self) -> Result<usize, StoreError> {
        self.count_table(CRITERIA_TABLE)
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

/// Accept a single printable ASCII delimiter (or tab) that is safe inside a
/// SQL string literal and distinct from the quote character.
fn check_delimiter(delimiter: char) -> Result<char, StoreError> {
    let ok = delimiter == '\t'
        || (delimiter.is_ascii_graphic() && delimiter != '\'' && delimiter != '"');
    if ok {
        Ok(delimiter)
    } else {
        Err(StoreError::InvalidDelimiter(delimiter))
    }
}

/// Escape a string for use in SQL single-quoted literals.
fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}
