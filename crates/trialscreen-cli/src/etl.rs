//! ETL pipeline: registry pages → DuckDB → criteria table → delimited export.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};
use trialscreen_registry::{RegistryClient, StudyQuery};
use trialscreen_store::DuckStore;

pub struct EtlOptions {
    /// Warehouse file; `None` keeps the warehouse in memory.
    pub db: Option<PathBuf>,
    pub out: PathBuf,
    pub delimiter: char,
    pub registry_url: String,
    pub query: StudyQuery,
}

pub struct EtlStats {
    pub pages: usize,
    pub studies: usize,
    pub criteria: usize,
    pub bytes: usize,
    pub elapsed_secs: f64,
}

/// Logs per-step and cumulative elapsed time.
struct StepClock {
    start: Instant,
    prev: Instant,
}

impl StepClock {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            prev: now,
        }
    }

    fn lap(&mut self, step: &str) {
        let now = Instant::now();
        info!(
            step,
            step_secs = %format!("{:.2}", (now - self.prev).as_secs_f64()),
            total_secs = %format!("{:.2}", (now - self.start).as_secs_f64()),
            "step complete"
        );
        self.prev = now;
    }

    fn total_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Run the full pipeline: harvest, load, transform, export.
pub async fn run_etl(opts: &EtlOptions) -> anyhow::Result<EtlStats> {
    let mut clock = StepClock::start();

    // 1. Open the warehouse and replace the studies table.
    let store = open_store(opts.db.as_deref())?;
    store.reset_studies().context("resetting clinical_trials")?;

    // 2. Harvest and load, one page at a time.
    let client = RegistryClient::new(opts.registry_url.clone());
    match client.version().await {
        Ok(v) => info!(api_version = %v.api_version, data_timestamp = %v.data_timestamp, "registry data version"),
        Err(e) => warn!(error = %e, "registry version unavailable"),
    }
    let mut pager = client.studies(opts.query.clone());
    let mut studies = 0usize;
    while let Some(page) = pager
        .next_page()
        .await
        .with_context(|| format!("fetching page {}", pager.pages_fetched() + 1))?
    {
        studies += store
            .insert_studies(&page)
            .context("inserting studies")?;
    }
    clock.lap("harvest");

    // 3. Build the criteria table.
    let criteria = store
        .build_criteria_table()
        .context("building inclusion_exclusion_criteria")?;
    clock.lap("transform");

    // 4. Export.
    store
        .export_criteria(&opts.out, opts.delimiter)
        .with_context(|| format!("exporting to {}", opts.out.display()))?;
    clock.lap("export");

    Ok(EtlStats {
        pages: pager.pages_fetched(),
        studies,
        criteria,
        bytes: pager.bytes_fetched(),
        elapsed_secs: clock.total_secs(),
    })
}

/// Re-export the criteria table of an existing warehouse.
pub fn run_export(db: &Path, out: &Path, delimiter: char) -> anyhow::Result<usize> {
    info!(db = %db.display(), "reconnecting to warehouse");
    let store = open_store(Some(db))?;
    if !store.has_tables() {
        anyhow::bail!("{} has no criteria table; run `trialscreen etl` first", db.display());
    }
    store
        .export_criteria(out, delimiter)
        .with_context(|| format!("exporting to {}", out.display()))
}

fn open_store(db: Option<&Path>) -> anyhow::Result<DuckStore> {
    match db {
        Some(path) => DuckStore::open_persistent(path)
            .with_context(|| format!("opening warehouse {}", path.display())),
        None => DuckStore::open().context("opening in-memory warehouse"),
    }
}
