mod display;
mod etl;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use trialscreen_ai::{
    BatchRunner, Evaluator, FailureMode, OpenAiClient, Outcome, ScreeningConfig, build_prompt,
};
use trialscreen_core::{CriteriaRecord, DEFAULT_DELIMITER, Participant};
use trialscreen_registry::{StudyQuery, endpoints};
use trialscreen_store::DuckStore;

const DEFAULT_DB: &str = "clinical_trials.duckdb";
const DEFAULT_CRITERIA: &str = "inclusion_exclusion_criteria.csv";

#[derive(Parser)]
#[command(
    name = "trialscreen",
    version,
    about = "Harvest recruiting clinical trials and screen a participant against their criteria"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest studies from the registry, build and export the criteria table
    Etl {
        /// DuckDB warehouse file
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// Keep the warehouse in memory instead of on disk
        #[arg(long, conflicts_with = "db")]
        in_memory: bool,
        #[arg(long, default_value = DEFAULT_CRITERIA)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DELIMITER)]
        delimiter: char,
        /// Records per registry page (1..=1000)
        #[arg(long, default_value_t = 1000)]
        page_size: u32,
        /// Overall status filter; an empty value harvests every status
        #[arg(long, default_value = "RECRUITING")]
        status: String,
        #[arg(long)]
        max_pages: Option<usize>,
        #[arg(long, env = "TRIALSCREEN_REGISTRY_URL", default_value = endpoints::BASE_URL)]
        registry_url: String,
    },
    /// Re-export the criteria table from an existing warehouse
    Export {
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        #[arg(long, default_value = DEFAULT_CRITERIA)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DELIMITER)]
        delimiter: char,
    },
    /// Print screening prompts without calling the model
    Prompt {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[command(flatten)]
        participant: ParticipantArgs,
        /// Only the trial with this NCT ID
        #[arg(long)]
        nct_id: Option<String>,
        #[arg(long, env = "TRIALSCREEN_MAX_RECORDS", default_value_t = trialscreen_ai::config::DEFAULT_MAX_RECORDS)]
        max_records: usize,
    },
    /// Screen a participant against the first trials of a criteria table
    Screen {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[command(flatten)]
        participant: ParticipantArgs,
        #[arg(long, env = "TRIALSCREEN_MODEL", default_value = trialscreen_ai::config::DEFAULT_MODEL)]
        model: String,
        #[arg(long, env = "TRIALSCREEN_TEMPERATURE", default_value_t = trialscreen_ai::config::DEFAULT_TEMPERATURE)]
        temperature: f32,
        #[arg(long, env = "TRIALSCREEN_MAX_RECORDS", default_value_t = trialscreen_ai::config::DEFAULT_MAX_RECORDS)]
        max_records: usize,
        /// Continue past failed evaluations, reporting each failure in place
        #[arg(long)]
        isolate_failures: bool,
        /// Append a coarse eligibility class to each verdict
        #[arg(long)]
        classify: bool,
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        #[arg(long, env = "OPENAI_BASE_URL")]
        base_url: Option<String>,
    },
}

#[derive(Args)]
struct CriteriaArgs {
    /// Delimited criteria table produced by `etl` or `export`
    #[arg(long, default_value = DEFAULT_CRITERIA)]
    criteria: PathBuf,
    #[arg(long, default_value_t = DEFAULT_DELIMITER)]
    delimiter: char,
}

impl CriteriaArgs {
    fn load(&self) -> anyhow::Result<Vec<CriteriaRecord>> {
        let store = DuckStore::open().context("opening in-memory warehouse")?;
        store
            .load_criteria(&self.criteria, self.delimiter)
            .with_context(|| format!("loading {}", self.criteria.display()))
    }
}

#[derive(Args)]
struct ParticipantArgs {
    #[arg(long, required_unless_present = "participant")]
    age: Option<u32>,
    #[arg(long, required_unless_present = "participant")]
    gender: Option<String>,
    /// Known condition or explicit absence; repeatable
    #[arg(long = "condition")]
    conditions: Vec<String>,
    /// Participant profile as JSON: {"age", "gender", "conditions"}
    #[arg(long, value_name = "FILE", conflicts_with_all = ["age", "gender", "conditions"])]
    participant: Option<PathBuf>,
}

impl ParticipantArgs {
    fn resolve(&self) -> anyhow::Result<Participant> {
        if let Some(path) = &self.participant {
            return read_participant(path);
        }
        let age = self.age.context("--age is required")?;
        let gender = self.gender.clone().context("--gender is required")?;
        Ok(Participant::new(age, gender, self.conditions.clone()))
    }
}

fn read_participant(path: &Path) -> anyhow::Result<Participant> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Participant::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("trialscreen v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Etl {
            db,
            in_memory,
            out,
            delimiter,
            page_size,
            status,
            max_pages,
            registry_url,
        } => {
            let opts = etl::EtlOptions {
                db: (!in_memory).then_some(db),
                out,
                delimiter,
                registry_url,
                query: StudyQuery {
                    page_size,
                    overall_status: Some(status),
                    max_pages,
                },
            };
            let stats = etl::run_etl(&opts).await?;
            eprintln!(
                "{} studies over {} pages ({:.2} MiB), {} trials exported to {} in {:.2}s (finished {})",
                stats.studies,
                stats.pages,
                stats.bytes as f64 / (1024.0 * 1024.0),
                stats.criteria,
                opts.out.display(),
                stats.elapsed_secs,
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            );
        }
        Command::Export { db, out, delimiter } => {
            let count = etl::run_export(&db, &out, delimiter)?;
            eprintln!("{count} trials exported to {}", out.display());
        }
        Command::Prompt {
            criteria,
            participant,
            nct_id,
            max_records,
        } => {
            let participant = participant.resolve()?;
            let records = criteria.load()?;
            let selected: Vec<&CriteriaRecord> = match nct_id.as_deref() {
                Some(id) => records.iter().filter(|r| r.nct_id == id).collect(),
                None => records.iter().take(max_records).collect(),
            };
            if selected.is_empty() {
                anyhow::bail!("no matching trials in {}", criteria.criteria.display());
            }
            println!("{}", display::banner());
            for record in selected {
                let prompt = build_prompt(&participant, record);
                println!(
                    "{}",
                    display::prompt_block(&record.nct_id, &record.url, &prompt)
                );
            }
        }
        Command::Screen {
            criteria,
            participant,
            model,
            temperature,
            max_records,
            isolate_failures,
            classify,
            api_key,
            base_url,
        } => {
            let config = ScreeningConfig {
                model,
                temperature,
                max_records,
                failure_mode: if isolate_failures {
                    FailureMode::Isolate
                } else {
                    FailureMode::Halt
                },
            };
            config.validate().context("invalid screening configuration")?;
            let client = OpenAiClient::new(api_key.unwrap_or_default(), base_url)
                .context("configuring chat-completion client")?;
            let participant = participant.resolve()?;
            let records = criteria.load()?;

            screen(client, &config, &participant, &records, classify).await?;
        }
    }

    Ok(())
}

async fn screen(
    client: OpenAiClient,
    config: &ScreeningConfig,
    participant: &Participant,
    records: &[CriteriaRecord],
    show_class: bool,
) -> anyhow::Result<()> {
    let runner = BatchRunner::from_config(Evaluator::new(Box::new(client), config), config);
    println!("{}", display::banner());

    match config.failure_mode {
        FailureMode::Halt => {
            runner
                .evaluate_all_with(participant, records, |result| {
                    println!("{}", display::result_block(result, show_class));
                })
                .await
                .context("screening halted")?;
        }
        FailureMode::Isolate => {
            let outcomes = runner
                .evaluate_each_with(participant, records, |outcome| {
                    println!("{}", display::outcome_block(outcome, show_class));
                })
                .await;
            check_outcomes(&outcomes)?;
        }
    }
    Ok(())
}

/// Fail an isolated run if any record failed, after every block was printed.
fn check_outcomes(outcomes: &[Outcome]) -> anyhow::Result<()> {
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "some evaluations failed");
        anyhow::bail!("{failed} of {} evaluations failed", outcomes.len());
    }
    Ok(())
}
