// recoup CLI - drives local report files through the loss-detection engine

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use recoup_engine::{run_detection, EngineConfig, ReportTable, RunSummary};
use recoup_store::{export_case_text, LossStore};

#[derive(Parser)]
#[command(name = "recoup")]
#[command(about = "Detect unreimbursed FBA inventory losses from local report files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full audit: normalize reports, detect losses, persist, bundle
    /// claim cases, print the run summary as JSON
    #[command(after_help = "\
Examples:
  recoup audit --db losses.db --merchant A2XYZ reports/FBA_INVENTORY_ADJUSTMENTS.csv
  recoup audit --db losses.db --config recoup.toml \\
      --report FBA_CUSTOMER_RETURNS=returns.csv \\
      --report FBA_MYI_INVENTORY=snapshot.tsv")]
    Audit {
        /// SQLite database file (created if missing)
        #[arg(long)]
        db: PathBuf,

        /// TOML config file; missing file or fields fall back to defaults
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Merchant id (overrides the config file)
        #[arg(long)]
        merchant: Option<String>,

        /// Audit date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Report file with an explicit category tag, as TAG=PATH
        #[arg(long = "report", value_name = "TAG=PATH")]
        reports: Vec<String>,

        /// Report files whose category tag is the file stem
        files: Vec<PathBuf>,

        /// Detect and persist only; skip claim-case creation
        #[arg(long)]
        no_cases: bool,
    },

    /// List stored claim cases for a merchant
    Cases {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        merchant: String,

        /// Print each case as a submittable plain-text document
        #[arg(long)]
        export: bool,
    },

    /// Flag a loss record as reimbursed so it leaves case selection
    MarkReimbursed {
        #[arg(long)]
        db: PathBuf,

        /// Loss record id
        record_id: i64,
    },

    /// Print the report date range worth downloading for an audit date
    SuggestRange {
        /// TOML config file; missing file or fields fall back to defaults
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Merchant id (overrides the config file)
        #[arg(long)]
        merchant: Option<String>,

        /// Audit date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Audit {
            db,
            config,
            merchant,
            as_of,
            reports,
            files,
            no_cases,
        } => run_audit(&db, config.as_deref(), merchant, as_of, &reports, &files, no_cases),
        Commands::Cases { db, merchant, export } => list_cases(&db, &merchant, export),
        Commands::MarkReimbursed { db, record_id } => mark_reimbursed(&db, record_id),
        Commands::SuggestRange { config, merchant, as_of } => {
            suggest_range(config.as_deref(), merchant, as_of)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>, merchant: Option<String>) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let raw = std::fs::read_to_string(path)?;
            // Validation runs after the merchant override below.
            EngineConfig::parse_toml(&raw)?
        }
        Some(path) => {
            log::warn!("config file {} not found, using defaults", path.display());
            EngineConfig::default()
        }
        None => EngineConfig::default(),
    };
    if let Some(merchant) = merchant {
        config.merchant_id = merchant;
    }
    config.validate()?;
    Ok(config)
}

fn load_tables(
    tagged: &[String],
    files: &[PathBuf],
) -> Result<HashMap<String, ReportTable>, Box<dyn Error>> {
    let mut tables = HashMap::new();

    for spec in tagged {
        let Some((tag, path)) = spec.split_once('=') else {
            return Err(format!("--report expects TAG=PATH, got '{spec}'").into());
        };
        tables.insert(tag.to_string(), ReportTable::from_path(tag, Path::new(path))?);
    }

    for path in files {
        let tag = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_uppercase();
        tables.insert(tag.clone(), ReportTable::from_path(&tag, path)?);
    }

    if tables.is_empty() {
        return Err("no report files given".into());
    }
    Ok(tables)
}

fn run_audit(
    db: &Path,
    config_path: Option<&Path>,
    merchant: Option<String>,
    as_of: Option<NaiveDate>,
    tagged: &[String],
    files: &[PathBuf],
    no_cases: bool,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path, merchant)?;
    let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let run_id = format!("AUD-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S"));

    let tables = load_tables(tagged, files)?;
    let run = run_detection(&config, &tables, as_of);

    let mut store = LossStore::open(db)?;
    let outcome = store.save_batch(&run_id, &config.merchant_id, &run.candidates)?;

    let cases_created = if no_cases {
        0
    } else {
        store
            .create_cases(&run_id, &config.merchant_id, as_of, config.claim_cutoff(as_of))?
            .len()
    };

    let summary = RunSummary {
        run_id,
        merchant_id: config.merchant_id.clone(),
        as_of,
        losses_detected: run.stats.losses_detected,
        losses_saved: outcome.saved,
        duplicates_skipped: outcome.duplicates_skipped,
        too_recent_skipped: run.stats.skipped.too_recent,
        already_reimbursed_skipped: run.stats.skipped.already_reimbursed,
        unmapped_reason_skipped: run.stats.skipped.unmapped_reason,
        cases_created,
        total_value_cents: run.stats.total_value_cents,
        by_category: run.stats.by_category,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn list_cases(db: &Path, merchant: &str, export: bool) -> Result<(), Box<dyn Error>> {
    let store = LossStore::open(db)?;
    let cases = store.cases_for_merchant(merchant)?;

    if export {
        for case in &cases {
            println!("{}", export_case_text(case));
        }
    } else {
        for case in &cases {
            println!(
                "{}  {:>10}  {}",
                case.reference,
                recoup_engine::money::format_cents(case.total_value_cents),
                case.title
            );
        }
    }
    Ok(())
}

fn suggest_range(
    config_path: Option<&Path>,
    merchant: Option<String>,
    as_of: Option<NaiveDate>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path, merchant)?;
    let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let (start, end) = config.report_date_range(as_of);
    println!(
        "{}",
        serde_json::json!({ "start": start, "end": end })
    );
    Ok(())
}

fn mark_reimbursed(db: &Path, record_id: i64) -> Result<(), Box<dyn Error>> {
    let mut store = LossStore::open(db)?;
    store.mark_reimbursed(record_id)?;
    println!("record {record_id} marked reimbursed");
    Ok(())
}
