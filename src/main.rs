use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dedupe_lib::cleaning::{cleaning_process, CleaningOptions, CleaningOutput};
use dedupe_lib::clustering::CanonicalRule;
use dedupe_lib::ingest::write_csv;
use dedupe_lib::utils::config::{WarehouseTarget, DEFAULT_CONFIG_PATH};
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::get_memory_usage;
use dedupe_lib::utils::progress_bars::logging::CleaningLogger;
use dedupe_lib::utils::progress_bars::progress_config::ProgressConfig;
use dedupe_lib::warehouse::postgres::PostgresConnector;
use dedupe_lib::warehouse::{query_table, write_process, DEFAULT_DATE_FIELD};
use indicatif::ProgressBar;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "timesheet_dedupe", about = "Deduplicate project labels in time-tracking exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    /// Greatest label in the cluster
    Label,
    /// Most frequent label in the cluster
    Count,
}

impl From<RuleArg> for CanonicalRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Label => CanonicalRule::LabelDescending,
            RuleArg::Count => CanonicalRule::CountDescending,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Download, clean, and write the cleaned rows as CSV
    Clean {
        link: String,
        /// Output file, stdout if omitted
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "label")]
        canonical_rule: RuleArg,
    },
    /// Print the correction map as JSON
    Corrections {
        link: String,
        #[arg(long, value_enum, default_value = "label")]
        canonical_rule: RuleArg,
    },
    /// Clean and load into the warehouse table
    Load {
        link: String,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        #[arg(long, default_value = DEFAULT_DATE_FIELD)]
        date_field: String,
        #[arg(long, value_enum, default_value = "label")]
        canonical_rule: RuleArg,
    },
    /// Read the warehouse table back as CSV on stdout
    Query {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

async fn update_phase(pb: &Option<ProgressBar>, config: &ProgressConfig, phase: &str) {
    if let Some(pb) = pb {
        if config.should_show_memory() {
            let memory_mb = get_memory_usage().await;
            pb.set_message(format!("{} (Memory: {} MB)", phase, memory_mb));
        } else {
            pb.set_message(phase.to_string());
        }
    }
}

async fn run_cleaning(link: &str, rule: RuleArg, pb: &Option<ProgressBar>, config: &ProgressConfig) -> Result<CleaningOutput> {
    update_phase(pb, config, "Cleaning").await;
    let options = CleaningOptions {
        canonical_rule: rule.into(),
        ..CleaningOptions::default()
    };
    let output = cleaning_process(link, &options)
        .await
        .context("Cleaning run failed")?;
    if let Some(pb) = pb {
        pb.inc(1);
    }
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let cli = Cli::parse();

    let progress_config = ProgressConfig::from_env();
    let start_time = Instant::now();

    match cli.command {
        Command::Clean {
            link,
            output,
            canonical_rule,
        } => {
            let pb = progress_config.create_phase_bar(2);
            let result = run_cleaning(&link, canonical_rule, &pb, &progress_config).await?;

            update_phase(&pb, &progress_config, "Writing CSV").await;
            match &output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_csv(&result.cleaned, BufWriter::new(file))?;
                    info!("Wrote {} rows to {}", result.cleaned.len(), path.display());
                }
                None => write_csv(&result.cleaned, io::stdout().lock())?,
            }
            if let Some(pb) = &pb {
                pb.finish_with_message("Done");
            }
            info!(
                "Run summary: {}",
                serde_json::to_string(&result.stats).context("Failed to serialize run stats")?
            );
        }
        Command::Corrections { link, canonical_rule } => {
            let pb = progress_config.create_phase_bar(1);
            let result = run_cleaning(&link, canonical_rule, &pb, &progress_config).await?;
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&result.correction_map).context("Failed to serialize correction map")?
            );
        }
        Command::Load {
            link,
            config,
            date_field,
            canonical_rule,
        } => {
            let target = WarehouseTarget::load(&config)?;
            let pb = progress_config.create_phase_bar(2);
            let result = run_cleaning(&link, canonical_rule, &pb, &progress_config).await?;

            update_phase(&pb, &progress_config, "Loading to warehouse").await;
            let logger = CleaningLogger::for_stage("LOAD", "📦");
            logger.log_start(&format!("{}.{}", target.dataset_name, target.table_name));
            let connector = PostgresConnector::from_env();
            let outcome = write_process(&result.cleaned, &connector, &target, &date_field).await?;
            if let Some(pb) = &pb {
                pb.inc(1);
                pb.finish_with_message("Done");
            }

            if outcome.success {
                logger.log_completion(result.cleaned.len(), result.stats.corrected_labels);
            } else {
                logger.log_warning(&format!(
                    "Load was not successful: {}",
                    outcome.error.as_deref().unwrap_or("row count mismatch")
                ));
            }
            println!(
                "{}",
                serde_json::to_string(&outcome).context("Failed to serialize write outcome")?
            );
        }
        Command::Query { config } => {
            let target = WarehouseTarget::load(&config)?;
            let connector = PostgresConnector::from_env();
            let rows = query_table(&connector, &target).await?;
            write_csv(&rows, io::stdout().lock())?;
        }
    }

    info!("Finished in {:.2?}", start_time.elapsed());
    Ok(())
}
