use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use credit_intake_lib::batch::{read_batch_input, BatchConfig, BatchOrchestrator, BatchReport, DefaultFetcher};
use credit_intake_lib::cache::SessionStore;
use credit_intake_lib::cell_map::template_workbook;
use credit_intake_lib::config::{self, AppConfig};
use credit_intake_lib::excel::{load_workbook_from_path, workbook_to_xlsx_bytes, WorkbookHandle};
use credit_intake_lib::export::{
    export_bulk_upload, export_portal, generate_hybrid_row, CombinedExport, ExportContext,
};
use credit_intake_lib::models::{BatchEvent, CanonicalRecord};
use credit_intake_lib::services::{
    canonicalize, extract_with_fallback, HeuristicExtractor, StrictExtractor, WorkbookExtractor,
};
use credit_intake_lib::types::{ExtractedValues, OverrideMetadata};

#[derive(Parser)]
#[command(name = "credit-intake", version)]
#[command(about = "Extract credit questionnaires from workbooks and export them in upload formats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a blank questionnaire workbook
    Template {
        #[arg(long, default_value = "questionnaire_template.xlsx")]
        out: PathBuf,
    },
    /// Extract one workbook and print the canonical record as JSON
    Extract {
        workbook: PathBuf,
        #[arg(long, value_enum, default_value_t = Method::Auto)]
        method: Method,
        /// Print the flat extracted values instead of the record
        #[arg(long)]
        values: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export one or more workbooks in an upload format
    Export {
        #[arg(required = true)]
        workbooks: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Bulk)]
        format: Format,
        /// Override or extra column for hybrid rows, as key=value
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a batch input file (CSV, TSV or xlsx) through the pipeline
    Batch {
        input: PathBuf,
        /// Combined export path; defaults to the output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Report path; `.json` writes JSON, anything else markdown
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        remove_links: bool,
        /// Overrides the configured inter-job delay
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Write the combined export as xlsx instead of CSV
        #[arg(long)]
        xlsx: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Auto,
    Strict,
    Heuristic,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Bulk,
    Portal,
    Hybrid,
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

fn extract(workbook: &WorkbookHandle, method: Method) -> anyhow::Result<ExtractedValues> {
    let strict = StrictExtractor::new();
    let values = match method {
        Method::Auto => extract_with_fallback(workbook, &strict, &HeuristicExtractor)?,
        Method::Strict => strict.extract(workbook)?,
        Method::Heuristic => HeuristicExtractor.extract(workbook)?,
    };
    for w in &values.warnings {
        tracing::warn!(method = %values.method, "{}", w);
    }
    for e in &values.errors {
        tracing::error!(method = %values.method, "{}", e);
    }
    Ok(values)
}

fn load_record(path: &Path) -> anyhow::Result<CanonicalRecord> {
    let workbook = load_workbook_from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
    let values = extract(&workbook, Method::Auto).with_context(|| format!("failed to extract {}", path.display()))?;
    Ok(canonicalize(&values))
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content).with_context(|| format!("failed to write {}", p.display()))?;
            println!("Wrote {}.", p.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn print_event(event: &BatchEvent) {
    match event {
        BatchEvent::Started { total, .. } => eprintln!("Processing {total} rows..."),
        BatchEvent::Progress {
            index,
            total,
            percent_complete,
            ..
        } => eprintln!("[{}/{}] {}% done", index + 1, total, percent_complete),
        BatchEvent::JobFinished {
            index,
            error: Some(e),
            ..
        } => eprintln!("  row {} failed: {}", index + 1, e),
        BatchEvent::JobFinished { .. } => {}
        BatchEvent::Completed {
            completed_jobs,
            failed_jobs,
            ..
        } => eprintln!("Finished: {completed_jobs} completed, {failed_jobs} failed."),
        BatchEvent::Cancelled {
            completed_jobs,
            failed_jobs,
            ..
        } => eprintln!("Cancelled: {completed_jobs} completed, {failed_jobs} failed."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::from_env().context("invalid configuration")?;
    credit_intake_lib::init_tracing(&app_config.log_filter);
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match cli.command {
        Commands::Template { out } => {
            let bytes = workbook_to_xlsx_bytes(&template_workbook())?;
            std::fs::write(&out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote template to {}.", out.display());
        }
        Commands::Extract {
            workbook,
            method,
            values,
            out,
        } => {
            let handle =
                load_workbook_from_path(&workbook).with_context(|| format!("failed to load {}", workbook.display()))?;
            let extracted = extract(&handle, method)?;
            let json = if values {
                serde_json::to_string_pretty(&extracted)?
            } else {
                serde_json::to_string_pretty(&canonicalize(&extracted))?
            };
            write_output(out.as_deref(), &format!("{json}\n"))?;
        }
        Commands::Export {
            workbooks,
            format,
            meta,
            out,
        } => {
            let context = ExportContext::now();
            let records = workbooks
                .iter()
                .map(|p| load_record(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let content = match format {
                Format::Bulk => export_bulk_upload(&records, &context)?.content,
                Format::Portal => export_portal(&records, &context)?.content,
                Format::Hybrid => {
                    let overrides: OverrideMetadata = meta.into_iter().collect();
                    let rows: Vec<_> = records
                        .iter()
                        .map(|r| generate_hybrid_row(r, &overrides, &context))
                        .collect();
                    CombinedExport::from_rows(&rows).to_csv()?
                }
            };
            write_output(out.as_deref(), &content)?;
        }
        Commands::Batch {
            input,
            out,
            report,
            remove_links,
            delay_ms,
            xlsx,
        } => {
            let jobs = read_batch_input(&input).with_context(|| format!("failed to read {}", input.display()))?;
            if jobs.is_empty() {
                bail!("{} has no rows to process", input.display());
            }

            let store = SessionStore::shared().clone();
            let fetcher = DefaultFetcher::new(app_config.http_timeout, app_config.access_token.clone())?;
            let batch_config = BatchConfig {
                inter_job_delay: delay_ms
                    .map(std::time::Duration::from_millis)
                    .unwrap_or(app_config.job_delay),
                export_context: ExportContext::now(),
            };
            let orchestrator = BatchOrchestrator::new(store.clone(), Arc::new(fetcher), batch_config);
            let id = orchestrator.create_session(jobs)?;

            let cancel_store = store.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Cancelling after the current row...");
                    let _ = cancel_store.request_cancel(id);
                }
            });

            let outcome = orchestrator.run(id, &print_event).await?;
            let mut export = outcome.export;
            if remove_links {
                let cleared = export.remove_links();
                tracing::info!(cleared, "Links removed from combined export");
            }

            let ext = if xlsx { "xlsx" } else { "csv" };
            let out = out.unwrap_or_else(|| config::timestamped_output_path(&app_config.output_dir, "batch_export", ext));
            if xlsx {
                export.write_xlsx(&out)?;
            } else {
                std::fs::write(&out, export.to_csv()?).with_context(|| format!("failed to write {}", out.display()))?;
            }
            println!("Wrote {} rows to {}.", export.rows.len(), out.display());

            let summary = BatchReport::from_session(&outcome.session);
            match report {
                Some(path) => {
                    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
                    let content = if is_json {
                        summary.to_json()?
                    } else {
                        summary.to_markdown()
                    };
                    write_output(Some(&path), &content)?;
                }
                None => print!("{}", summary.to_markdown()),
            }
        }
    }

    Ok(())
}
