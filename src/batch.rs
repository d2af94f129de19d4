use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::fetcher::{self, FetchError, Page};
use crate::parser::{Analysis, Analyzer};
use crate::scoring::taxonomy::Taxonomies;
use crate::settings::Settings;
use crate::table::{Record, Table, TypeMap};

const CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub limit: Option<usize>,
}

/// Counts reported after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub analysed: usize,
    pub no_url: usize,
    pub fetch_failed: usize,
    pub no_abstract: usize,
}

impl RunSummary {
    pub fn print(&self) {
        println!(
            "Wrote {} rows: {} analysed, {} without URL, {} fetch failures, {} without abstract.",
            self.total, self.analysed, self.no_url, self.fetch_failed, self.no_abstract,
        );
    }
}

/// Input table → fetch → analyse → output table. Configuration problems
/// (taxonomies, columns, content types) fail before any request is made.
pub async fn run(settings: &Settings, opts: &RunOptions) -> Result<RunSummary> {
    let taxonomies = Taxonomies::load_dir(&settings.taxonomy_dir).with_context(|| {
        format!("Failed to load taxonomies from {}", settings.taxonomy_dir.display())
    })?;

    let mut table = Table::load(&opts.input)
        .with_context(|| format!("Failed to read {}", opts.input.display()))?;
    if let Some(limit) = opts.limit {
        table.truncate(limit);
    }
    if table.is_empty() {
        warn!("{} has no rows", opts.input.display());
    }
    let records = table.records(&TypeMap::new(&settings.type_map))?;

    let targets: Vec<(usize, String)> = records
        .iter()
        .filter(|r| !r.url.is_empty())
        .map(|r| (r.index, r.url.clone()))
        .collect();

    // Phase 1: fetch
    let t_fetch = Instant::now();
    println!("Fetching {} pages ({} rows)...", targets.len(), records.len());
    let client = fetcher::client(settings)?;
    let (pages, stats) =
        fetcher::fetch_all(&client, targets, records.len(), settings.concurrency).await?;
    println!(
        "Fetched {} pages ({} ok, {} errors) in {:.1}s",
        stats.total,
        stats.ok,
        stats.errors,
        t_fetch.elapsed().as_secs_f64()
    );

    // Phase 2: analyse
    let t_analyse = Instant::now();
    let analyzer = Analyzer::new(taxonomies, &settings.debug_dir);
    let jobs: Vec<(&Record, Option<Result<Page, FetchError>>)> =
        records.iter().zip(pages).collect();
    println!("Analysing {} records...", jobs.len());
    let analyses = analyse_all(&analyzer, &jobs)?;
    println!("Analysed in {:.1}s", t_analyse.elapsed().as_secs_f64());

    let derived: Vec<Vec<String>> = records
        .iter()
        .zip(&analyses)
        .map(|(record, analysis)| analysis.cells(&record.article_type))
        .collect();
    table
        .write(&opts.output, &derived)
        .with_context(|| format!("Failed to write {}", opts.output.display()))?;

    let count = |status: &str| analyses.iter().filter(|a| a.fetch_status == status).count();
    Ok(RunSummary {
        total: analyses.len(),
        analysed: count("ok"),
        no_url: count("no-url"),
        fetch_failed: analyses
            .iter()
            .filter(|a| a.fetch_status == "fetch-failed" || a.fetch_status.starts_with("http-"))
            .count(),
        no_abstract: count("no-abstract"),
    })
}

/// Analyse in parallel chunks, keeping input order. The first fatal error
/// in row order aborts the run.
fn analyse_all(
    analyzer: &Analyzer,
    jobs: &[(&Record, Option<Result<Page, FetchError>>)],
) -> Result<Vec<Analysis>> {
    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut analyses = Vec::with_capacity(jobs.len());
    for chunk in jobs.chunks(CHUNK_SIZE) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|(record, page)| analyse_one(analyzer, record, page.as_ref()))
            .collect();

        for result in results {
            match result {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e.into());
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(analyses)
}

fn analyse_one(
    analyzer: &Analyzer,
    record: &Record,
    page: Option<&Result<Page, FetchError>>,
) -> Result<Analysis, PipelineError> {
    match page {
        None => {
            warn!("[{}] No URL", record.index);
            Ok(Analysis::placeholder("no-url"))
        }
        Some(Err(e)) => Ok(Analysis::placeholder(&e.status_label())),
        Some(Ok(page)) => {
            if let Some(ct) = page.content_type.as_deref().filter(|ct| !ct.contains("html")) {
                info!("[{}] {} served as {}, parsing anyway", record.index, record.url, ct);
            }
            analyzer.analyze(record.index, &record.url, &page.body)
        }
    }
}
