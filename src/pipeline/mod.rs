// src/pipeline/mod.rs
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::edgar::client::{EdgarClient, AMENDMENT_FORM, PREFERRED_FORM};
use crate::edgar::fetch::FetchPolicy;
use crate::edgar::models::FilingMetadata;
use crate::render;
use crate::storage::StorageManager;
use crate::utils::error::AppError;

/// One company configured for the run; immutable once the run starts.
#[derive(Debug, Clone)]
pub struct CompanyIdentity {
    pub display_name: String,
    pub ticker: String,
}

/// Immutable configuration handed to the orchestrator at start.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub companies: Vec<CompanyIdentity>,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub max_attempts: u32,
    /// Courtesy delay between successive document downloads.
    pub download_pacing: Duration,
}

/// How far a company's pipeline progressed before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Pending,
    Resolved,
    Selected,
    Downloaded,
    Rendered,
}

#[derive(Debug, Serialize)]
pub struct CompanyReport {
    pub display_name: String,
    pub ticker: String,
    pub stage: Stage,
    /// Present when the company stopped short of a rendered PDF.
    pub skip_reason: Option<String>,
    pub filing: Option<FilingMetadata>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub companies: Vec<CompanyReport>,
}

/// A successfully downloaded document queued for the render phase.
struct DownloadJob {
    report_index: usize,
    html_path: PathBuf,
    pdf_path: PathBuf,
}

struct CompanyDownload {
    stage: Stage,
    skip_reason: Option<String>,
    filing: Option<FilingMetadata>,
    /// (html, pdf) destination paths, set only when the document landed on disk.
    paths: Option<(PathBuf, PathBuf)>,
}

impl CompanyDownload {
    fn stopped(stage: Stage, reason: String, filing: Option<FilingMetadata>) -> Self {
        Self {
            stage,
            skip_reason: Some(reason),
            filing,
            paths: None,
        }
    }
}

/// Runs the full archive pipeline: resolve and download every company, then
/// render every downloaded document. Per-company failures are recorded in
/// the returned report; only the whole-batch directory fetch is fatal.
pub async fn run(config: &RunConfig) -> Result<RunReport, AppError> {
    let client = EdgarClient::new(
        &config.user_agent,
        FetchPolicy {
            max_attempts: config.max_attempts,
            ..FetchPolicy::default()
        },
    )?;
    let storage = StorageManager::new(&config.output_dir)?;
    run_with_client(config, &client, &storage).await
}

async fn run_with_client(
    config: &RunConfig,
    client: &EdgarClient,
    storage: &StorageManager,
) -> Result<RunReport, AppError> {
    // The directory fetch is the one dependency shared by every company; its
    // failure aborts the run because nothing can proceed without it.
    let tickers: Vec<String> = config
        .companies
        .iter()
        .map(|company| company.ticker.to_uppercase())
        .collect();
    let cik_map = client.resolve_ciks(&tickers).await?;
    tracing::info!(
        "Resolved {} of {} tickers",
        cik_map.values().filter(|cik| cik.is_some()).count(),
        tickers.len()
    );

    let mut companies: Vec<CompanyReport> = Vec::with_capacity(config.companies.len());
    let mut jobs: Vec<DownloadJob> = Vec::new();

    // Download phase: every company is attempted before any render starts,
    // so a late rendering failure can never cost us a finished download.
    for company in &config.companies {
        let ticker = company.ticker.to_uppercase();
        let cik10 = cik_map.get(&ticker).cloned().flatten();
        let outcome = download_company(client, storage, &ticker, cik10).await;

        if let Some(reason) = &outcome.skip_reason {
            tracing::warn!("{}: stopped after {:?}: {}", ticker, outcome.stage, reason);
        }
        if let Some((html_path, pdf_path)) = outcome.paths {
            jobs.push(DownloadJob {
                report_index: companies.len(),
                html_path,
                pdf_path,
            });
            tokio::time::sleep(config.download_pacing).await;
        }
        companies.push(CompanyReport {
            display_name: company.display_name.clone(),
            ticker,
            stage: outcome.stage,
            skip_reason: outcome.skip_reason,
            filing: outcome.filing,
        });
    }

    // Render phase: one browser per document, failures isolated per document.
    for job in jobs {
        let report = &mut companies[job.report_index];
        tracing::info!(
            "Rendering {} -> {}",
            job.html_path.display(),
            job.pdf_path.display()
        );
        let html_path = job.html_path.clone();
        let pdf_path = job.pdf_path.clone();
        let rendered =
            tokio::task::spawn_blocking(move || render::render_pdf(&html_path, &pdf_path)).await;
        match rendered {
            Ok(Ok(())) => report.stage = Stage::Rendered,
            Ok(Err(err)) => {
                tracing::error!("Failed rendering PDF for {}: {}", report.ticker, err);
                report.skip_reason = Some(format!("render failed: {}", err));
            }
            Err(err) => {
                tracing::error!("Render task for {} did not complete: {}", report.ticker, err);
                report.skip_reason = Some(format!("render task failed: {}", err));
            }
        }
    }

    let report = RunReport { companies };
    for company in &report.companies {
        match &company.skip_reason {
            None => tracing::info!(
                "{} ({}): completed through {:?}",
                company.ticker,
                company.display_name,
                company.stage
            ),
            Some(reason) => tracing::warn!(
                "{} ({}): reached {:?}, skipped: {}",
                company.ticker,
                company.display_name,
                company.stage,
                reason
            ),
        }
    }
    storage.write_run_report(&report)?;
    Ok(report)
}

/// Walks one company from CIK to a document on disk, stopping at the first
/// stage that fails or comes back empty.
async fn download_company(
    client: &EdgarClient,
    storage: &StorageManager,
    ticker: &str,
    cik10: Option<String>,
) -> CompanyDownload {
    let Some(cik10) = cik10 else {
        return CompanyDownload::stopped(
            Stage::Pending,
            "ticker did not resolve to a CIK".to_string(),
            None,
        );
    };

    let metadata = match client.latest_annual_filing(&cik10).await {
        Err(err) => {
            return CompanyDownload::stopped(
                Stage::Resolved,
                format!("filing history fetch failed: {}", err),
                None,
            );
        }
        Ok(None) => {
            // A company with no qualifying filing is not an error; there is
            // simply nothing to archive for it.
            return CompanyDownload::stopped(
                Stage::Resolved,
                format!(
                    "no {} or {} in filing history",
                    PREFERRED_FORM, AMENDMENT_FORM
                ),
                None,
            );
        }
        Ok(Some(metadata)) => metadata,
    };

    let Some(url) = client.document_url(&metadata) else {
        return CompanyDownload::stopped(
            Stage::Selected,
            "filing metadata too incomplete to build a document URL".to_string(),
            Some(metadata),
        );
    };

    let html_path = storage.document_path(ticker, &metadata);
    let pdf_path = storage.pdf_path(ticker, &metadata);
    tracing::info!("Downloading {} to {}", url, html_path.display());
    let body = match client.download_document(&url).await {
        Err(err) => {
            return CompanyDownload::stopped(
                Stage::Selected,
                format!("download failed: {}", err),
                Some(metadata),
            );
        }
        Ok(body) => body,
    };
    if let Err(err) = storage.write_document(&html_path, &body) {
        return CompanyDownload::stopped(
            Stage::Selected,
            format!("saving document failed: {}", err),
            Some(metadata),
        );
    }

    CompanyDownload {
        stage: Stage::Downloaded,
        skip_reason: None,
        filing: Some(metadata),
        paths: Some((html_path, pdf_path)),
    }
}
