// src/edgar/client.rs
use std::collections::{BTreeMap, HashMap};

use crate::edgar::fetch::{FetchPolicy, SecFetcher};
use crate::edgar::models::{
    CompanySubmissions, FilingMetadata, RecentFilings, TickerRecord, EDGAR_ARCHIVES_BASE,
};
use crate::utils::error::FetchError;

const TICKER_DIRECTORY_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_BASE: &str = "https://data.sec.gov/submissions";

/// The filing type we archive, and its amendment variant as fallback.
pub const PREFERRED_FORM: &str = "10-K";
pub const AMENDMENT_FORM: &str = "10-K/A";

// EDGAR serves this page instead of the document when it decides the client
// is an undeclared automated tool.
const BLOCK_MARKER: &str = "Your Request Originates from an Undeclared Automated Tool";

/// Client for the EDGAR endpoints the archiver needs: the ticker directory,
/// per-company submission histories, and the document archive.
pub struct EdgarClient {
    fetcher: SecFetcher,
    ticker_directory_url: String,
    submissions_base: String,
    archives_base: String,
}

impl EdgarClient {
    pub fn new(user_agent: &str, policy: FetchPolicy) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: SecFetcher::new(user_agent, policy)?,
            ticker_directory_url: TICKER_DIRECTORY_URL.to_string(),
            submissions_base: SUBMISSIONS_BASE.to_string(),
            archives_base: EDGAR_ARCHIVES_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_endpoints(
        mut self,
        ticker_directory_url: String,
        submissions_base: String,
        archives_base: String,
    ) -> Self {
        self.ticker_directory_url = ticker_directory_url;
        self.submissions_base = submissions_base;
        self.archives_base = archives_base;
        self
    }

    /// Resolves each configured ticker to a zero-padded 10-digit CIK.
    ///
    /// One directory fetch covers the whole batch. Tickers missing from the
    /// directory, or directory rows without a CIK, map to None and are
    /// reported in the log; they never abort the batch.
    pub async fn resolve_ciks(
        &self,
        tickers: &[String],
    ) -> Result<BTreeMap<String, Option<String>>, FetchError> {
        // Keys of the directory object are arbitrary row indices.
        let directory: BTreeMap<String, TickerRecord> =
            self.fetcher.fetch_json(&self.ticker_directory_url).await?;

        // Keyed by uppercased ticker. Duplicate tickers overwrite earlier
        // rows; the directory does not promise uniqueness.
        let mut by_ticker: HashMap<String, &TickerRecord> = HashMap::new();
        for record in directory.values() {
            if let Some(symbol) = record.ticker.as_deref() {
                by_ticker.insert(symbol.to_uppercase(), record);
            }
        }
        tracing::debug!("Loaded {} directory rows", by_ticker.len());

        let mut resolved = BTreeMap::new();
        for ticker in tickers {
            let ticker = ticker.to_uppercase();
            let cik10 = match by_ticker.get(&ticker) {
                None => {
                    tracing::warn!("Ticker {} not found in SEC mapping", ticker);
                    None
                }
                Some(record) => match record.cik_str {
                    None => {
                        tracing::warn!("No cik_str found for ticker {}", ticker);
                        None
                    }
                    Some(cik) => {
                        let cik10 = format!("{:010}", cik);
                        tracing::debug!("{} -> CIK10: {}", ticker, cik10);
                        Some(cik10)
                    }
                },
            };
            resolved.insert(ticker, cik10);
        }
        Ok(resolved)
    }

    /// Fetches the submission history for a CIK and selects the most recent
    /// 10-K, falling back to the most recent 10-K/A. `Ok(None)` means no
    /// qualifying filing exists; that company has nothing to archive.
    pub async fn latest_annual_filing(
        &self,
        cik10: &str,
    ) -> Result<Option<FilingMetadata>, FetchError> {
        let url = format!("{}/CIK{}.json", self.submissions_base, cik10);
        let submissions: CompanySubmissions = self.fetcher.fetch_json(&url).await?;
        let recent = &submissions.filings.recent;
        warn_on_misaligned_arrays(cik10, recent);

        let Some(idx) = preferred_filing_index(&recent.form) else {
            tracing::warn!(
                "No {} (or {}) found for CIK{}",
                PREFERRED_FORM,
                AMENDMENT_FORM,
                cik10
            );
            return Ok(None);
        };

        let metadata = FilingMetadata {
            cik10: cik10.to_string(),
            company_name: submissions.name.clone(),
            form: safe_get(&recent.form, idx),
            filing_date: safe_get(&recent.filing_date, idx),
            accession_number: safe_get(&recent.accession_number, idx),
            primary_document: safe_get(&recent.primary_document, idx),
        };
        tracing::info!(
            "Latest {} for CIK{}: {:?}",
            metadata.form.as_deref().unwrap_or("filing"),
            cik10,
            metadata
        );
        Ok(Some(metadata))
    }

    /// URL of the selected filing's primary document, or None when the
    /// metadata cannot address one.
    pub fn document_url(&self, metadata: &FilingMetadata) -> Option<String> {
        metadata.primary_doc_url_from(&self.archives_base)
    }

    /// Downloads the primary document body. A body carrying EDGAR's
    /// anti-automation block page is a distinct terminal failure, never a
    /// "successful" download of blocked content.
    pub async fn download_document(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let body = self.fetcher.fetch_bytes(url).await?;
        if String::from_utf8_lossy(&body).contains(BLOCK_MARKER) {
            return Err(FetchError::AutomatedToolBlock(url.to_string()));
        }
        Ok(body)
    }
}

/// First index filed as the preferred form, else first amendment index.
/// EDGAR orders the arrays most recent first, so "first" means "latest".
fn preferred_filing_index(forms: &[String]) -> Option<usize> {
    forms
        .iter()
        .position(|form| form == PREFERRED_FORM)
        .or_else(|| forms.iter().position(|form| form == AMENDMENT_FORM))
}

// Defensive indexing (arrays should align, but don't assume)
fn safe_get(values: &[String], index: usize) -> Option<String> {
    values.get(index).cloned()
}

/// Alignment is an EDGAR convention, not a guarantee; a mismatch is a
/// data-quality warning, not a crash.
fn warn_on_misaligned_arrays(cik10: &str, recent: &RecentFilings) {
    let forms = recent.form.len();
    if recent.filing_date.len() != forms
        || recent.accession_number.len() != forms
        || recent.primary_document.len() != forms
    {
        tracing::warn!(
            "Submission arrays for CIK{} are misaligned (form: {}, filingDate: {}, accessionNumber: {}, primaryDocument: {})",
            cik10,
            forms,
            recent.filing_date.len(),
            recent.accession_number.len(),
            recent.primary_document.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forms(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn selection_prefers_first_exact_10k() {
        let sequence = forms(&["10-K/A", "8-K", "10-K", "10-K"]);
        assert_eq!(preferred_filing_index(&sequence), Some(2));
    }

    #[test]
    fn selection_falls_back_to_amendment() {
        let sequence = forms(&["8-K", "10-K/A", "4"]);
        assert_eq!(preferred_filing_index(&sequence), Some(1));
    }

    #[test]
    fn selection_returns_none_when_no_annual_form() {
        let sequence = forms(&["8-K", "4", "S-1"]);
        assert_eq!(preferred_filing_index(&sequence), None);
        assert_eq!(preferred_filing_index(&[]), None);
    }

    fn test_client(server: &MockServer) -> EdgarClient {
        EdgarClient::new(
            "test-agent",
            FetchPolicy {
                max_attempts: 1,
                ..FetchPolicy::default()
            },
        )
        .unwrap()
        .with_endpoints(
            format!("{}/files/company_tickers.json", server.uri()),
            format!("{}/submissions", server.uri()),
            format!("{}/Archives/edgar/data", server.uri()),
        )
    }

    #[tokio::test]
    async fn resolve_pads_found_ciks_and_maps_missing_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/company_tickers.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "0": {"cik_str": 320193u64, "ticker": "AAPL", "title": "Apple Inc."},
                "1": {"cik_str": 1652044u64, "ticker": "GOOGL", "title": "Alphabet Inc."},
                "2": {"ticker": "NOCIK", "title": "No Identifier Corp"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let resolved = client
            .resolve_ciks(&[
                "aapl".to_string(),
                "GOOGL".to_string(),
                "NOCIK".to_string(),
                "GHOST".to_string(),
            ])
            .await
            .expect("directory fetch ok");

        assert_eq!(resolved["AAPL"].as_deref(), Some("0000320193"));
        assert_eq!(resolved["GOOGL"].as_deref(), Some("0001652044"));
        assert_eq!(resolved["NOCIK"], None);
        assert_eq!(resolved["GHOST"], None);
    }

    #[tokio::test]
    async fn latest_filing_survives_misaligned_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/CIK0000000099.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Ragged Corp",
                "filings": {"recent": {
                    "form": ["8-K", "10-K"],
                    "filingDate": ["2024-05-01"],
                    "accessionNumber": ["0000000099-24-000001"],
                    "primaryDocument": []
                }}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let metadata = client
            .latest_annual_filing("0000000099")
            .await
            .expect("fetch ok")
            .expect("10-K present");

        assert_eq!(metadata.form.as_deref(), Some("10-K"));
        // Indices past the short arrays yield None instead of failing.
        assert_eq!(metadata.filing_date, None);
        assert_eq!(metadata.accession_number, None);
        assert_eq!(metadata.primary_document, None);
    }

    #[tokio::test]
    async fn latest_filing_is_none_without_annual_forms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/CIK0000000007.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Events Only Inc",
                "filings": {"recent": {
                    "form": ["8-K", "8-K"],
                    "filingDate": ["2024-05-01", "2024-02-01"],
                    "accessionNumber": ["a-1", "a-2"],
                    "primaryDocument": ["x.htm", "y.htm"]
                }}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let metadata = client
            .latest_annual_filing("0000000007")
            .await
            .expect("fetch ok");
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn download_detects_block_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked.htm"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!("<html><body>{}</body></html>", BLOCK_MARKER),
                "text/html",
            ))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/blocked.htm", server.uri());
        let result = client.download_document(&url).await;
        assert!(matches!(result, Err(FetchError::AutomatedToolBlock(_))));
    }

    #[tokio::test]
    async fn download_returns_document_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.htm"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>annual report</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/ok.htm", server.uri());
        let body = client.download_document(&url).await.expect("download ok");
        assert_eq!(body, b"<html>annual report</html>");
    }
}
