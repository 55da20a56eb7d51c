// src/edgar/models.rs
#![allow(dead_code)]
use serde::{Deserialize, Serialize};

/// Base of the EDGAR document archive. Archive URLs use the un-padded CIK.
pub const EDGAR_ARCHIVES_BASE: &str = "https://www.sec.gov/Archives/edgar/data";

/// One row of the EDGAR company ticker directory.
/// Example: https://www.sec.gov/files/company_tickers.json
///
/// Every field is optional; rows missing a ticker or CIK are skipped by the
/// resolver rather than failing the whole directory.
#[derive(Debug, Deserialize)]
pub struct TickerRecord {
    pub cik_str: Option<u64>,
    pub ticker: Option<String>,
    pub title: Option<String>,
}

/// Structure representing the EDGAR company submission index.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Default, Deserialize)]
pub struct CompanySubmissions {
    pub name: Option<String>,
    #[serde(default)]
    pub filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
pub struct Filings {
    #[serde(default)]
    pub recent: RecentFilings,
}

/// Parallel arrays, index-aligned by EDGAR convention (most recent first).
/// Alignment is never enforced by the registry, so each field defaults to
/// empty and selection indexes into them defensively.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    #[serde(default)]
    pub form: Vec<String>,
    #[serde(default)]
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub accession_number: Vec<String>,
    #[serde(default)]
    pub primary_document: Vec<String>,
}

/// The one filing selected for a company. Fields other than the CIK come
/// from defensive per-index lookups and may be individually absent.
#[derive(Debug, Clone, Serialize)]
pub struct FilingMetadata {
    /// CIK zero-padded to 10 digits, as used by the submissions endpoint.
    pub cik10: String,
    pub company_name: Option<String>,
    pub form: Option<String>,
    pub filing_date: Option<String>,
    pub accession_number: Option<String>,
    pub primary_document: Option<String>,
}

impl FilingMetadata {
    /// Constructs the URL of this filing's primary document under the given
    /// archive root, or None when the metadata is too incomplete to address
    /// it. The CIK loses its zero padding and the accession number its
    /// hyphens in archive URLs.
    pub fn primary_doc_url_from(&self, archives_base: &str) -> Option<String> {
        let cik: u64 = self.cik10.parse().ok()?;
        let acc_no_dashes = self.accession_number.as_deref()?.replace('-', "");
        let primary_doc = self.primary_document.as_deref()?;
        Some(format!(
            "{}/{}/{}/{}",
            archives_base, cik, acc_no_dashes, primary_doc
        ))
    }

    /// Deterministic local filename for this filing, e.g.
    /// `AAPL_10-K_2024-11-01_000032019324000123.html`. Missing fields
    /// degrade to placeholders so a rerun still lands on the same name.
    pub fn output_filename(&self, ticker: &str, extension: &str) -> String {
        let form = self.form.as_deref().unwrap_or("UNKNOWN").replace('/', "_");
        let filing_date = self.filing_date.as_deref().unwrap_or("unknown-date");
        let accession = self
            .accession_number
            .as_deref()
            .unwrap_or("unknown-accession")
            .replace('-', "");
        format!(
            "{}_{}_{}_{}.{}",
            ticker, form, filing_date, accession, extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> FilingMetadata {
        FilingMetadata {
            cik10: "0000320193".to_string(),
            company_name: Some("Apple Inc.".to_string()),
            form: Some("10-K".to_string()),
            filing_date: Some("2024-11-01".to_string()),
            accession_number: Some("0000320193-24-000123".to_string()),
            primary_document: Some("aapl-20240928.htm".to_string()),
        }
    }

    #[test]
    fn doc_url_strips_padding_and_hyphens() {
        let url = sample_metadata()
            .primary_doc_url_from(EDGAR_ARCHIVES_BASE)
            .expect("complete metadata");
        assert!(
            url.ends_with("/320193/000032019324000123/aapl-20240928.htm"),
            "unexpected url: {}",
            url
        );
        assert!(url.starts_with("https://www.sec.gov/Archives/edgar/data/"));
    }

    #[test]
    fn doc_url_requires_accession_and_document() {
        let mut metadata = sample_metadata();
        metadata.accession_number = None;
        assert!(metadata.primary_doc_url_from(EDGAR_ARCHIVES_BASE).is_none());

        let mut metadata = sample_metadata();
        metadata.primary_document = None;
        assert!(metadata.primary_doc_url_from(EDGAR_ARCHIVES_BASE).is_none());
    }

    #[test]
    fn filename_replaces_form_slashes_and_accession_hyphens() {
        let mut metadata = sample_metadata();
        metadata.form = Some("10-K/A".to_string());
        assert_eq!(
            metadata.output_filename("AAPL", "html"),
            "AAPL_10-K_A_2024-11-01_000032019324000123.html"
        );
    }

    #[test]
    fn filename_degrades_to_placeholders() {
        let metadata = FilingMetadata {
            cik10: "0000000099".to_string(),
            company_name: None,
            form: None,
            filing_date: None,
            accession_number: None,
            primary_document: None,
        };
        assert_eq!(
            metadata.output_filename("EMP", "pdf"),
            "EMP_UNKNOWN_unknown-date_unknown-accession.pdf"
        );
    }
}
