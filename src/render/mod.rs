// src/render/mod.rs
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::RequestPausedDecision;
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::{
    events::RequestPausedEvent, FailRequest, RequestPattern, RequestStage,
};
use headless_chrome::protocol::cdp::Network::ErrorReason;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::Browser;

use crate::utils::error::RenderError;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

// Letter pages with 20mm top/bottom and 12mm side margins; Chromium takes
// paper dimensions in inches.
const PAGE_WIDTH_IN: f64 = 8.5;
const PAGE_HEIGHT_IN: f64 = 11.0;
const MARGIN_VERTICAL_IN: f64 = 0.79;
const MARGIN_HORIZONTAL_IN: f64 = 0.47;

const FOOTER_TEMPLATE: &str = r#"<div style="font-size:10px; width:100%; padding:0 12mm; color:#666;">
  <span style="float:right;">
    Page <span class="pageNumber"></span> of <span class="totalPages"></span>
  </span>
</div>"#;

/// Requests a render may never make: anything leaving the local machine.
fn is_network_request(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn pdf_options() -> PrintToPdfOptions {
    PrintToPdfOptions {
        display_header_footer: Some(true),
        print_background: Some(true),
        paper_width: Some(PAGE_WIDTH_IN),
        paper_height: Some(PAGE_HEIGHT_IN),
        margin_top: Some(MARGIN_VERTICAL_IN),
        margin_bottom: Some(MARGIN_VERTICAL_IN),
        margin_left: Some(MARGIN_HORIZONTAL_IN),
        margin_right: Some(MARGIN_HORIZONTAL_IN),
        header_template: Some("<div></div>".to_string()),
        footer_template: Some(FOOTER_TEMPLATE.to_string()),
        ..Default::default()
    }
}

/// Renders a previously downloaded HTML document to a paginated PDF.
///
/// The page is loaded via a file:// URL and every network-scheme request is
/// aborted at the CDP layer, so the render stays offline even when the
/// document references external resources. The browser and tab live only for
/// the duration of this call and are torn down on every exit path.
pub fn render_pdf(html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
    let absolute = html_path
        .canonicalize()
        .map_err(|_| RenderError::SourceMissing(html_path.display().to_string()))?;
    let file_url = format!("file://{}", absolute.display());

    let browser = Browser::default()?;
    let tab = browser.new_tab()?;
    tab.set_default_timeout(NAVIGATION_TIMEOUT);

    let patterns = vec![RequestPattern {
        url_pattern: Some("*".to_string()),
        resource_Type: None,
        request_stage: Some(RequestStage::Request),
    }];
    tab.enable_fetch(Some(&patterns), None)?;

    let blocked = Arc::new(AtomicUsize::new(0));
    let blocked_counter = Arc::clone(&blocked);
    tab.enable_request_interception(Arc::new(
        move |_transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent| {
            let request_url = event.params.request.url.clone();
            if is_network_request(&request_url) {
                blocked_counter.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Blocked external request during render: {}", request_url);
                RequestPausedDecision::Fail(FailRequest {
                    request_id: event.params.request_id,
                    error_reason: ErrorReason::BlockedByClient,
                })
            } else {
                RequestPausedDecision::Continue(None)
            }
        },
    ))?;

    tab.navigate_to(&file_url)?;
    tab.wait_until_navigated()?;

    let pdf = tab.print_to_pdf(Some(pdf_options()))?;
    std::fs::write(pdf_path, pdf)?;

    let blocked = blocked.load(Ordering::Relaxed);
    if blocked > 0 {
        tracing::info!(
            "Render of {} blocked {} external request(s)",
            html_path.display(),
            blocked
        );
    }
    tracing::info!("Saved PDF: {}", pdf_path.display());
    Ok(())
}
