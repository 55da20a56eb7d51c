// src/utils/error.rs
#![allow(dead_code)]
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    // Retrying won't fix an active block; must be surfaced distinctly.
    #[error("SEC returned the automated tool blocking page for {0}")]
    AutomatedToolBlock(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser automation failed: {0}")]
    Browser(#[from] anyhow::Error), // headless_chrome APIs return anyhow::Result

    #[error("Source document not found: {0}")]
    SourceMissing(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Fetch(#[from] FetchError), // Automatically convert fetch errors

    #[error("PDF rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
