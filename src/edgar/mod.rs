// src/edgar/mod.rs
pub mod client;
pub mod fetch;
pub mod models;

// Re-export the client for convenience
#[allow(unused_imports)]
pub use client::EdgarClient;
