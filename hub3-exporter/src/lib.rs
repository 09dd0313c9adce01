//! Prometheus exporter for Virgin Media / UPC Hub3 cable modems.
//!
//! Every scrape of the metrics endpoint runs one collection cycle against the
//! modem and renders the per-channel DOCSIS metrics in Prometheus text
//! format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Hub3 modem    │<────│ ScrapeCollector │<────│   HTTP Server   │
//! │  (/walk?oids=)  │     │ (collect+render)│     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! hub3-exporter --modem-ip 192.168.100.1
//! hub3-exporter --config hub3.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod http;
pub mod mapping;

pub use collector::{ScrapeCollector, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
