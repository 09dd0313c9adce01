//! Integration tests for the Hub3 exporter.
//!
//! A mock modem and the real HTTP server run in-process; the tests scrape
//! the metrics endpoint over HTTP like Prometheus would.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;

use hub3_exporter::config::PrometheusConfig;
use hub3_exporter::{HttpServer, ScrapeCollector, SharedCollector};
use hub3_modem::tables::{
    OID_DOWNSTREAM_CHANNELS, OID_DOWNSTREAM_CORRECTEDS, OID_DOWNSTREAM_SNR,
    OID_DOWNSTREAM_UNCORRECTABLES, OID_UPSTREAM_CHANNELS, OID_UPSTREAM_CHANNELS_VENDOR,
    OID_UPSTREAM_POWER,
};
use hub3_modem::{ChannelAggregator, Compatibility, ModemClient};

/// Mock modem answering walks from a fixed OID to body map.
/// Unknown OIDs get HTTP 500.
#[derive(Clone, Default)]
struct MockModem {
    bodies: Arc<Mutex<HashMap<String, String>>>,
}

impl MockModem {
    fn set(&self, oid: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(oid.to_string(), body.to_string());
    }

    fn remove(&self, oid: &str) {
        self.bodies.lock().unwrap().remove(oid);
    }
}

async fn walk_handler(State(modem): State<MockModem>, RawQuery(query): RawQuery) -> Response {
    let oid = query
        .as_deref()
        .and_then(|q| q.strip_prefix("oids="))
        .map(|q| q.trim_end_matches(';'))
        .unwrap_or_default()
        .to_string();

    let body = modem.bodies.lock().unwrap().get(&oid).cloned();
    match body {
        Some(body) => ([("content-type", "application/json")], body).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn spawn_modem(modem: MockModem) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new()
        .route("/walk", get(walk_handler))
        .with_state(modem);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

/// A modem with one downstream and one upstream channel, in the shape a
/// Hub3 answers.
fn populated_modem() -> MockModem {
    let modem = MockModem::default();
    modem.set(
        OID_DOWNSTREAM_CHANNELS,
        r#"{
            "1.3.6.1.2.1.10.127.1.1.1.1.1.3": "3",
            "1.3.6.1.2.1.10.127.1.1.1.1.2.3": "500000000",
            "1.3.6.1.2.1.10.127.1.1.1.1.3.3": "8000000",
            "1.3.6.1.2.1.10.127.1.1.1.1.6.3": "57",
            "1": "Finish"
        }"#,
    );
    modem.set(
        OID_DOWNSTREAM_SNR,
        r#"{"1.3.6.1.4.1.4491.2.1.20.1.24.1.1.3": "350", "1": "Finish"}"#,
    );
    modem.set(
        OID_DOWNSTREAM_CORRECTEDS,
        r#"{"1.3.6.1.2.1.10.127.1.1.4.1.3.3": "12", "1": "Finish"}"#,
    );
    modem.set(
        OID_DOWNSTREAM_UNCORRECTABLES,
        r#"{"1.3.6.1.2.1.10.127.1.1.4.1.4.3": "2", "1": "Finish"}"#,
    );
    modem.set(
        OID_UPSTREAM_CHANNELS_VENDOR,
        r#"{"1.3.6.1.4.1.4115.1.3.4.1.9.2.1.1.1": "1", "1": "Finish"}"#,
    );
    modem.set(
        OID_UPSTREAM_CHANNELS,
        r#"{"1.3.6.1.2.1.10.127.1.1.2.1.2.1": "36000000", "1": "Finish"}"#,
    );
    modem.set(
        OID_UPSTREAM_POWER,
        r#"{"1.3.6.1.4.1.4491.2.1.20.1.2.1.1.1": "455", "1": "Finish"}"#,
    );
    modem
}

fn create_collector(modem_addr: SocketAddr, compatibility: Compatibility) -> SharedCollector {
    let client = ModemClient::new(&modem_addr.to_string(), Duration::from_secs(2)).unwrap();
    let aggregator = Arc::new(ChannelAggregator::new(client, compatibility));
    Arc::new(ScrapeCollector::new(aggregator, &PrometheusConfig::default()))
}

/// Start the exporter on an ephemeral port.
async fn start_exporter(
    collector: SharedCollector,
    metrics_path: &str,
) -> (SocketAddr, watch::Sender<bool>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(collector, addr, metrics_path.to_string());
    let handle = tokio::spawn(async move {
        let _ = server.serve(listener, shutdown_rx).await;
    });

    (addr, shutdown_tx, handle)
}

/// Extract the value of an exact `name{labels}` series from exposition text.
fn sample_value(body: &str, series: &str) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.rsplit_once(' ')?;
            if name == series {
                value.parse().ok()
            } else {
                None
            }
        })
}

async fn scrape(addr: SocketAddr, path: &str) -> String {
    let response = reqwest::Client::new()
        .get(format!("http://{}{}", addr, path))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.text().await.unwrap()
}

#[tokio::test]
async fn test_scrape_legacy_metrics() {
    let modem_addr = spawn_modem(populated_modem()).await;
    let collector = create_collector(modem_addr, Compatibility::Legacy);
    let (addr, shutdown_tx, handle) = start_exporter(collector, "/metrics").await;

    let body = scrape(addr, "/metrics").await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    assert_eq!(
        sample_value(&body, "hub3_downstream_frequency_hertz{channel=\"3\"}"),
        Some(500_000_000.0)
    );
    assert_eq!(
        sample_value(&body, "hub3_downstream_power_dbmv{channel=\"3\"}"),
        Some(5.7)
    );
    assert_eq!(
        sample_value(&body, "hub3_downstream_snr_db{channel=\"3\"}"),
        Some(35.0)
    );
    assert_eq!(
        sample_value(&body, "hub3_downstream_pre_rs_errors{channel=\"3\"}"),
        Some(12.0)
    );
    // Legacy mode walks the pre-RS table for post-RS too
    assert_eq!(
        sample_value(&body, "hub3_downstream_post_rs_errors{channel=\"3\"}"),
        Some(12.0)
    );
    assert_eq!(
        sample_value(&body, "hub3_upstream_power_dbmv{channel=\"1\"}"),
        Some(45.5)
    );
    assert!(!body.contains("hub3_upstream_frequency_hertz"));
    assert!(body.contains("# TYPE hub3_downstream_pre_rs_errors gauge"));
    assert_eq!(sample_value(&body, "hub3_up"), Some(1.0));
}

#[tokio::test]
async fn test_scrape_corrected_metrics() {
    let modem_addr = spawn_modem(populated_modem()).await;
    let collector = create_collector(modem_addr, Compatibility::Corrected);
    let (addr, shutdown_tx, handle) = start_exporter(collector, "/metrics").await;

    let body = scrape(addr, "/metrics").await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    assert_eq!(
        sample_value(&body, "hub3_downstream_post_rs_errors{channel=\"3\"}"),
        Some(2.0)
    );
    assert_eq!(
        sample_value(&body, "hub3_upstream_frequency_hertz{channel=\"1\"}"),
        Some(36_000_000.0)
    );
    assert!(body.contains("# TYPE hub3_downstream_post_rs_errors counter"));
}

#[tokio::test]
async fn test_scrape_serves_stale_data_when_modem_fails() {
    let modem = populated_modem();
    let modem_addr = spawn_modem(modem.clone()).await;
    let collector = create_collector(modem_addr, Compatibility::Legacy);
    let (addr, shutdown_tx, handle) = start_exporter(collector, "/metrics").await;

    scrape(addr, "/metrics").await;

    // Every table starts failing
    for oid in [
        OID_DOWNSTREAM_CHANNELS,
        OID_DOWNSTREAM_SNR,
        OID_DOWNSTREAM_CORRECTEDS,
        OID_UPSTREAM_CHANNELS_VENDOR,
        OID_UPSTREAM_POWER,
    ] {
        modem.remove(oid);
    }

    let body = scrape(addr, "/metrics").await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    assert_eq!(sample_value(&body, "hub3_up"), Some(0.0));
    assert_eq!(
        sample_value(&body, "hub3_downstream_snr_db{channel=\"3\"}"),
        Some(35.0)
    );
    assert_eq!(
        sample_value(&body, "hub3_exporter_failed_cycles_total"),
        Some(1.0)
    );
    assert_eq!(sample_value(&body, "hub3_exporter_cycles_total"), Some(2.0));
    assert_eq!(
        sample_value(
            &body,
            "hub3_exporter_table_failures_total{table=\"downstream_snr\"}"
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn test_scrape_counts_skipped_entries() {
    let modem = MockModem::default();
    modem.set(
        OID_DOWNSTREAM_SNR,
        r#"{
            "1.3.6.1.4.1.4491.2.1.20.1.24.1.1.3": "350",
            "1.3.6.1.4.1.4491.2.1.20.1.24.1.1.4": "unavailable",
            "1.3.6.1.4.1.4491.2.1.20.1.24.1.1.x": "300",
            "1": "Finish"
        }"#,
    );
    let modem_addr = spawn_modem(modem).await;
    let collector = create_collector(modem_addr, Compatibility::Legacy);
    let (addr, shutdown_tx, handle) = start_exporter(collector, "/metrics").await;

    let body = scrape(addr, "/metrics").await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    let skipped = |reason: &str| {
        sample_value(
            &body,
            &format!("hub3_exporter_entries_skipped_total{{reason=\"{}\"}}", reason),
        )
    };
    assert_eq!(skipped("too_few_components"), Some(1.0));
    assert_eq!(skipped("invalid_value"), Some(1.0));
    assert_eq!(skipped("invalid_index"), Some(1.0));

    // Channel 4 exists with its SNR left at zero
    assert_eq!(
        sample_value(&body, "hub3_downstream_snr_db{channel=\"4\"}"),
        Some(0.0)
    );
    // Only the SNR table answered
    assert_eq!(sample_value(&body, "hub3_up"), Some(1.0));
}

#[tokio::test]
async fn test_landing_page_links_metrics_path() {
    let modem_addr = spawn_modem(MockModem::default()).await;
    let collector = create_collector(modem_addr, Compatibility::Legacy);
    let (addr, shutdown_tx, handle) = start_exporter(collector, "/hub3").await;

    let body = scrape(addr, "/").await;
    let metrics = scrape(addr, "/hub3").await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    assert!(body.contains("<a href=\"/hub3\">Metrics</a>"));
    assert!(metrics.contains("# TYPE hub3_up gauge"));
}
