//! HTTP client for the modem's OID walk endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::error::{ClientError, Result};

/// Raw walk result: dotted OID identifier to value text.
pub type WalkTable = BTreeMap<String, String>;

/// Client for `GET /walk?oids=<oid>;` on a Hub3 modem.
#[derive(Debug, Clone)]
pub struct ModemClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ModemClient {
    /// Create a client for the modem at `address`.
    ///
    /// `address` can be a host (`192.168.100.1`), a `host:port`, or a full
    /// base URL. `timeout` bounds every request.
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_url: base_url(address),
            timeout,
        })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the walk URL for an OID prefix.
    pub fn walk_url(&self, oid: &str) -> String {
        format!("{}/walk?oids={};", self.base_url, oid)
    }

    /// Walk one table and return its entries.
    pub async fn fetch_table(&self, oid: &str) -> Result<WalkTable> {
        let url = self.walk_url(oid);
        tracing::trace!(url = %url, "Walking table");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(oid, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                oid: oid.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| request_error(oid, e))?;
        decode_walk(oid, &body)
    }
}

fn request_error(oid: &str, source: reqwest::Error) -> ClientError {
    if source.is_timeout() {
        ClientError::Timeout {
            oid: oid.to_string(),
        }
    } else {
        ClientError::Request {
            oid: oid.to_string(),
            source,
        }
    }
}

fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Decode a walk response body into a [`WalkTable`].
///
/// Values are normally strings. Anything else is kept as its JSON text so
/// the caller can account for it when it fails to parse.
pub fn decode_walk(oid: &str, body: &[u8]) -> Result<WalkTable> {
    let value: Value = serde_json::from_slice(body).map_err(|source| ClientError::Decode {
        oid: oid.to_string(),
        source,
    })?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ClientError::NotAnObject {
                oid: oid.to_string(),
                kind: json_kind(&other),
            });
        }
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
