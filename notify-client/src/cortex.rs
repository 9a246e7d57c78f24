//! Paged alert search against the Cortex XDR public API.

use anyhow::{bail, Context, Result};
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

pub const NONCE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Signed requests: nonce, timestamp and a sha256 over both plus the key.
    Advanced,
    Standard,
}

impl KeyType {
    /// Anything other than `advanced` is treated as a standard key.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("advanced") {
            KeyType::Advanced
        } else {
            KeyType::Standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: i64,
    pub key: String,
    pub key_type: KeyType,
}

pub trait AlertSource {
    /// Fetches alerts in the half-open window `search_from..search_to`.
    /// An empty page means there is nothing further.
    fn fetch_page(
        &self,
        search_from: usize,
        search_to: usize,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;
}

pub fn random_nonce<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..NONCE_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

/// Whole seconds scaled to milliseconds, as the API expects.
pub fn timestamp_ms(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() * 1000)
        .unwrap_or(0)
}

pub fn auth_headers(
    api_key: &ApiKey,
    nonce: &str,
    timestamp_ms: u64,
) -> Vec<(&'static str, String)> {
    match api_key.key_type {
        KeyType::Advanced => {
            let signature = Sha256::digest(format!("{}{nonce}{timestamp_ms}", api_key.key));
            vec![
                ("x-xdr-timestamp", timestamp_ms.to_string()),
                ("x-xdr-nonce", nonce.to_string()),
                ("x-xdr-auth-id", api_key.id.to_string()),
                ("Authorization", hex::encode(signature)),
            ]
        }
        KeyType::Standard => vec![
            ("Authorization", api_key.key.clone()),
            ("x-xdr-auth-id", api_key.id.to_string()),
        ],
    }
}

pub fn search_payload(search_from: usize, search_to: usize) -> Value {
    json!({
        "request_data": {
            "filters": [
                {
                    "field": "severity",
                    "operator": "in",
                    "value": ["low", "medium", "high"]
                }
            ],
            "search_from": search_from,
            "search_to": search_to,
            "sort": {
                "field": "creation_time",
                "keyword": "desc"
            }
        }
    })
}

/// `reply.alerts`, or nothing when the reply carries no alert list.
pub fn extract_alerts(reply: &Value) -> Vec<Value> {
    reply
        .pointer("/reply/alerts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct CortexClient {
    pub http: reqwest::Client,
    pub url: String,
    pub api_key: ApiKey,
}

impl CortexClient {
    pub fn new(http: reqwest::Client, fqdn: &str, endpoint: &str, api_key: ApiKey) -> Self {
        CortexClient {
            http,
            url: format!("https://{fqdn}{endpoint}"),
            api_key,
        }
    }
}

impl AlertSource for CortexClient {
    fn fetch_page(
        &self,
        search_from: usize,
        search_to: usize,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send {
        let nonce = random_nonce(&mut rand::thread_rng());
        let headers = auth_headers(&self.api_key, &nonce, timestamp_ms(SystemTime::now()));
        let request = headers.into_iter().fold(
            self.http
                .post(&self.url)
                .json(&search_payload(search_from, search_to)),
            |req, (name, value)| req.header(name, value),
        );
        let url = self.url.clone();

        async move {
            let response = request
                .send()
                .await
                .with_context(|| format!("POST {url}"))?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                let text = response.text().await.unwrap_or_default();
                bail!("API request failed with status {status}: {text}");
            }

            let reply: Value = response.json().await.context("decode alert reply")?;
            let alerts = extract_alerts(&reply);
            debug!("Fetched {} alerts in [{search_from}, {search_to})", alerts.len());
            Ok(alerts)
        }
    }
}
