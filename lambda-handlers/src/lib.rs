pub mod alerts;
pub mod config;
pub mod date_random;
pub mod echo_params;
pub mod export_table;
pub mod fan_out;
pub mod gateway;
pub mod publish_record;

use serde::Serialize;

/// Proxy-style response: a status code plus an already encoded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: String,
    #[serde(skip)]
    pub content_type: &'static str,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> anyhow::Result<Self> {
        Ok(ApiResponse {
            status_code,
            body: serde_json::to_string(body)?,
            content_type: "application/json",
        })
    }

    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            status_code,
            body: body.into(),
            content_type: "text/plain; charset=utf-8",
        }
    }
}

/// Initialises `.env` loading and logging for a binary.
pub fn init() {
    dotenvy::dotenv().ok();
    env_logger::init();
}
