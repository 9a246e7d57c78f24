use crate::ApiResponse;
use anyhow::{bail, Result};
use log::{error, info};
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const SUCCESS_MESSAGE: &str = "Parameters received successfully!";

#[derive(Debug, Serialize)]
pub struct EchoBody {
    #[serde(rename = "queryParameters")]
    pub query_parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokey: Option<Value>,
    #[serde(rename = "Signature", skip_serializing_if = "Option::is_none")]
    pub signature: Option<Value>,
    pub message: &'static str,
}

fn extract(event: &Value) -> Result<EchoBody> {
    let params = match event.get("queryStringParameters") {
        Some(Value::Object(params)) => params,
        None | Some(Value::Null) => bail!("queryStringParameters is missing"),
        Some(other) => bail!("queryStringParameters must be an object, got {other}"),
    };

    Ok(EchoBody {
        query_parameters: params.clone(),
        tokey: params.get("secret").cloned(),
        signature: params.get("popass").cloned(),
        message: SUCCESS_MESSAGE,
    })
}

/// Echoes `secret` and `popass` back. A missing or malformed parameter map
/// is reported as a 500 response rather than a failed invocation.
pub fn handle(event: &Value) -> Result<ApiResponse> {
    match extract(event) {
        Ok(body) => {
            info!("Echoing {} query parameter(s)", body.query_parameters.len());
            ApiResponse::json(200, &body)
        }
        Err(e) => {
            error!("Failed to read query parameters: {e}");
            ApiResponse::json(
                500,
                &json!({
                    "message": "Error processing request",
                    "error": e.to_string(),
                }),
            )
        }
    }
}
