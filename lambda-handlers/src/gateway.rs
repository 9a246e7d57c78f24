//! HTTP front for running every handler locally behind one server.

use crate::alerts::{self, AlertsState, CortexSettings};
use crate::export_table::{self, ExportState};
use crate::fan_out::{self, FanOutState};
use crate::publish_record::{self, PublishRecordState};
use crate::{date_random, echo_params, ApiResponse};
use chrono::Utc;
use log::error;
use notify_client::cortex::CortexClient;
use notify_client::{
    DynamoRecordStore, LambdaInvoker, S3ObjectStore, SnsPublisher, SsmSecretStore,
};
use ntex::http::StatusCode;
use ntex::web;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

pub struct Gateway {
    pub publish: PublishRecordState<SnsPublisher, DynamoRecordStore>,
    pub export: ExportState<DynamoRecordStore, S3ObjectStore>,
    pub fan_out: FanOutState<LambdaInvoker>,
    pub alerts: AlertsState<SsmSecretStore, S3ObjectStore>,
    pub http: reqwest::Client,
}

type State = web::types::State<Arc<Gateway>>;

fn into_http(resp: ApiResponse) -> web::HttpResponse {
    let status =
        StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    web::HttpResponse::build(status)
        .content_type(resp.content_type)
        .body(resp.body)
}

fn failure(route: &str, e: anyhow::Error) -> web::HttpResponse {
    error!("{route} failed: {e:#}");
    web::HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
        .body(format!("{route} error: {e:#}"))
}

/// An empty query string maps to a missing parameter map, as the proxy
/// integration does.
pub fn query_event(params: HashMap<String, String>) -> Value {
    let mut event = Map::new();
    let params = if params.is_empty() {
        Value::Null
    } else {
        Value::Object(params.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    };
    event.insert("queryStringParameters".to_string(), params);
    Value::Object(event)
}

pub async fn publish(data: State) -> Result<web::HttpResponse, web::Error> {
    let mut rng = StdRng::from_entropy();
    match publish_record::handle(&data.publish, &mut rng, SystemTime::now).await {
        Ok(ack) => Ok(web::HttpResponse::Ok().json(&ack)),
        Err(e) => Ok(failure("publish", e)),
    }
}

pub async fn date() -> Result<web::HttpResponse, web::Error> {
    let mut rng = StdRng::from_entropy();
    match date_random::handle(Utc::now(), &mut rng) {
        Ok(resp) => Ok(into_http(resp)),
        Err(e) => Ok(failure("date", e)),
    }
}

pub async fn echo(
    query: web::types::Query<HashMap<String, String>>,
) -> Result<web::HttpResponse, web::Error> {
    let event = query_event(query.into_inner());
    match echo_params::handle(&event) {
        Ok(resp) => Ok(into_http(resp)),
        Err(e) => Ok(failure("echo", e)),
    }
}

pub async fn export(data: State) -> Result<web::HttpResponse, web::Error> {
    let mut rng = StdRng::from_entropy();
    match export_table::handle(&data.export, &mut rng, Utc::now()).await {
        Ok(resp) => Ok(into_http(resp)),
        Err(e) => Ok(failure("export", e)),
    }
}

pub async fn dispatch_order(
    data: State,
    body: web::types::Json<Value>,
) -> Result<web::HttpResponse, web::Error> {
    match fan_out::handle(&data.fan_out, &body.into_inner()).await {
        Ok(out) => Ok(web::HttpResponse::Ok().json(&out)),
        Err(e) => Ok(failure("fan-out", e)),
    }
}

pub async fn collect_alerts(data: State) -> Result<web::HttpResponse, web::Error> {
    let http = data.http.clone();
    let connect = move |settings: CortexSettings| {
        Ok::<_, anyhow::Error>(CortexClient::new(
            http,
            &settings.fqdn,
            &settings.endpoint,
            settings.api_key,
        ))
    };
    match alerts::handle(&data.alerts, connect, Utc::now()).await {
        Ok(resp) => Ok(into_http(resp)),
        Err(e) => Ok(failure("alerts", e)),
    }
}
