use chrono::Utc;
use lambda_handlers::alerts::{self, AlertsState};
use lambda_handlers::config::{self, AlertsConfig};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use notify_client::cortex::CortexClient;
use notify_client::{S3ObjectStore, SsmSecretStore};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    let cfg = AlertsConfig::from_env()?;
    let aws = config::load_aws().await;

    info!(
        "collect-alerts ready: bucket={}, count_per_page={}, max_pages={}",
        cfg.bucket, cfg.count_per_page, cfg.max_pages
    );

    let state = AlertsState {
        secrets: SsmSecretStore::new(aws_sdk_ssm::Client::new(&aws)),
        objects: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws)),
        config: cfg,
    };
    let http = reqwest::Client::new();
    let (state, http) = (&state, &http);

    run(service_fn(move |_event: LambdaEvent<Value>| async move {
        let connect = |settings: alerts::CortexSettings| {
            Ok::<_, anyhow::Error>(CortexClient::new(
                http.clone(),
                &settings.fqdn,
                &settings.endpoint,
                settings.api_key,
            ))
        };
        Ok::<_, Error>(alerts::handle(state, connect, Utc::now()).await?)
    }))
    .await
}
