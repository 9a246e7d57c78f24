use chrono::Utc;
use lambda_handlers::config::{self, ExportConfig};
use lambda_handlers::export_table::{self, ExportState};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use notify_client::{DynamoRecordStore, S3ObjectStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    let cfg = ExportConfig::from_env();
    let aws = config::load_aws().await;

    info!("export-table ready: table={}, bucket={}", cfg.table, cfg.bucket);

    let state = ExportState {
        store: DynamoRecordStore::new(aws_sdk_dynamodb::Client::new(&aws), cfg.table),
        objects: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws)),
        bucket: cfg.bucket,
    };
    let state = &state;

    run(service_fn(move |_event: LambdaEvent<Value>| async move {
        let mut rng = StdRng::from_entropy();
        Ok::<_, Error>(export_table::handle(state, &mut rng, Utc::now()).await?)
    }))
    .await
}
