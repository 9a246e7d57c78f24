use lambda_handlers::config::{self, PublishRecordConfig};
use lambda_handlers::publish_record::{self, PublishRecordState};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use notify_client::{DynamoRecordStore, SnsPublisher};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::time::SystemTime;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    let cfg = PublishRecordConfig::from_env();
    let aws = config::load_aws().await;
    let topic = cfg.required_topic_arn()?.to_string();

    info!("publish-record ready: topic={topic}, table={}", cfg.table);

    let state = PublishRecordState {
        publisher: SnsPublisher::new(aws_sdk_sns::Client::new(&aws)),
        store: DynamoRecordStore::new(aws_sdk_dynamodb::Client::new(&aws), cfg.table),
        topic,
        message: cfg.message,
    };
    let state = &state;

    run(service_fn(move |_event: LambdaEvent<Value>| async move {
        let mut rng = StdRng::from_entropy();
        let ack = publish_record::handle(state, &mut rng, SystemTime::now).await?;
        Ok::<_, Error>(ack)
    }))
    .await
}
