use lambda_handlers::alerts::AlertsState;
use lambda_handlers::config::{
    self, load_env, AlertsConfig, ExportConfig, FanOutConfig, PublishRecordConfig,
};
use lambda_handlers::export_table::ExportState;
use lambda_handlers::fan_out::FanOutState;
use lambda_handlers::gateway::{self, Gateway};
use lambda_handlers::publish_record::PublishRecordState;
use log::{error, info};
use notify_client::{
    utils, DynamoRecordStore, LambdaInvoker, S3ObjectStore, SnsPublisher, SsmSecretStore,
};
use ntex::web;
use std::sync::Arc;

/// Uses the configured ARN when set, otherwise creates (or looks up) the
/// named topic.
async fn resolve_topic(
    client: &aws_sdk_sns::Client,
    cfg: &PublishRecordConfig,
) -> anyhow::Result<String> {
    if cfg.topic_arn.is_empty() {
        utils::ensure_topic(client, &cfg.topic_name).await
    } else {
        Ok(cfg.topic_arn.clone())
    }
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    lambda_handlers::init();

    let publish_cfg = PublishRecordConfig::from_env();
    let export_cfg = ExportConfig::from_env();
    let fan_out_cfg = FanOutConfig::from_env();
    let alerts_cfg = AlertsConfig::from_env().map_err(|e| std::io::Error::other(format!("{e:#}")))?;
    let bind_addr = load_env("BIND_ADDRESS", "0.0.0.0:8080");

    let aws = config::load_aws().await;
    let sns = aws_sdk_sns::Client::new(&aws);
    let dynamo = aws_sdk_dynamodb::Client::new(&aws);
    let s3 = aws_sdk_s3::Client::new(&aws);

    let topic = match resolve_topic(&sns, &publish_cfg).await {
        Ok(arn) => arn,
        Err(e) => {
            error!("Topic ensure failed: {e:#}");
            publish_cfg.topic_name.clone()
        }
    };

    info!(
        "Starting local gateway on {bind_addr}, topic={topic}, table={}, bucket={}",
        publish_cfg.table, export_cfg.bucket
    );

    let state = Arc::new(Gateway {
        publish: PublishRecordState {
            publisher: SnsPublisher::new(sns),
            store: DynamoRecordStore::new(dynamo.clone(), publish_cfg.table),
            topic,
            message: publish_cfg.message,
        },
        export: ExportState {
            store: DynamoRecordStore::new(dynamo, export_cfg.table),
            objects: S3ObjectStore::new(s3.clone()),
            bucket: export_cfg.bucket,
        },
        fan_out: FanOutState {
            invoker: LambdaInvoker::new(aws_sdk_lambda::Client::new(&aws)),
            child_function: fan_out_cfg.child_function,
            notifier_function: fan_out_cfg.notifier_function,
        },
        alerts: AlertsState {
            secrets: SsmSecretStore::new(aws_sdk_ssm::Client::new(&aws)),
            objects: S3ObjectStore::new(s3),
            config: alerts_cfg,
        },
        http: reqwest::Client::new(),
    });

    web::server(move || {
        let s = state.clone();
        web::App::new()
            .state(s)
            .route("/health", web::get().to(async || "OK"))
            .route("/publish", web::post().to(gateway::publish))
            .route("/date", web::get().to(gateway::date))
            .route("/echo", web::get().to(gateway::echo))
            .route("/export", web::post().to(gateway::export))
            .route("/fan-out", web::post().to(gateway::dispatch_order))
            .route("/alerts", web::post().to(gateway::collect_alerts))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
