use lambda_handlers::config::{self, FanOutConfig};
use lambda_handlers::fan_out::{self, FanOutState};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use notify_client::LambdaInvoker;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    let cfg = FanOutConfig::from_env();
    let aws = config::load_aws().await;

    info!(
        "fan-out ready: child={}, notifier={}",
        cfg.child_function, cfg.notifier_function
    );

    let state = FanOutState {
        invoker: LambdaInvoker::new(aws_sdk_lambda::Client::new(&aws)),
        child_function: cfg.child_function,
        notifier_function: cfg.notifier_function,
    };
    let state = &state;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        let (payload, _context) = event.into_parts();
        Ok::<_, Error>(fan_out::handle(state, &payload).await?)
    }))
    .await
}
