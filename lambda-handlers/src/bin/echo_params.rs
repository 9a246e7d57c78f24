use lambda_handlers::echo_params;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    run(service_fn(|event: LambdaEvent<Value>| async move {
        Ok::<_, Error>(echo_params::handle(&event.payload)?)
    }))
    .await
}
