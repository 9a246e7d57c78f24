use chrono::Utc;
use lambda_handlers::date_random;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_handlers::init();

    run(service_fn(|_event: LambdaEvent<Value>| async {
        let mut rng = StdRng::from_entropy();
        Ok::<_, Error>(date_random::handle(Utc::now(), &mut rng)?)
    }))
    .await
}
