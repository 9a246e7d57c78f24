use anyhow::{Context, Result};
use log::info;
use notify_client::FunctionInvoker;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct FanOutState<I> {
    pub invoker: I,
    pub child_function: String,
    pub notifier_function: String,
}

pub fn default_order() -> Value {
    json!({
        "ProductName": "iPhone SE",
        "Quantity": 2,
        "UnitPrice": 499
    })
}

/// Object events are forwarded as the order; anything else gets the default.
pub fn order_from_event(event: &Value) -> Value {
    match event {
        Value::Object(_) => event.clone(),
        _ => default_order(),
    }
}

/// Calls the child with the order and waits for its answer, then queues the
/// notifier. Returns the child's decoded response.
pub async fn handle<I: FunctionInvoker>(state: &FanOutState<I>, event: &Value) -> Result<Value> {
    let order = order_from_event(event);
    let payload = serde_json::to_vec(&order)?;

    let response = state
        .invoker
        .invoke_sync(&state.child_function, payload)
        .await?;
    info!(
        "Child {} answered with {} bytes",
        state.child_function,
        response.len()
    );

    state
        .invoker
        .invoke_async(&state.notifier_function, Vec::new())
        .await?;
    info!("Queued notifier {}", state.notifier_function);

    if response.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response)
        .with_context(|| format!("decode response from {}", state.child_function))
}
