use crate::{PutAck, Record};
use anyhow::{anyhow, bail, Context, Result};
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnConsumedCapacity};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_s3::primitives::ByteStream;
use log::{debug, error, info};
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;

pub async fn publish_message(
    client: &aws_sdk_sns::Client,
    topic_arn: &str,
    message: &str,
) -> Result<String> {
    let sent = client
        .publish()
        .topic_arn(topic_arn)
        .message(message)
        .send()
        .await;

    match sent {
        Ok(output) => {
            let message_id = output.message_id().unwrap_or_default().to_string();
            debug!("Message delivered to {topic_arn}: id={message_id}");
            Ok(message_id)
        }
        Err(e) => {
            error!("Failed to publish to {topic_arn}: {e:?}");
            Err(anyhow!(e).context(format!("publish to {topic_arn}")))
        }
    }
}

/// Creates the topic if needed and returns its ARN. Topic creation is
/// idempotent, so an existing topic simply yields its ARN.
pub async fn ensure_topic(client: &aws_sdk_sns::Client, name: &str) -> Result<String> {
    let output = client
        .create_topic()
        .name(name)
        .send()
        .await
        .with_context(|| format!("create topic {name}"))?;

    match output.topic_arn() {
        Some(arn) => {
            info!("Topic ready: {name} ({arn})");
            Ok(arn.to_string())
        }
        None => bail!("create topic {name} returned no ARN"),
    }
}

pub fn record_to_item(record: &Record) -> Item {
    HashMap::from([
        (
            "timestamp".to_string(),
            AttributeValue::N(record.timestamp.to_string()),
        ),
        ("label".to_string(), AttributeValue::S(record.label.clone())),
    ])
}

/// Decodes a DynamoDB number into whole seconds. Integers are taken as-is;
/// plain decimals are floored. Exponents and out-of-range values are errors.
pub fn parse_timestamp(n: &str) -> Result<i64> {
    if let Ok(v) = n.parse::<i64>() {
        return Ok(v);
    }

    let (whole, fraction) = n
        .split_once('.')
        .with_context(|| format!("timestamp {n:?} is not an integer"))?;
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        bail!("timestamp {n:?} is not a plain decimal");
    }
    let negative = whole.starts_with('-');
    let whole = match whole {
        "" | "-" | "+" => 0,
        _ => whole
            .parse::<i64>()
            .with_context(|| format!("timestamp {n:?} is out of range"))?,
    };

    if negative && fraction.bytes().any(|b| b != b'0') {
        whole
            .checked_sub(1)
            .with_context(|| format!("timestamp {n:?} is out of range"))
    } else {
        Ok(whole)
    }
}

/// A missing label reads as "0"; a missing or non-numeric timestamp is an error.
pub fn record_from_item(item: &Item) -> Result<Record> {
    let timestamp = match item.get("timestamp") {
        Some(AttributeValue::N(n)) => parse_timestamp(n)?,
        Some(other) => bail!("timestamp has unexpected type: {other:?}"),
        None => bail!("item has no timestamp"),
    };
    let label = match item.get("label") {
        Some(AttributeValue::S(s)) => s.clone(),
        Some(AttributeValue::N(n)) => n.clone(),
        _ => "0".to_string(),
    };
    Ok(Record { timestamp, label })
}

pub async fn put_record(
    client: &aws_sdk_dynamodb::Client,
    table: &str,
    record: &Record,
) -> Result<PutAck> {
    let sent = client
        .put_item()
        .table_name(table)
        .set_item(Some(record_to_item(record)))
        .return_consumed_capacity(ReturnConsumedCapacity::Total)
        .send()
        .await;

    match sent {
        Ok(output) => {
            debug!("Record stored in {table}: {record:?}");
            Ok(PutAck {
                table: table.to_string(),
                request_id: output.request_id().map(str::to_string),
                consumed_capacity_units: output
                    .consumed_capacity()
                    .and_then(|c| c.capacity_units()),
            })
        }
        Err(e) => {
            error!("Failed to put record into {table}: {e:?}");
            Err(anyhow!(e).context(format!("put item into {table}")))
        }
    }
}

pub async fn scan_records(client: &aws_sdk_dynamodb::Client, table: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut start_key: Option<Item> = None;
    let mut pages = 0usize;

    loop {
        let output = client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .with_context(|| format!("scan {table}"))?;
        pages += 1;

        for item in output.items.unwrap_or_default() {
            records.push(record_from_item(&item)?);
        }

        match output.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    debug!("Scanned {} records from {table} in {pages} page(s)", records.len());
    Ok(records)
}

pub async fn get_parameter(client: &aws_sdk_ssm::Client, name: &str) -> Result<String> {
    let output = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| {
            error!("Error retrieving SSM parameter {name}: {e:?}");
            anyhow!(e).context(format!("get parameter {name}"))
        })?;

    match output.parameter().and_then(|p| p.value()) {
        Some(value) => Ok(value.to_string()),
        None => bail!("parameter {name} has no value"),
    }
}

pub async fn put_json_object(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
) -> Result<()> {
    let size = body.len();
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type("application/json")
        .body(ByteStream::from(body))
        .send()
        .await
        .map_err(|e| {
            error!("Failed to upload s3://{bucket}/{key}: {e:?}");
            anyhow!(e).context(format!("put object s3://{bucket}/{key}"))
        })?;

    debug!("Uploaded {size} bytes to s3://{bucket}/{key}");
    Ok(())
}

pub async fn invoke_function(
    client: &aws_sdk_lambda::Client,
    function: &str,
    payload: Vec<u8>,
) -> Result<Vec<u8>> {
    let output = client
        .invoke()
        .function_name(function)
        .invocation_type(InvocationType::RequestResponse)
        .payload(Blob::new(payload))
        .send()
        .await
        .with_context(|| format!("invoke {function}"))?;

    let body = output.payload.map(Blob::into_inner).unwrap_or_default();
    if let Some(kind) = output.function_error {
        let detail = String::from_utf8_lossy(&body);
        error!("Function {function} failed ({kind}): {detail}");
        bail!("function {function} failed ({kind}): {detail}");
    }

    debug!("Function {function} returned {} bytes", body.len());
    Ok(body)
}

pub async fn invoke_function_event(
    client: &aws_sdk_lambda::Client,
    function: &str,
    payload: Vec<u8>,
) -> Result<()> {
    let output = client
        .invoke()
        .function_name(function)
        .invocation_type(InvocationType::Event)
        .payload(Blob::new(payload))
        .send()
        .await
        .with_context(|| format!("invoke {function} (event)"))?;

    debug!("Queued event for {function}: status={}", output.status_code);
    Ok(())
}
