use crate::ApiResponse;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use notify_client::{ObjectStore, RecordStore};
use rand::distributions::Alphanumeric;
use rand::Rng;

const FOLDER_LEN: usize = 10;

#[derive(Clone)]
pub struct ExportState<S, O> {
    pub store: S,
    pub objects: O,
    pub bucket: String,
}

pub fn random_folder<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..FOLDER_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

pub fn object_key(folder: &str, table: &str, now: DateTime<Utc>) -> String {
    format!("{folder}{table}-{}.json", now.format("%Y%m%d-%H%M%S"))
}

/// Copies the whole table into one JSON document under a random prefix.
pub async fn handle<S, O, R>(
    state: &ExportState<S, O>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<ApiResponse>
where
    S: RecordStore,
    O: ObjectStore,
    R: Rng + ?Sized,
{
    let table = state.store.table().to_string();
    let records = state.store.scan().await?;
    let body = serde_json::to_vec(&records).context("encode records")?;

    let key = object_key(&random_folder(rng), &table, now);
    state.objects.put_json(&state.bucket, &key, body).await?;
    info!(
        "Exported {} records from table={table} to s3://{}/{key}",
        records.len(),
        state.bucket
    );

    Ok(ApiResponse::text(
        200,
        format!(
            "Wrote {} items from DynamoDB table '{table}' to S3 bucket '{}' at {key}",
            records.len(),
            state.bucket
        ),
    ))
}
