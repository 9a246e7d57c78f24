pub mod cortex;
pub mod utils;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A single persisted entry: when it was written and a random label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: i64,
    pub label: String,
}

/// Acknowledgment returned by a table insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutAck {
    pub table: String,
    pub request_id: Option<String>,
    pub consumed_capacity_units: Option<f64>,
}

pub trait Publisher {
    /// Publishes `message` to `topic` and resolves to the delivery id.
    fn publish(&self, topic: &str, message: &str) -> impl Future<Output = Result<String>> + Send;
}

pub trait RecordStore {
    fn put(&self, record: &Record) -> impl Future<Output = Result<PutAck>> + Send;

    /// Reads every record in the table, following pagination.
    fn scan(&self) -> impl Future<Output = Result<Vec<Record>>> + Send;

    fn table(&self) -> &str;
}

pub trait SecretStore {
    /// Reads a parameter, decrypting it when stored as a secure string.
    fn get_parameter(&self, name: &str) -> impl Future<Output = Result<String>> + Send;
}

pub trait ObjectStore {
    fn put_json(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub trait FunctionInvoker {
    /// Request/response invocation. Resolves to the raw response payload.
    fn invoke_sync(
        &self,
        function: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Fire-and-forget invocation; the host queues the event.
    fn invoke_async(
        &self,
        function: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Clone)]
pub struct SnsPublisher {
    pub client: aws_sdk_sns::Client,
}

impl SnsPublisher {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        SnsPublisher { client }
    }
}

impl Publisher for SnsPublisher {
    fn publish(&self, topic: &str, message: &str) -> impl Future<Output = Result<String>> + Send {
        let client = self.client.clone();
        let topic = topic.to_string();
        let message = message.to_string();
        async move { utils::publish_message(&client, &topic, &message).await }
    }
}

#[derive(Clone)]
pub struct DynamoRecordStore {
    pub client: aws_sdk_dynamodb::Client,
    pub table: String,
}

impl DynamoRecordStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        DynamoRecordStore {
            client,
            table: table.into(),
        }
    }
}

impl RecordStore for DynamoRecordStore {
    fn put(&self, record: &Record) -> impl Future<Output = Result<PutAck>> + Send {
        let client = self.client.clone();
        let table = self.table.clone();
        let record = record.clone();
        async move { utils::put_record(&client, &table, &record).await }
    }

    fn scan(&self) -> impl Future<Output = Result<Vec<Record>>> + Send {
        let client = self.client.clone();
        let table = self.table.clone();
        async move { utils::scan_records(&client, &table).await }
    }

    fn table(&self) -> &str {
        &self.table
    }
}

#[derive(Clone)]
pub struct SsmSecretStore {
    pub client: aws_sdk_ssm::Client,
}

impl SsmSecretStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        SsmSecretStore { client }
    }
}

impl SecretStore for SsmSecretStore {
    fn get_parameter(&self, name: &str) -> impl Future<Output = Result<String>> + Send {
        let client = self.client.clone();
        let name = name.to_string();
        async move { utils::get_parameter(&client, &name).await }
    }
}

#[derive(Clone)]
pub struct S3ObjectStore {
    pub client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        S3ObjectStore { client }
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_json(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        async move { utils::put_json_object(&client, &bucket, &key, body).await }
    }
}

#[derive(Clone)]
pub struct LambdaInvoker {
    pub client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        LambdaInvoker { client }
    }
}

impl FunctionInvoker for LambdaInvoker {
    fn invoke_sync(
        &self,
        function: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let client = self.client.clone();
        let function = function.to_string();
        async move { utils::invoke_function(&client, &function, payload).await }
    }

    fn invoke_async(
        &self,
        function: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send {
        let client = self.client.clone();
        let function = function.to_string();
        async move { utils::invoke_function_event(&client, &function, payload).await }
    }
}
