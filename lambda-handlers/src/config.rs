//! Environment-driven settings for each handler.

use anyhow::{ensure, Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};

pub fn load_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub async fn load_aws() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

#[derive(Debug, Clone)]
pub struct PublishRecordConfig {
    /// Empty when the topic should be resolved from `topic_name`.
    pub topic_arn: String,
    pub topic_name: String,
    pub message: String,
    pub table: String,
}

impl PublishRecordConfig {
    pub fn from_env() -> Self {
        PublishRecordConfig {
            topic_arn: load_env("TOPIC_ARN", ""),
            topic_name: load_env("TOPIC_NAME", "lambda2sns"),
            message: load_env("NOTIFY_MESSAGE", "Hello from Lambda!"),
            table: load_env("TABLE_NAME", "fromLambda"),
        }
    }

    /// The deployed function publishes to a fixed topic and never creates one.
    pub fn required_topic_arn(&self) -> Result<&str> {
        ensure!(
            !self.topic_arn.is_empty(),
            "TOPIC_ARN must be set for the publish-record function"
        );
        Ok(&self.topic_arn)
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub table: String,
    pub bucket: String,
}

impl ExportConfig {
    pub fn from_env() -> Self {
        ExportConfig {
            table: load_env("TABLE_NAME", "fromLambda"),
            bucket: load_env("EXPORT_BUCKET", "db-db2bucket"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FanOutConfig {
    pub child_function: String,
    pub notifier_function: String,
}

impl FanOutConfig {
    pub fn from_env() -> Self {
        FanOutConfig {
            child_function: load_env("CHILD_FUNCTION", "db-2lambda"),
            notifier_function: load_env("NOTIFIER_FUNCTION", "lambda2sns"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertsConfig {
    pub count_per_page: usize,
    /// `0` reads until the API returns an empty page.
    pub max_pages: usize,
    pub bucket: String,
}

impl AlertsConfig {
    pub fn from_env() -> Result<Self> {
        let count_per_page: usize = load_env("COUNT_PER_PAGE", "100")
            .parse()
            .context("COUNT_PER_PAGE must be a positive integer")?;
        ensure!(count_per_page > 0, "COUNT_PER_PAGE must be greater than 0");

        Ok(AlertsConfig {
            count_per_page,
            max_pages: load_env("MAX_PAGES", "10")
                .parse()
                .context("MAX_PAGES must be a non-negative integer")?,
            bucket: load_env("S3_BUCKET", "db-pan-bucket"),
        })
    }
}
