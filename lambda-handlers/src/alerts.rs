use crate::config::AlertsConfig;
use crate::ApiResponse;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use notify_client::cortex::{AlertSource, ApiKey, KeyType};
use notify_client::{ObjectStore, SecretStore};
use serde_json::{json, Value};

pub const PARAM_KEY_ID: &str = "/cortex/key_id";
pub const PARAM_API_KEY: &str = "/cortex/api_key";
pub const PARAM_KEY_TYPE: &str = "/cortex/key_type";
pub const PARAM_FQDN: &str = "/cortex/fqdn";
pub const PARAM_ENDPOINT: &str = "/cortex/endpoint";

/// Connection details for the alert API, read from the parameter store.
#[derive(Debug, Clone)]
pub struct CortexSettings {
    pub api_key: ApiKey,
    pub fqdn: String,
    pub endpoint: String,
}

#[derive(Clone)]
pub struct AlertsState<S, O> {
    pub secrets: S,
    pub objects: O,
    pub config: AlertsConfig,
}

pub async fn load_settings<S: SecretStore>(secrets: &S) -> Result<CortexSettings> {
    let key_id = secrets.get_parameter(PARAM_KEY_ID).await?;
    let key_id = key_id
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{PARAM_KEY_ID} is not an integer: {key_id:?}"))?;

    Ok(CortexSettings {
        api_key: ApiKey {
            id: key_id,
            key: secrets.get_parameter(PARAM_API_KEY).await?,
            key_type: KeyType::parse(&secrets.get_parameter(PARAM_KEY_TYPE).await?),
        },
        fqdn: secrets.get_parameter(PARAM_FQDN).await?,
        endpoint: secrets.get_parameter(PARAM_ENDPOINT).await?,
    })
}

/// Pages through the API until a page comes back empty or `max_pages`
/// pages have been read (`0` means no limit). A failing page ends the
/// search and keeps whatever was already collected.
pub async fn retrieve_all<A: AlertSource>(
    source: &A,
    count_per_page: usize,
    max_pages: usize,
) -> Vec<Value> {
    let mut all = Vec::new();
    let mut start = 0;
    let mut page = 1;

    loop {
        let end = start + count_per_page;
        let alerts = match source.fetch_page(start, end).await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!("Error retrieving alerts on page {page}: {e:#}");
                break;
            }
        };
        if alerts.is_empty() {
            break;
        }

        all.extend(alerts);
        info!("[Page {page}] Total alerts so far: {}", all.len());

        if max_pages > 0 && page >= max_pages {
            info!("Reached maximum specified pages: {max_pages}");
            break;
        }
        start += count_per_page;
        page += 1;
    }

    all
}

pub fn alerts_key(now: DateTime<Utc>) -> String {
    format!("cortex-alerts/{}_alerts.json", now.format("%Y%m%d_%H%M%S"))
}

async fn collect<S, O, A, F>(
    state: &AlertsState<S, O>,
    connect: F,
    now: DateTime<Utc>,
) -> Result<(usize, String)>
where
    S: SecretStore,
    O: ObjectStore,
    A: AlertSource,
    F: FnOnce(CortexSettings) -> Result<A>,
{
    let settings = load_settings(&state.secrets).await?;
    let source = connect(settings)?;

    let alerts = retrieve_all(
        &source,
        state.config.count_per_page,
        state.config.max_pages,
    )
    .await;

    let key = alerts_key(now);
    let body = serde_json::to_vec_pretty(&alerts).context("encode alerts")?;
    state.objects.put_json(&state.config.bucket, &key, body).await?;
    info!(
        "Uploaded {} alerts to s3://{}/{key}",
        alerts.len(),
        state.config.bucket
    );

    Ok((alerts.len(), key))
}

/// Reads credentials, collects every alert and uploads them as one JSON
/// document. Failures become a 500 response carrying the error text.
pub async fn handle<S, O, A, F>(
    state: &AlertsState<S, O>,
    connect: F,
    now: DateTime<Utc>,
) -> Result<ApiResponse>
where
    S: SecretStore,
    O: ObjectStore,
    A: AlertSource,
    F: FnOnce(CortexSettings) -> Result<A>,
{
    match collect(state, connect, now).await {
        Ok((total, key)) => ApiResponse::json(
            200,
            &json!({
                "message": "Alerts retrieved and uploaded successfully",
                "total_alerts": total,
                "s3_key": key,
            }),
        ),
        Err(e) => {
            error!("Alert collection failed: {e:#}");
            ApiResponse::json(500, &json!({ "error": format!("{e:#}") }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct PagedSource {
        pages: Vec<Vec<Value>>,
        fail_on_page: Option<usize>,
        calls: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl PagedSource {
        fn with_pages(sizes: &[usize]) -> Self {
            let pages = sizes
                .iter()
                .enumerate()
                .map(|(p, n)| (0..*n).map(|i| json!({ "alert_id": p * 100 + i })).collect())
                .collect();
            PagedSource {
                pages,
                ..Default::default()
            }
        }
    }

    impl AlertSource for PagedSource {
        fn fetch_page(
            &self,
            search_from: usize,
            search_to: usize,
        ) -> impl Future<Output = Result<Vec<Value>>> + Send {
            let calls = self.calls.clone();
            let page = search_from / (search_to - search_from);
            let result = if self.fail_on_page == Some(page) {
                Err(format!("status 500 on page {page}"))
            } else {
                Ok(self.pages.get(page).cloned().unwrap_or_default())
            };
            async move {
                calls.lock().unwrap().push((search_from, search_to));
                result.map_err(anyhow::Error::msg)
            }
        }
    }

    #[derive(Clone)]
    struct MemorySecrets(HashMap<&'static str, &'static str>);

    impl MemorySecrets {
        fn complete() -> Self {
            MemorySecrets(HashMap::from([
                (PARAM_KEY_ID, "42"),
                (PARAM_API_KEY, "api-secret"),
                (PARAM_KEY_TYPE, "advanced"),
                (PARAM_FQDN, "api-tenant.xdr.us.paloaltonetworks.com"),
                (PARAM_ENDPOINT, "/public_api/v1/alerts/get_alerts_multi_events"),
            ]))
        }
    }

    impl SecretStore for MemorySecrets {
        fn get_parameter(&self, name: &str) -> impl Future<Output = Result<String>> + Send {
            let value = self.0.get(name).map(|v| v.to_string());
            let name = name.to_string();
            async move {
                match value {
                    Some(v) => Ok(v),
                    None => bail!("parameter {name} not found"),
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct MemoryObjects {
        objects: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
    }

    impl ObjectStore for MemoryObjects {
        fn put_json(
            &self,
            bucket: &str,
            key: &str,
            body: Vec<u8>,
        ) -> impl Future<Output = Result<()>> + Send {
            let objects = self.objects.clone();
            let entry = (bucket.to_string(), key.to_string(), body);
            async move {
                objects.lock().unwrap().push(entry);
                Ok(())
            }
        }
    }

    fn state(secrets: MemorySecrets) -> AlertsState<MemorySecrets, MemoryObjects> {
        AlertsState {
            secrets,
            objects: MemoryObjects::default(),
            config: AlertsConfig {
                count_per_page: 100,
                max_pages: 10,
                bucket: "db-pan-bucket".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let source = PagedSource::with_pages(&[100, 100, 40]);

        let alerts = retrieve_all(&source, 100, 10).await;

        assert_eq!(alerts.len(), 240);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![(0, 100), (100, 200), (200, 300), (300, 400)]
        );
    }

    #[tokio::test]
    async fn stops_at_max_pages() {
        let source = PagedSource::with_pages(&[100, 100, 100, 100]);

        let alerts = retrieve_all(&source, 100, 2).await;

        assert_eq!(alerts.len(), 200);
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_max_pages_reads_until_empty() {
        let source = PagedSource::with_pages(&[10, 10, 10]);

        let alerts = retrieve_all(&source, 10, 0).await;

        assert_eq!(alerts.len(), 30);
        assert_eq!(source.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_alerts() {
        let source = PagedSource {
            fail_on_page: Some(1),
            ..PagedSource::with_pages(&[100, 100, 100])
        };

        let alerts = retrieve_all(&source, 100, 10).await;

        assert_eq!(alerts.len(), 100);
        assert_eq!(alerts[0]["alert_id"], 0);
    }

    #[tokio::test]
    async fn uploads_alerts_and_reports_key() {
        let state = state(MemorySecrets::complete());
        let now = Utc.with_ymd_and_hms(2024, 11, 5, 8, 30, 0).unwrap();
        let mut seen = None;

        let resp = handle(
            &state,
            |settings| {
                seen = Some(settings);
                Ok(PagedSource::with_pages(&[100, 25]))
            },
            now,
        )
        .await
        .unwrap();

        assert_eq!(resp.status_code, 200);
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Alerts retrieved and uploaded successfully",
                "total_alerts": 125,
                "s3_key": "cortex-alerts/20241105_083000_alerts.json",
            })
        );

        let settings = seen.unwrap();
        assert_eq!(settings.api_key.id, 42);
        assert_eq!(settings.api_key.key_type, KeyType::Advanced);
        assert_eq!(settings.fqdn, "api-tenant.xdr.us.paloaltonetworks.com");

        let objects = state.objects.objects.lock().unwrap().clone();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, "db-pan-bucket");
        assert_eq!(objects[0].1, "cortex-alerts/20241105_083000_alerts.json");
        let uploaded: Vec<Value> = serde_json::from_slice(&objects[0].2).unwrap();
        assert_eq!(uploaded.len(), 125);
    }

    #[tokio::test]
    async fn missing_secret_is_a_500() {
        let mut secrets = MemorySecrets::complete();
        secrets.0.remove(PARAM_FQDN);
        let state = state(secrets);

        let resp = handle(
            &state,
            |_| Ok(PagedSource::with_pages(&[1])),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(resp.status_code, 500);
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains(PARAM_FQDN));
        assert!(state.objects.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_key_id_is_a_500() {
        let mut secrets = MemorySecrets::complete();
        secrets.0.insert(PARAM_KEY_ID, "forty-two");
        let state = state(secrets);

        let resp = handle(
            &state,
            |_| Ok(PagedSource::with_pages(&[1])),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(resp.status_code, 500);
    }
}
