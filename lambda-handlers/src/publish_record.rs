use anyhow::Result;
use log::info;
use notify_client::{Publisher, PutAck, Record, RecordStore};
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct PublishRecordState<P, S> {
    pub publisher: P,
    pub store: S,
    pub topic: String,
    pub message: String,
}

pub fn random_label<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(1..=100u32).to_string()
}

/// Whole seconds since the epoch, floored. Times before the epoch clamp to 0.
pub fn epoch_seconds(now: SystemTime) -> i64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Publishes the notification, then appends one record stamped with the
/// current time. Any failure aborts the invocation; a failed publish means
/// nothing is written.
pub async fn handle<P, S, R>(
    state: &PublishRecordState<P, S>,
    rng: &mut R,
    clock: impl Fn() -> SystemTime,
) -> Result<PutAck>
where
    P: Publisher,
    S: RecordStore,
    R: Rng + ?Sized,
{
    let message_id = state.publisher.publish(&state.topic, &state.message).await?;
    info!("Published notification to topic={} id={message_id}", state.topic);

    let record = Record {
        timestamp: epoch_seconds(clock()),
        label: random_label(rng),
    };
    info!(
        "Writing record timestamp={} label={} to table={}",
        record.timestamp,
        record.label,
        state.store.table()
    );

    state.store.put(&record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::future::Future;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    impl Publisher for RecordingPublisher {
        fn publish(
            &self,
            topic: &str,
            message: &str,
        ) -> impl Future<Output = Result<String>> + Send {
            let sent = self.sent.clone();
            let fail = self.fail;
            let entry = (topic.to_string(), message.to_string());
            async move {
                if fail {
                    bail!("topic unavailable");
                }
                let mut sent = sent.lock().unwrap();
                sent.push(entry);
                Ok(format!("msg-{}", sent.len()))
            }
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        records: Arc<Mutex<Vec<Record>>>,
    }

    impl RecordStore for MemoryStore {
        fn put(&self, record: &Record) -> impl Future<Output = Result<PutAck>> + Send {
            let records = self.records.clone();
            let record = record.clone();
            async move {
                records.lock().unwrap().push(record);
                Ok(PutAck {
                    table: "fromLambda".to_string(),
                    request_id: Some("req-1".to_string()),
                    consumed_capacity_units: Some(1.0),
                })
            }
        }

        fn scan(&self) -> impl Future<Output = Result<Vec<Record>>> + Send {
            let records = self.records.lock().unwrap().clone();
            async move { Ok(records) }
        }

        fn table(&self) -> &str {
            "fromLambda"
        }
    }

    fn state(fail: bool) -> PublishRecordState<RecordingPublisher, MemoryStore> {
        PublishRecordState {
            publisher: RecordingPublisher {
                fail,
                ..Default::default()
            },
            store: MemoryStore::default(),
            topic: "arn:aws:sns:us-west-2:000000000000:lambda2sns".to_string(),
            message: "Hello from Lambda!".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_exactly_one_record_at_invocation_time() {
        let state = state(false);
        let mut rng = StdRng::seed_from_u64(7);
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_999);

        let ack = handle(&state, &mut rng, || now).await.unwrap();

        let records = state.store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 1_700_000_000);
        assert!(!records[0].label.is_empty());
        assert_eq!(ack.table, "fromLambda");
        assert_eq!(ack.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn publishes_configured_message_once() {
        let state = state(false);
        let mut rng = StdRng::seed_from_u64(1);

        handle(&state, &mut rng, SystemTime::now).await.unwrap();

        let sent = state.publisher.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![(
                "arn:aws:sns:us-west-2:000000000000:lambda2sns".to_string(),
                "Hello from Lambda!".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn failed_publish_writes_nothing() {
        let state = state(true);
        let mut rng = StdRng::seed_from_u64(1);

        let err = handle(&state, &mut rng, SystemTime::now).await.unwrap_err();

        assert!(err.to_string().contains("topic unavailable"));
        assert!(state.store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn label_comes_from_the_supplied_generator() {
        let state = state(false);
        let now = UNIX_EPOCH + Duration::from_secs(10);

        let mut rng = StdRng::seed_from_u64(99);
        handle(&state, &mut rng, || now).await.unwrap();
        let expected = random_label(&mut StdRng::seed_from_u64(99));

        assert_eq!(state.store.records.lock().unwrap()[0].label, expected);
    }

    #[test]
    fn epoch_seconds_floors_and_clamps() {
        assert_eq!(epoch_seconds(UNIX_EPOCH + Duration::from_millis(2_500)), 2);
        assert_eq!(epoch_seconds(UNIX_EPOCH - Duration::from_secs(5)), 0);
    }

    #[test]
    fn random_label_is_within_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let n: u32 = random_label(&mut rng).parse().unwrap();
            assert!((1..=100).contains(&n));
        }
    }
}
