//! Stream trigger dispatch.
//!
//! A [`Trigger`] binds a set of event kinds to a record handler. Each
//! delivered batch is fanned out: matching records go to the handler, the
//! rest complete immediately with no result. All invocations run
//! concurrently and the batch completes once, when every one has finished.
//!
//! # Example
//!
//! ```ignore
//! let on_insert = trigger::insert(|record: MutationRecord| async move {
//!     tracing::info!(id = %record.event_id, "inserted");
//!     Ok(None)
//! });
//!
//! on_insert.process(batch, &context).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::utils::fan_out;

/// Boxed error returned by record handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Aggregate outcome of one batch: every per-record result in delivery
/// order (`None` for skipped records), or the first failure.
pub type DispatchResult = Result<Vec<Option<Value>>, TriggerError>;

/// Errors that fail a batch.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Handler failed for record '{event_id}': {source}")]
    Handler {
        event_id: String,
        #[source]
        source: BoxError,
    },

    #[error("Malformed batch: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Classification of a mutation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Insert,
    Modify,
    Remove,
}

/// A set of event kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventKinds {
    insert: bool,
    modify: bool,
    remove: bool,
}

impl EventKinds {
    pub const INSERT: Self = Self::new(true, false, false);
    pub const MODIFY: Self = Self::new(false, true, false);
    pub const REMOVE: Self = Self::new(false, false, true);
    pub const ALL: Self = Self::new(true, true, true);
    /// Inserts and modifications.
    pub const SAVE: Self = Self::new(true, true, false);
    /// Inserts and removals.
    pub const CHANGE: Self = Self::new(true, false, true);

    const fn new(insert: bool, modify: bool, remove: bool) -> Self {
        Self {
            insert,
            modify,
            remove,
        }
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Insert => self.insert,
            EventKind::Modify => self.modify,
            EventKind::Remove => self.remove,
        }
    }
}

impl FromIterator<EventKind> for EventKinds {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut set, kind| {
            match kind {
                EventKind::Insert => set.insert = true,
                EventKind::Modify => set.modify = true,
                EventKind::Remove => set.remove = true,
            }
            set
        })
    }
}

/// One stream record. The `dynamodb` payload is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    #[serde(rename = "eventID", default)]
    pub event_id: String,
    #[serde(rename = "eventName")]
    pub event_name: EventKind,
    #[serde(rename = "eventSource", default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(rename = "awsRegion", default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub dynamodb: Value,
}

impl MutationRecord {
    pub fn new(event_id: impl Into<String>, event_name: EventKind, dynamodb: Value) -> Self {
        Self {
            event_id: event_id.into(),
            event_name,
            event_source: None,
            aws_region: None,
            dynamodb,
        }
    }
}

/// A delivered batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<MutationRecord>,
}

impl From<Vec<MutationRecord>> for StreamBatch {
    fn from(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }
}

/// Completion signals of the delivering platform.
pub trait PlatformContext: Send + Sync {
    fn succeed(&self, results: &[Option<Value>]);

    /// Signal batch failure. Platforms without one ignore it.
    fn fail(&self, _error: &TriggerError) {}
}

/// Handler invoked once per matching record.
pub trait RecordHandler: Send + Sync {
    fn handle(&self, record: MutationRecord) -> BoxFuture<'static, Result<Option<Value>, BoxError>>;
}

impl<F, Fut> RecordHandler for F
where
    F: Fn(MutationRecord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, BoxError>> + Send + 'static,
{
    fn handle(
        &self,
        record: MutationRecord,
    ) -> BoxFuture<'static, Result<Option<Value>, BoxError>> {
        Box::pin(self(record))
    }
}

/// Event-kind filter bound to a handler.
#[derive(Clone)]
pub struct Trigger {
    kinds: EventKinds,
    handler: Arc<dyn RecordHandler>,
}

impl Trigger {
    pub fn new(kinds: EventKinds, handler: impl RecordHandler + 'static) -> Self {
        Self {
            kinds,
            handler: Arc::new(handler),
        }
    }

    pub fn kinds(&self) -> EventKinds {
        self.kinds
    }

    /// Dispatch one batch and signal `context` exactly once.
    ///
    /// A failing record does not stop its siblings; the batch fails with the
    /// first failure to complete once all of them have finished.
    pub async fn process(
        &self,
        batch: StreamBatch,
        context: &dyn PlatformContext,
    ) -> DispatchResult {
        let matched = batch
            .records
            .iter()
            .filter(|r| self.kinds.contains(r.event_name))
            .count();
        debug!(records = batch.records.len(), matched = matched, "Dispatching batch");

        let tasks = batch.records.into_iter().map(|record| {
            let invoke = self.kinds.contains(record.event_name);
            let handler = Arc::clone(&self.handler);
            async move {
                if !invoke {
                    return Ok(None);
                }
                let event_id = record.event_id.clone();
                handler.handle(record).await.map_err(|source| {
                    error!(event_id = %event_id, error = %source, "Record handler failed");
                    TriggerError::Handler { event_id, source }
                })
            }
        });

        let outcome = fan_out(tasks).await;
        match &outcome {
            Ok(results) => context.succeed(results),
            Err(e) => {
                error!(error = %e, "Batch failed");
                context.fail(e);
            }
        }
        outcome
    }

    /// Decode a batch from the platform's JSON delivery, then dispatch it.
    pub async fn process_json(
        &self,
        payload: Value,
        context: &dyn PlatformContext,
    ) -> DispatchResult {
        match serde_json::from_value::<StreamBatch>(payload) {
            Ok(batch) => self.process(batch, context).await,
            Err(e) => {
                let err = TriggerError::from(e);
                error!(error = %err, "Batch failed");
                context.fail(&err);
                Err(err)
            }
        }
    }
}

/// Trigger for inserts.
pub fn insert(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::INSERT, handler)
}

/// Trigger for modifications.
pub fn modify(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::MODIFY, handler)
}

/// Same as [`modify`].
pub fn update(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::MODIFY, handler)
}

/// Trigger for removals.
pub fn remove(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::REMOVE, handler)
}

/// Same as [`remove`].
pub fn destroy(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::REMOVE, handler)
}

/// Trigger for every kind.
pub fn all(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::ALL, handler)
}

/// Trigger for inserts and modifications.
pub fn save(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::SAVE, handler)
}

/// Trigger for inserts and removals.
pub fn change(handler: impl RecordHandler + 'static) -> Trigger {
    Trigger::new(EventKinds::CHANGE, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingContext {
        succeeded: Mutex<Vec<Vec<Option<Value>>>>,
        failed: Mutex<Vec<String>>,
    }

    impl PlatformContext for RecordingContext {
        fn succeed(&self, results: &[Option<Value>]) {
            self.succeeded.lock().unwrap().push(results.to_vec());
        }

        fn fail(&self, error: &TriggerError) {
            self.failed.lock().unwrap().push(error.to_string());
        }
    }

    struct SucceedOnly;

    impl PlatformContext for SucceedOnly {
        fn succeed(&self, _results: &[Option<Value>]) {}
    }

    fn skip() -> Result<Option<Value>, BoxError> {
        Ok(None)
    }

    fn batch(kinds: &[EventKind]) -> StreamBatch {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| MutationRecord::new(format!("evt-{}", i), *kind, json!({"n": i})))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_named_sets() {
        use EventKind::*;
        assert!(EventKinds::SAVE.contains(Insert) && EventKinds::SAVE.contains(Modify));
        assert!(!EventKinds::SAVE.contains(Remove));
        assert!(EventKinds::CHANGE.contains(Remove) && !EventKinds::CHANGE.contains(Modify));
        assert_eq!([Insert, Remove].into_iter().collect::<EventKinds>(), EventKinds::CHANGE);
        assert_eq!(update(|_r: MutationRecord| async { skip() }).kinds(), EventKinds::MODIFY);
        assert_eq!(destroy(|_r: MutationRecord| async { skip() }).kinds(), EventKinds::REMOVE);
    }

    #[tokio::test]
    async fn test_filters_and_counts_every_record() {
        use EventKind::*;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let trigger = change(move |record: MutationRecord| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, BoxError>(Some(json!(record.event_id))) }
        });
        let context = RecordingContext::default();

        let results = trigger
            .process(batch(&[Insert, Remove, Modify, Insert, Remove]), &context)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(results.len(), 5);
        assert_eq!(results[2], None);
        assert_eq!(results[3], Some(json!("evt-3")));
        assert_eq!(context.succeeded.lock().unwrap().len(), 1);
        assert!(context.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_fails_batch_once() {
        use EventKind::*;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let trigger = change(move |record: MutationRecord| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if record.event_id == "evt-1" {
                    Err::<Option<Value>, BoxError>("no such taco".into())
                } else {
                    skip()
                }
            }
        });
        let context = RecordingContext::default();

        let err = trigger
            .process(batch(&[Insert, Remove, Modify, Insert, Remove]), &context)
            .await
            .unwrap_err();

        assert!(matches!(&err, TriggerError::Handler { event_id, .. } if event_id == "evt-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(context.succeeded.lock().unwrap().is_empty());
        assert_eq!(
            *context.failed.lock().unwrap(),
            vec!["Handler failed for record 'evt-1': no such taco".to_string()]
        );
    }

    #[test]
    fn test_empty_batch_completes_in_first_poll() {
        let trigger = all(|_r: MutationRecord| async { skip() });
        let context = RecordingContext::default();

        let outcome = trigger.process(StreamBatch::default(), &context).now_or_never();

        assert_eq!(outcome.unwrap().unwrap(), Vec::<Option<Value>>::new());
        assert_eq!(*context.succeeded.lock().unwrap(), vec![Vec::new()]);
    }

    #[tokio::test]
    async fn test_failure_without_fail_signal_still_returned() {
        let trigger = insert(|_r: MutationRecord| async {
            Err::<Option<Value>, BoxError>("boom".into())
        });

        let outcome = trigger
            .process(batch(&[EventKind::Insert]), &SucceedOnly)
            .await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_process_json() {
        let trigger = save(|record: MutationRecord| async move {
            Ok::<_, BoxError>(Some(record.dynamodb))
        });
        let context = RecordingContext::default();

        let results = trigger
            .process_json(
                json!({
                    "Records": [
                        {
                            "eventID": "1",
                            "eventName": "INSERT",
                            "eventSource": "aws:dynamodb",
                            "awsRegion": "us-west-2",
                            "dynamodb": {"Keys": {"taco": {"S": "pollo"}}}
                        },
                        {"eventID": "2", "eventName": "REMOVE"}
                    ]
                }),
                &context,
            )
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![Some(json!({"Keys": {"taco": {"S": "pollo"}}})), None]
        );
    }

    #[tokio::test]
    async fn test_process_json_rejects_unknown_kind() {
        let trigger = all(|_r: MutationRecord| async { skip() });
        let context = RecordingContext::default();

        let err = trigger
            .process_json(json!({"Records": [{"eventName": "UPSERT"}]}), &context)
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::Decode(_)));
        assert_eq!(context.failed.lock().unwrap().len(), 1);
    }
}
