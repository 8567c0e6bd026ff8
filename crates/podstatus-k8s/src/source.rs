//! Pod listing and watching

use std::future::Future;

use futures::StreamExt;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, WatchEvent as KubeWatchEvent, WatchParams};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use podstatus_types::{PodQuery, PodSnapshot, WatchEvent};

use crate::convert::pod_snapshot;

/// Failure to establish a listing or a subscription
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to list pods: {0}")]
    List(#[source] kube::Error),
    #[error("failed to watch pods: {0}")]
    Watch(#[source] kube::Error),
}

/// Problem reported on an established subscription
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A single event could not be understood; the stream is still usable
    #[error("malformed watch event: {0}")]
    Malformed(String),
    /// The resource version cursor is too old to resume from
    #[error("watch expired: {0}")]
    Expired(String),
    #[error("watch closed: {0}")]
    Closed(String),
}

impl StreamError {
    /// Whether the subscription can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Pods matching a query, plus the cursor to watch from
#[derive(Clone, Debug, Default)]
pub struct PodListing {
    pub pods: Vec<PodSnapshot>,
    pub resource_version: Option<String>,
}

/// Read access to the pods of a cluster
pub trait PodSource {
    /// Fetch the pods currently matching `query`
    fn list(
        &self,
        query: &PodQuery,
    ) -> impl Future<Output = Result<PodListing, SourceError>> + Send;

    /// Subscribe to changes of the pods matching `query` after `from_version`
    fn watch(
        &self,
        query: &PodQuery,
        from_version: &str,
    ) -> impl Future<Output = Result<Subscription, SourceError>> + Send;
}

/// Sending half of a subscription
pub type EventSender = mpsc::UnboundedSender<Result<WatchEvent, StreamError>>;

/// A live stream of pod change notifications
pub struct Subscription {
    /// Events in arrival order
    events: mpsc::UnboundedReceiver<Result<WatchEvent, StreamError>>,

    /// Cancellation token for the producing task
    cancel: CancellationToken,

    /// Producing task handle (absent for externally fed subscriptions)
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    /// Create a subscription fed through the returned sender
    pub fn channel() -> (EventSender, Self) {
        let (sender, events) = mpsc::unbounded_channel();
        let subscription = Self {
            events,
            cancel: CancellationToken::new(),
            task: None,
        };
        (sender, subscription)
    }

    /// Receive the next event, `None` once the producer is gone
    pub async fn next(&mut self) -> Option<Result<WatchEvent, StreamError>> {
        self.events.recv().await
    }

    /// Stop the producer and refuse further events
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// [`PodSource`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubePodSource {
    api: Api<Pod>,
}

impl KubePodSource {
    pub fn new(client: kube::Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }

    fn list_params(query: &PodQuery) -> ListParams {
        match query {
            PodQuery::Selector(selector) => ListParams::default().labels(selector),
            PodQuery::Named(name) => ListParams::default().fields(&name_field(name)),
        }
    }

    fn watch_params(query: &PodQuery) -> WatchParams {
        match query {
            PodQuery::Selector(selector) => WatchParams::default().labels(selector),
            PodQuery::Named(name) => WatchParams::default().fields(&name_field(name)),
        }
    }
}

fn name_field(name: &str) -> String {
    format!("metadata.name={}", name)
}

impl PodSource for KubePodSource {
    async fn list(&self, query: &PodQuery) -> Result<PodListing, SourceError> {
        let list = self
            .api
            .list(&Self::list_params(query))
            .await
            .map_err(SourceError::List)?;

        let pods = list
            .items
            .into_iter()
            .filter_map(|pod| match pod_snapshot(pod) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(error = %e, "skipping pod");
                    None
                }
            })
            .collect();

        Ok(PodListing {
            pods,
            resource_version: list.metadata.resource_version,
        })
    }

    async fn watch(&self, query: &PodQuery, from_version: &str) -> Result<Subscription, SourceError> {
        let params = Self::watch_params(query);
        let stream = self
            .api
            .watch(&params, from_version)
            .await
            .map_err(SourceError::Watch)?
            .boxed();

        let (sender, mut subscription) = Subscription::channel();
        let task = tokio::spawn(pump(
            self.api.clone(),
            params,
            from_version.to_string(),
            stream,
            sender,
            subscription.cancel.clone(),
        ));
        subscription.task = Some(task);

        Ok(subscription)
    }
}

/// What to do with one raw watch event
enum Step {
    Emit(WatchEvent),
    Skip,
    Fail(StreamError),
}

/// Translate a raw event, advancing the resume cursor
fn translate(event: KubeWatchEvent<Pod>, version: &mut String) -> Step {
    let (pod, wrap): (Pod, fn(PodSnapshot) -> WatchEvent) = match event {
        KubeWatchEvent::Added(pod) => (pod, WatchEvent::Added),
        KubeWatchEvent::Modified(pod) => (pod, WatchEvent::Modified),
        KubeWatchEvent::Deleted(pod) => (pod, WatchEvent::Deleted),
        KubeWatchEvent::Bookmark(bookmark) => {
            *version = bookmark.metadata.resource_version;
            return Step::Skip;
        }
        KubeWatchEvent::Error(status) if status.code == 410 => {
            return Step::Fail(StreamError::Expired(status.message));
        }
        KubeWatchEvent::Error(status) => {
            return Step::Fail(StreamError::Closed(format!(
                "{} ({})",
                status.message, status.code
            )));
        }
    };

    if let Some(rv) = &pod.metadata.resource_version {
        version.clone_from(rv);
    }

    match pod_snapshot(pod) {
        Ok(snapshot) => Step::Emit(wrap(snapshot)),
        Err(e) => Step::Fail(StreamError::Malformed(e.to_string())),
    }
}

/// Forward watch events into a subscription until cancelled.
///
/// A watch the server ends normally is re-established from the last seen
/// resource version.
async fn pump(
    api: Api<Pod>,
    params: WatchParams,
    mut version: String,
    mut stream: BoxStream<'static, kube::Result<KubeWatchEvent<Pod>>>,
    sender: EventSender,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            item = stream.next() => {
                let message = match item {
                    Some(Ok(event)) => match translate(event, &mut version) {
                        Step::Emit(event) => Ok(event),
                        Step::Skip => continue,
                        Step::Fail(e) => Err(e),
                    },
                    Some(Err(kube::Error::SerdeError(e))) => {
                        Err(StreamError::Malformed(e.to_string()))
                    }
                    Some(Err(e)) => Err(StreamError::Closed(e.to_string())),
                    None => {
                        debug!(resource_version = %version, "watch ended, resuming");
                        match api.watch(&params, &version).await {
                            Ok(next) => {
                                stream = next.boxed();
                                continue;
                            }
                            Err(e) => Err(StreamError::Closed(e.to_string())),
                        }
                    }
                };

                let fatal = matches!(&message, Err(e) if !e.is_recoverable());
                if sender.send(message).is_err() || fatal {
                    // Receiver gone or the stream cannot continue
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> KubeWatchEvent<Pod> {
        serde_json::from_value(value).unwrap()
    }

    fn pod_object(uid: Option<&str>, resource_version: &str) -> serde_json::Value {
        let mut metadata = json!({
            "name": "web-1",
            "namespace": "shop",
            "resourceVersion": resource_version
        });
        if let Some(uid) = uid {
            metadata["uid"] = json!(uid);
        }
        json!({ "apiVersion": "v1", "kind": "Pod", "metadata": metadata })
    }

    fn error_event(code: u16, message: &str) -> KubeWatchEvent<Pod> {
        raw(json!({
            "type": "ERROR",
            "object": {
                "status": "Failure",
                "message": message,
                "reason": "Expired",
                "code": code
            }
        }))
    }

    #[test]
    fn test_translate_advances_version_on_pod_events() {
        let mut version = "10".to_string();

        for (kind, rv) in [("ADDED", "11"), ("MODIFIED", "12"), ("DELETED", "13")] {
            let event = raw(json!({ "type": kind, "object": pod_object(Some("u1"), rv) }));
            match translate(event, &mut version) {
                Step::Emit(event) => {
                    assert_eq!(event.kind(), kind);
                    assert_eq!(event.pod().uid, "u1");
                }
                _ => panic!("{} was not emitted", kind),
            }
            assert_eq!(version, rv);
        }
    }

    #[test]
    fn test_translate_bookmark_moves_cursor_only() {
        let mut version = "10".to_string();
        let event = raw(json!({
            "type": "BOOKMARK",
            "object": {
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": { "resourceVersion": "99" }
            }
        }));

        assert!(matches!(translate(event, &mut version), Step::Skip));
        assert_eq!(version, "99");
    }

    #[test]
    fn test_translate_gone_is_expired() {
        let mut version = "10".to_string();
        let step = translate(error_event(410, "too old resource version"), &mut version);

        match step {
            Step::Fail(e) => {
                assert_eq!(e, StreamError::Expired("too old resource version".to_string()));
                assert!(!e.is_recoverable());
            }
            _ => panic!("410 should fail the stream"),
        }
        assert_eq!(version, "10");
    }

    #[test]
    fn test_translate_other_error_closes() {
        let mut version = "10".to_string();
        let step = translate(error_event(500, "internal error"), &mut version);

        match step {
            Step::Fail(StreamError::Closed(message)) => {
                assert!(message.contains("internal error"));
                assert!(message.contains("500"));
            }
            _ => panic!("error status should close the stream"),
        }
    }

    #[test]
    fn test_translate_pod_without_uid_is_malformed() {
        let mut version = "10".to_string();
        let event = raw(json!({ "type": "MODIFIED", "object": pod_object(None, "11") }));

        match translate(event, &mut version) {
            Step::Fail(e) => {
                assert!(matches!(e, StreamError::Malformed(_)));
                assert!(e.is_recoverable());
            }
            _ => panic!("pod without uid should be malformed"),
        }
        // The cursor still moves past the bad object
        assert_eq!(version, "11");
    }

    #[tokio::test]
    async fn test_subscription_delivers_in_order() {
        let (sender, mut subscription) = Subscription::channel();
        for uid in ["a", "b"] {
            let pod = PodSnapshot::new(uid, uid, "default");
            sender.send(Ok(WatchEvent::Added(pod))).unwrap();
        }

        let first = subscription.next().await.unwrap().unwrap();
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(first.pod().uid, "a");
        assert_eq!(second.pod().uid, "b");
    }

    #[tokio::test]
    async fn test_stopped_subscription_rejects_events() {
        let (sender, mut subscription) = Subscription::channel();
        subscription.stop();

        let pod = PodSnapshot::new("a", "a", "default");
        assert!(sender.send(Ok(WatchEvent::Added(pod))).is_err());
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn test_only_malformed_is_recoverable() {
        assert!(StreamError::Malformed("bad".to_string()).is_recoverable());
        assert!(!StreamError::Expired("gone".to_string()).is_recoverable());
        assert!(!StreamError::Closed("eof".to_string()).is_recoverable());
    }
}
