use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Event;
use kube::Api;
use kube::api::ListParams;

use podstatus_types::EventRecord;

use crate::convert::event_record;

/// Fetch the events recorded against a pod, oldest first
pub async fn pod_events(
    client: &kube::Client,
    namespace: &str,
    pod_name: &str,
) -> Result<Vec<EventRecord>> {
    let events: Api<Event> = Api::namespaced(client.clone(), namespace);
    let fields = format!("involvedObject.kind=Pod,involvedObject.name={}", pod_name);

    let list = events
        .list(&ListParams::default().fields(&fields))
        .await
        .context(format!(
            "Failed to list events for pod '{}' in namespace '{}'",
            pod_name, namespace
        ))?;

    let mut records: Vec<EventRecord> = list.items.into_iter().map(event_record).collect();
    records.sort_by_key(|r| r.last_seen);
    Ok(records)
}
