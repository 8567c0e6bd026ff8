//! Conversion of API objects into the podstatus data model

use k8s_openapi::api::core::v1::{self as corev1, Event, Pod};
use thiserror::Error;

use podstatus_types::{ContainerState, ContainerStatus, EventRecord, PodSnapshot, Terminated};

/// A pod object that cannot be tracked
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("pod has no uid")]
    MissingUid,
    #[error("pod {0} has no name")]
    MissingName(String),
}

/// Convert a pod into a snapshot keyed by its uid
pub fn pod_snapshot(pod: Pod) -> Result<PodSnapshot, ConversionError> {
    let metadata = pod.metadata;
    let uid = metadata.uid.ok_or(ConversionError::MissingUid)?;
    let name = metadata
        .name
        .ok_or_else(|| ConversionError::MissingName(uid.clone()))?;

    let mut snapshot = PodSnapshot::new(uid, name, metadata.namespace.unwrap_or_default());
    snapshot.deletion_timestamp = metadata.deletion_timestamp.map(|t| t.0);

    if let Some(spec) = pod.spec {
        snapshot.node_name = spec.node_name;
        snapshot.container_count = spec.containers.len();
        snapshot.init_container_count = spec.init_containers.map(|c| c.len()).unwrap_or(0);
    }

    if let Some(status) = pod.status {
        snapshot.phase = status.phase.unwrap_or_default();
        snapshot.reason = status.reason;
        snapshot.host_ip = status.host_ip;
        snapshot.pod_ip = status.pod_ip;
        snapshot.start_time = status.start_time.map(|t| t.0);
        snapshot.init_containers = status
            .init_container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(container_status)
            .collect();
        snapshot.containers = status
            .container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(container_status)
            .collect();
    }

    Ok(snapshot)
}

fn container_status(status: corev1::ContainerStatus) -> ContainerStatus {
    ContainerStatus {
        name: status.name,
        ready: status.ready,
        restart_count: status.restart_count,
        state: status.state.and_then(container_state),
        last_state: status.last_state.and_then(container_state),
    }
}

/// Collapse the three optional state fields into one variant.
/// Waiting takes precedence, matching how the status column reads them.
fn container_state(state: corev1::ContainerState) -> Option<ContainerState> {
    if let Some(waiting) = state.waiting {
        return Some(ContainerState::Waiting {
            reason: waiting.reason,
            message: waiting.message,
        });
    }

    if let Some(terminated) = state.terminated {
        return Some(ContainerState::Terminated(Terminated {
            reason: terminated.reason,
            message: terminated.message,
            signal: terminated.signal.unwrap_or(0),
            exit_code: terminated.exit_code,
            started_at: terminated.started_at.map(|t| t.0),
            finished_at: terminated.finished_at.map(|t| t.0),
        }));
    }

    state.running.map(|running| ContainerState::Running {
        started_at: running.started_at.map(|t| t.0),
    })
}

/// Convert a core event into a printable record
pub fn event_record(event: Event) -> EventRecord {
    let source = event
        .reporting_component
        .filter(|c| !c.is_empty())
        .or_else(|| event.source.and_then(|s| s.component))
        .unwrap_or_default();

    EventRecord {
        event_type: event.type_.unwrap_or_default(),
        reason: event.reason.unwrap_or_default(),
        message: event.message.unwrap_or_default(),
        source,
        last_seen: event
            .last_timestamp
            .map(|t| t.0)
            .or_else(|| event.event_time.map(|t| t.0))
            .or_else(|| event.first_timestamp.map(|t| t.0)),
    }
}
