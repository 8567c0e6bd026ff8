use chrono::{DateTime, Utc};

use podstatus_types::{
    ContainerState, ContainerStatus, DisplaySummary, NONE_SENTINEL, PodSnapshot,
};

use crate::age::age_since;

/// Waiting reason reported by init containers that simply have not started yet
const POD_INITIALIZING: &str = "PodInitializing";

/// Status reason set by the node controller when a node stops reporting
const NODE_UNREACHABLE_REASON: &str = "NodeLost";

/// Derives the display summary of a pod
pub struct StatusEngine;

impl StatusEngine {
    /// Summarize a pod, measuring its age against the current time
    pub fn derive(pod: &PodSnapshot) -> DisplaySummary {
        Self::derive_at(pod, Utc::now())
    }

    /// Summarize a pod as seen at `now`
    pub fn derive_at(pod: &PodSnapshot, now: DateTime<Utc>) -> DisplaySummary {
        let mut reason = match present(&pod.reason) {
            Some(reason) => reason.to_string(),
            None => pod.phase.clone(),
        };

        let (init_reason, mut restarts) = Self::init_status(pod);
        let initializing = init_reason.is_some();
        if let Some(init_reason) = init_reason {
            reason = init_reason;
        }

        let mut ready_count = 0;
        let mut has_running = false;
        if !initializing {
            restarts = 0;
            // Walk backwards so the first declared container has the final say
            for container in pod.containers.iter().rev() {
                restarts += container.restart_count;
                match &container.state {
                    Some(ContainerState::Waiting {
                        reason: Some(waiting),
                        ..
                    }) if !waiting.is_empty() => {
                        reason = waiting.clone();
                    }
                    Some(ContainerState::Terminated(terminated)) => {
                        reason = match present(&terminated.reason) {
                            Some(r) => r.to_string(),
                            None if terminated.signal != 0 => {
                                format!("Signal:{}", terminated.signal)
                            }
                            None => format!("ExitCode:{}", terminated.exit_code),
                        };
                    }
                    Some(ContainerState::Running { .. }) if container.ready => {
                        has_running = true;
                        ready_count += 1;
                    }
                    _ => {}
                }
            }
        }

        if pod.deletion_timestamp.is_some() {
            reason = if pod.reason.as_deref() == Some(NODE_UNREACHABLE_REASON) {
                "Unknown".to_string()
            } else {
                "Terminating".to_string()
            };
        }

        // A restarted container can leave a completed pod with live containers
        if reason == "Completed" && has_running {
            reason = "Running".to_string();
        }

        DisplaySummary {
            name: pod.name.clone(),
            ready_count,
            total_count: pod.container_count.max(pod.containers.len()),
            reason,
            last_reason: Self::last_reason(&pod.containers),
            restarts,
            pod_ip: or_none(&pod.pod_ip),
            host_ip: or_none(&pod.host_ip),
            node_name: or_none(&pod.node_name),
            age: pod
                .start_time
                .map(|start| age_since(start, now))
                .unwrap_or_else(|| NONE_SENTINEL.to_string()),
            initializing,
        }
    }

    /// Evaluate init containers in declared order.
    ///
    /// Returns the reason an init container is holding the pod back (if
    /// any) and the sum of init container restarts.
    fn init_status(pod: &PodSnapshot) -> (Option<String>, i32) {
        let total = pod.init_container_count.max(pod.init_containers.len());
        let mut restarts = 0;
        let mut reason = None;

        for (index, container) in pod.init_containers.iter().enumerate() {
            restarts += container.restart_count;
            match &container.state {
                Some(ContainerState::Terminated(terminated)) if terminated.exit_code == 0 => {
                    continue;
                }
                Some(ContainerState::Terminated(terminated)) => {
                    reason = Some(match present(&terminated.reason) {
                        Some(_) if terminated.signal != 0 => {
                            format!("Init:Signal:{}", terminated.signal)
                        }
                        Some(_) => format!("Init:ExitCode:{}", terminated.exit_code),
                        None => "Init:".to_string(),
                    });
                }
                Some(ContainerState::Waiting {
                    reason: Some(waiting),
                    ..
                }) if !waiting.is_empty() && waiting != POD_INITIALIZING => {
                    reason = Some(format!("Init:{}", waiting));
                }
                _ => {
                    reason = Some(format!("Init:{}/{}", index, total));
                }
            }
        }

        (reason, restarts)
    }

    /// Describe the previous state of the last declared container that has one.
    ///
    /// The highest-indexed container with a last state wins; kubectl-style
    /// printers that scan without stopping end up reporting the lowest one.
    fn last_reason(containers: &[ContainerStatus]) -> String {
        containers
            .iter()
            .rev()
            .find_map(|container| match &container.last_state {
                Some(ContainerState::Terminated(terminated)) => Some(format!(
                    "{}:{}",
                    terminated.reason.as_deref().unwrap_or_default(),
                    terminated.exit_code
                )),
                Some(ContainerState::Waiting { reason, .. }) => {
                    Some(reason.clone().unwrap_or_default())
                }
                _ => None,
            })
            .unwrap_or_else(|| NONE_SENTINEL.to_string())
    }
}

/// Treat an empty string the same as an absent one
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn or_none(value: &Option<String>) -> String {
    present(value).unwrap_or(NONE_SENTINEL).to_string()
}
