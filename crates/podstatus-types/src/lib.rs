//! Shared types for podstatus
//!
//! This crate contains data structures used across multiple podstatus crates.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder printed for any value the cluster has not reported
pub const NONE_SENTINEL: &str = "<none>";

// ============================================================================
// Pod Snapshot
// ============================================================================

/// Point-in-time copy of the parts of a pod that drive its health summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodSnapshot {
    /// Stable identity of the pod
    pub uid: String,
    pub name: String,
    pub namespace: String,
    /// Pod phase as reported by the cluster (may be empty)
    pub phase: String,
    /// Explicit status reason, overrides the phase when present
    pub reason: Option<String>,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub node_name: Option<String>,
    pub host_ip: Option<String>,
    pub pod_ip: Option<String>,
    /// Number of init containers declared in the pod spec
    pub init_container_count: usize,
    /// Number of regular containers declared in the pod spec
    pub container_count: usize,
    pub init_containers: Vec<ContainerStatus>,
    pub containers: Vec<ContainerStatus>,
}

impl PodSnapshot {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            namespace: namespace.into(),
            phase: String::new(),
            reason: None,
            deletion_timestamp: None,
            start_time: None,
            node_name: None,
            host_ip: None,
            pod_ip: None,
            init_container_count: 0,
            container_count: 0,
            init_containers: Vec::new(),
            containers: Vec::new(),
        }
    }
}

/// Runtime status of one container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    /// Only meaningful for regular containers
    pub ready: bool,
    pub restart_count: i32,
    /// `None` means the runtime has not reported a state yet
    pub state: Option<ContainerState>,
    pub last_state: Option<ContainerState>,
}

impl ContainerStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: false,
            restart_count: 0,
            state: None,
            last_state: None,
        }
    }
}

/// Exactly one of the states a container runtime can report
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerState {
    Waiting {
        reason: Option<String>,
        message: Option<String>,
    },
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Terminated(Terminated),
}

impl ContainerState {
    /// Waiting state with just a reason
    pub fn waiting(reason: impl Into<String>) -> Self {
        Self::Waiting {
            reason: Some(reason.into()),
            message: None,
        }
    }

    pub fn running() -> Self {
        Self::Running { started_at: None }
    }
}

/// Details of a terminated container
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Terminated {
    pub reason: Option<String>,
    pub message: Option<String>,
    pub signal: i32,
    pub exit_code: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Terminated {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_signal(mut self, signal: i32) -> Self {
        self.signal = signal;
        self
    }
}

// ============================================================================
// Display Summary
// ============================================================================

/// One rendered row of the pod table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplaySummary {
    pub name: String,
    pub ready_count: usize,
    pub total_count: usize,
    pub reason: String,
    pub last_reason: String,
    pub restarts: i32,
    pub pod_ip: String,
    pub host_ip: String,
    pub node_name: String,
    pub age: String,
    /// Whether an init container still gates the pod
    pub initializing: bool,
}

impl DisplaySummary {
    /// Column titles matching [`DisplaySummary::cells`]
    pub const HEADER: [&'static str; 9] = [
        "NAME", "READY", "STATUS", "LAST", "RESTARTS", "PODIP", "HOSTIP", "NODE", "AGE",
    ];

    /// Format readiness as "ready/total"
    pub fn ready(&self) -> String {
        format!("{}/{}", self.ready_count, self.total_count)
    }

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.ready(),
            self.reason.clone(),
            self.last_reason.clone(),
            self.restarts.to_string(),
            self.pod_ip.clone(),
            self.host_ip.clone(),
            self.node_name.clone(),
            self.age.clone(),
        ]
    }
}

// ============================================================================
// Watch Events
// ============================================================================

/// A change notification for one pod
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PodSnapshot),
    Modified(PodSnapshot),
    Deleted(PodSnapshot),
}

impl WatchEvent {
    pub fn pod(&self) -> &PodSnapshot {
        match self {
            Self::Added(pod) | Self::Modified(pod) | Self::Deleted(pod) => pod,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "ADDED",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
        }
    }
}

/// Which pods a listing or watch covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PodQuery {
    /// Label query, e.g. `app=web,tier=frontend`
    Selector(String),
    /// A single pod by name
    Named(String),
}

// ============================================================================
// Target References
// ============================================================================

/// Kinds of objects that can be named on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    Service,
    HorizontalPodAutoscaler,
    Pod,
}

/// Accepted spellings for each kind (matched case-insensitively)
const KIND_ALIASES: &[(&str, TargetKind)] = &[
    ("deployment", TargetKind::Deployment),
    ("deployments", TargetKind::Deployment),
    ("deploy", TargetKind::Deployment),
    ("statefulset", TargetKind::StatefulSet),
    ("statefulsets", TargetKind::StatefulSet),
    ("sts", TargetKind::StatefulSet),
    ("daemonset", TargetKind::DaemonSet),
    ("daemonsets", TargetKind::DaemonSet),
    ("ds", TargetKind::DaemonSet),
    ("replicaset", TargetKind::ReplicaSet),
    ("replicasets", TargetKind::ReplicaSet),
    ("rs", TargetKind::ReplicaSet),
    ("job", TargetKind::Job),
    ("jobs", TargetKind::Job),
    ("cronjob", TargetKind::CronJob),
    ("cronjobs", TargetKind::CronJob),
    ("cj", TargetKind::CronJob),
    ("service", TargetKind::Service),
    ("services", TargetKind::Service),
    ("svc", TargetKind::Service),
    ("horizontalpodautoscaler", TargetKind::HorizontalPodAutoscaler),
    ("horizontalpodautoscalers", TargetKind::HorizontalPodAutoscaler),
    ("hpa", TargetKind::HorizontalPodAutoscaler),
    ("pod", TargetKind::Pod),
    ("pods", TargetKind::Pod),
    ("po", TargetKind::Pod),
];

impl TargetKind {
    /// Parse a user-supplied kind name or short alias
    pub fn from_alias(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        KIND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, kind)| *kind)
    }

    /// Map an API kind name (as found in a scale target) to a target kind
    pub fn from_api_kind(kind: &str) -> Option<Self> {
        match kind {
            "Deployment" => Some(Self::Deployment),
            "StatefulSet" => Some(Self::StatefulSet),
            "DaemonSet" => Some(Self::DaemonSet),
            "ReplicaSet" => Some(Self::ReplicaSet),
            "Job" => Some(Self::Job),
            "CronJob" => Some(Self::CronJob),
            "Service" => Some(Self::Service),
            "HorizontalPodAutoscaler" => Some(Self::HorizontalPodAutoscaler),
            "Pod" => Some(Self::Pod),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::ReplicaSet => "ReplicaSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Service => "Service",
            Self::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            Self::Pod => "Pod",
        }
    }

    /// Kinds probed, in order, when only a bare name is given
    pub fn probe_order() -> [Self; 3] {
        [Self::Deployment, Self::StatefulSet, Self::DaemonSet]
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named object whose pods should be shown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetReference {
    pub kind: TargetKind,
    pub namespace: String,
    pub name: String,
}

impl TargetReference {
    pub fn new(kind: TargetKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.kind, self.namespace, self.name)
    }
}

/// The object an autoscaler scales, as written in its spec
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleTargetRef {
    /// `group/version`, or just `version` for the core group
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl ScaleTargetRef {
    /// Split the api version into (group, version)
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }
}

// ============================================================================
// Label Selectors
// ============================================================================

/// A set-based selector requirement (`matchExpressions` entry)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorRequirement {
    pub key: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl SelectorRequirement {
    fn to_query(&self) -> String {
        let values = self.values.join(",");
        match self.operator.as_str() {
            "In" => format!("{} in ({})", self.key, values),
            "NotIn" => format!("{} notin ({})", self.key, values),
            "DoesNotExist" => format!("!{}", self.key),
            // Exists and anything unrecognised only constrain the key
            _ => self.key.clone(),
        }
    }
}

/// Canonical pod selector of a workload, independent of API version
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodSelector {
    pub match_labels: BTreeMap<String, String>,
    pub match_expressions: Vec<SelectorRequirement>,
}

impl PodSelector {
    pub fn from_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Format as a label query: sorted `key=value` pairs, then expressions
    pub fn to_query(&self) -> String {
        self.match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .chain(self.match_expressions.iter().map(SelectorRequirement::to_query))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ============================================================================
// Pod Events
// ============================================================================

/// A cluster event recorded against a pod
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// `Normal` or `Warning`
    pub event_type: String,
    pub reason: String,
    pub message: String,
    /// Reporting component
    pub source: String,
    pub last_seen: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_query_is_sorted() {
        let selector = PodSelector::from_labels([("tier", "web"), ("app", "x")]);
        assert_eq!(selector.to_query(), "app=x,tier=web");
        assert_eq!(selector.to_query(), selector.clone().to_query());
    }

    #[test]
    fn test_selector_expressions_follow_labels() {
        let mut selector = PodSelector::from_labels([("app", "x")]);
        selector.match_expressions = vec![
            SelectorRequirement {
                key: "env".to_string(),
                operator: "In".to_string(),
                values: vec!["prod".to_string(), "stage".to_string()],
            },
            SelectorRequirement {
                key: "canary".to_string(),
                operator: "DoesNotExist".to_string(),
                values: Vec::new(),
            },
        ];
        assert_eq!(selector.to_query(), "app=x,env in (prod,stage),!canary");
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(TargetKind::from_alias("deploy"), Some(TargetKind::Deployment));
        assert_eq!(TargetKind::from_alias("STS"), Some(TargetKind::StatefulSet));
        assert_eq!(
            TargetKind::from_alias("hpa"),
            Some(TargetKind::HorizontalPodAutoscaler)
        );
        assert_eq!(TargetKind::from_alias("configmap"), None);
    }

    #[test]
    fn test_scale_target_group_version() {
        let apps = ScaleTargetRef {
            api_version: "apps/v1".to_string(),
            kind: "StatefulSet".to_string(),
            name: "db".to_string(),
        };
        assert_eq!(apps.group_version(), ("apps", "v1"));

        let core = ScaleTargetRef {
            api_version: "v1".to_string(),
            kind: "ReplicationController".to_string(),
            name: "legacy".to_string(),
        };
        assert_eq!(core.group_version(), ("", "v1"));
    }
}
