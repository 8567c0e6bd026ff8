use std::collections::HashMap;

use chrono::{DateTime, Utc};

use podstatus_status::StatusEngine;
use podstatus_types::{DisplaySummary, PodSnapshot, WatchEvent};

/// The pods currently on screen, keyed by UID
#[derive(Debug, Default)]
pub struct LiveSet {
    pods: HashMap<String, PodSnapshot>,
}

impl LiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a pod
    pub fn upsert(&mut self, pod: PodSnapshot) {
        self.pods.insert(pod.uid.clone(), pod);
    }

    pub fn remove(&mut self, uid: &str) -> Option<PodSnapshot> {
        self.pods.remove(uid)
    }

    /// Apply a change notification
    pub fn apply(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Added(pod) | WatchEvent::Modified(pod) => self.upsert(pod),
            WatchEvent::Deleted(pod) => {
                self.remove(&pod.uid);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.pods.contains_key(uid)
    }

    /// Pods ordered by name, ties broken by UID
    pub fn sorted(&self) -> Vec<&PodSnapshot> {
        let mut pods: Vec<&PodSnapshot> = self.pods.values().collect();
        pods.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uid.cmp(&b.uid)));
        pods
    }

    /// Fresh summaries of every pod, in display order
    pub fn summaries_at(&self, now: DateTime<Utc>) -> Vec<DisplaySummary> {
        self.sorted()
            .into_iter()
            .map(|pod| StatusEngine::derive_at(pod, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(uid: &str, name: &str) -> PodSnapshot {
        let mut pod = PodSnapshot::new(uid, name, "default");
        pod.phase = "Running".to_string();
        pod
    }

    #[test]
    fn test_add_then_delete() {
        let mut live = LiveSet::new();
        live.apply(WatchEvent::Added(pod("a", "web-a")));
        live.apply(WatchEvent::Added(pod("b", "web-b")));
        live.apply(WatchEvent::Deleted(pod("a", "web-a")));

        assert_eq!(live.len(), 1);
        assert!(live.contains("b"));
        assert!(!live.contains("a"));
    }

    #[test]
    fn test_modified_replaces_by_uid() {
        let mut live = LiveSet::new();
        live.apply(WatchEvent::Added(pod("a", "web-a")));

        let mut updated = pod("a", "web-a");
        updated.phase = "Failed".to_string();
        live.apply(WatchEvent::Modified(updated));

        assert_eq!(live.len(), 1);
        assert_eq!(live.sorted()[0].phase, "Failed");
    }

    #[test]
    fn test_delete_of_unknown_pod_is_ignored() {
        let mut live = LiveSet::new();
        live.apply(WatchEvent::Deleted(pod("x", "ghost")));
        assert!(live.is_empty());
    }

    #[test]
    fn test_sorted_by_name_then_uid() {
        let mut live = LiveSet::new();
        live.upsert(pod("3", "web-b"));
        live.upsert(pod("2", "web-a"));
        live.upsert(pod("1", "web-a"));

        let order: Vec<&str> = live.sorted().iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_summaries_follow_display_order() {
        let mut live = LiveSet::new();
        live.upsert(pod("b", "zeta"));
        live.upsert(pod("a", "alpha"));

        let names: Vec<String> = live
            .summaries_at(Utc::now())
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
