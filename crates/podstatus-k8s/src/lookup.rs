//! Kubernetes-backed [`ObjectLookup`]
//!
//! Every supported kind is fetched at its current API version and reduced to
//! a [`FetchedObject`], so the resolver never sees version-specific shapes.

use std::fmt::Debug;

use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::GroupVersionKind;
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use podstatus_types::{PodSelector, ScaleTargetRef, SelectorRequirement, TargetKind};

use crate::resolver::{FetchedObject, LookupError, ObjectLookup};

/// Object lookup using typed API calls and discovery
#[derive(Clone)]
pub struct KubeLookup {
    client: kube::Client,
}

impl KubeLookup {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    async fn get<K>(&self, kind: TargetKind, namespace: &str, name: &str) -> Result<K, LookupError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await?.ok_or_else(|| LookupError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

impl ObjectLookup for KubeLookup {
    async fn fetch(
        &self,
        kind: TargetKind,
        namespace: &str,
        name: &str,
    ) -> Result<FetchedObject, LookupError> {
        let selector = match kind {
            TargetKind::Deployment => {
                let object: Deployment = self.get(kind, namespace, name).await?;
                label_selector(object.spec.map(|s| s.selector))
            }
            TargetKind::StatefulSet => {
                let object: StatefulSet = self.get(kind, namespace, name).await?;
                label_selector(object.spec.map(|s| s.selector))
            }
            TargetKind::DaemonSet => {
                let object: DaemonSet = self.get(kind, namespace, name).await?;
                label_selector(object.spec.map(|s| s.selector))
            }
            TargetKind::ReplicaSet => {
                let object: ReplicaSet = self.get(kind, namespace, name).await?;
                label_selector(object.spec.map(|s| s.selector))
            }
            TargetKind::Job => {
                let object: Job = self.get(kind, namespace, name).await?;
                label_selector(object.spec.and_then(|s| s.selector))
            }
            TargetKind::CronJob => {
                // Jobs get their selector generated, so use the pod template labels
                let object: CronJob = self.get(kind, namespace, name).await?;
                let labels = object
                    .spec
                    .and_then(|s| s.job_template.spec)
                    .and_then(|j| j.template.metadata)
                    .and_then(|m| m.labels)
                    .unwrap_or_default();
                PodSelector::from_labels(labels)
            }
            TargetKind::Service => {
                let object: Service = self.get(kind, namespace, name).await?;
                PodSelector::from_labels(object.spec.and_then(|s| s.selector).unwrap_or_default())
            }
            TargetKind::HorizontalPodAutoscaler => {
                let object: HorizontalPodAutoscaler = self.get(kind, namespace, name).await?;
                let Some(spec) = object.spec else {
                    return Err(LookupError::NoSelector(kind));
                };
                let target = spec.scale_target_ref;
                return Ok(FetchedObject::ScaleTarget(ScaleTargetRef {
                    api_version: target.api_version.unwrap_or_default(),
                    kind: target.kind,
                    name: target.name,
                }));
            }
            TargetKind::Pod => return Err(LookupError::NoSelector(kind)),
        };

        Ok(FetchedObject::Workload(selector))
    }

    async fn map_scale_target(&self, target: &ScaleTargetRef) -> Result<String, LookupError> {
        let (group, version) = target.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &target.kind);

        let (resource, _capabilities) = kube::discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| LookupError::Unmapped {
                api_version: target.api_version.clone(),
                kind: target.kind.clone(),
                reason: e.to_string(),
            })?;

        debug!(kind = %resource.kind, plural = %resource.plural, "mapped scale target");
        Ok(resource.kind)
    }
}

/// Normalize a label selector into the canonical pod selector
fn label_selector(selector: Option<LabelSelector>) -> PodSelector {
    let Some(selector) = selector else {
        return PodSelector::default();
    };

    PodSelector {
        match_labels: selector.match_labels.unwrap_or_default(),
        match_expressions: selector
            .match_expressions
            .unwrap_or_default()
            .into_iter()
            .map(|r| SelectorRequirement {
                key: r.key,
                operator: r.operator,
                values: r.values.unwrap_or_default(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_selector_normalization() {
        let selector: LabelSelector = serde_json::from_value(json!({
            "matchLabels": { "app": "web" },
            "matchExpressions": [
                { "key": "env", "operator": "NotIn", "values": ["dev"] },
                { "key": "track", "operator": "Exists" }
            ]
        }))
        .unwrap();

        let normalized = label_selector(Some(selector));
        assert_eq!(normalized.to_query(), "app=web,env notin (dev),track");
    }

    #[test]
    fn test_missing_selector_is_empty() {
        assert!(label_selector(None).is_empty());
    }
}
