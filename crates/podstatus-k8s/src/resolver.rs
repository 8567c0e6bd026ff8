//! Mapping of named workloads to the label selector of their pods

use std::future::Future;

use thiserror::Error;
use tracing::debug;

use podstatus_types::{PodSelector, ScaleTargetRef, TargetKind, TargetReference};

/// Failure of the object lookup collaborator
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: TargetKind,
        namespace: String,
        name: String,
    },
    #[error("cannot map {kind} in {api_version}: {reason}")]
    Unmapped {
        api_version: String,
        kind: String,
        reason: String,
    },
    #[error("{0} objects do not select pods")]
    NoSelector(TargetKind),
    #[error(transparent)]
    Api(#[from] kube::Error),
}

/// Why a target could not be turned into a pod selector
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),
    #[error("cannot resolve the scale target of HorizontalPodAutoscaler {autoscaler}: {reason}")]
    AmbiguousOrMissingTarget { autoscaler: String, reason: String },
    /// Pods have no selector; callers show the pod and its events instead
    #[error("pod {namespace}/{name} is not selected by labels")]
    SinglePod { namespace: String, name: String },
    #[error("no deployment, statefulset or daemonset named {name} in namespace {namespace}")]
    NotFound { namespace: String, name: String },
    #[error("{kind} {name} has an empty selector")]
    EmptySelector { kind: TargetKind, name: String },
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// A fetched object reduced to what matters for pod selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchedObject {
    /// A workload and the selector of the pods it owns
    Workload(PodSelector),
    /// An autoscaler and the object it scales
    ScaleTarget(ScaleTargetRef),
}

/// Typed object lookup against the cluster
pub trait ObjectLookup {
    /// Fetch an object and normalize it, whatever API version served it
    fn fetch(
        &self,
        kind: TargetKind,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<FetchedObject, LookupError>> + Send;

    /// Map a scale target reference to the kind the cluster serves it as
    fn map_scale_target(
        &self,
        target: &ScaleTargetRef,
    ) -> impl Future<Output = Result<String, LookupError>> + Send;
}

/// A target as given on the command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSpec {
    /// Explicit `kind/name` or `kind name`
    Reference(TargetReference),
    /// Bare name, probed against the common workload kinds
    Name { namespace: String, name: String },
}

impl TargetSpec {
    /// Parse `NAME`, `KIND/NAME` or `KIND NAME`
    pub fn parse(args: &[String], namespace: &str) -> Result<Self, ResolveError> {
        let reference = |kind: &str, name: &str| -> Result<Self, ResolveError> {
            if name.is_empty() {
                return Err(ResolveError::InvalidTarget(format!("{}/", kind)));
            }
            let kind = TargetKind::from_alias(kind)
                .ok_or_else(|| ResolveError::UnsupportedKind(kind.to_string()))?;
            Ok(Self::Reference(TargetReference::new(kind, namespace, name)))
        };

        match args {
            [single] => match single.split_once('/') {
                Some((kind, name)) => reference(kind, name),
                None if single.is_empty() => Err(ResolveError::InvalidTarget(single.clone())),
                None => Ok(Self::Name {
                    namespace: namespace.to_string(),
                    name: single.clone(),
                }),
            },
            [kind, name] => reference(kind.as_str(), name.as_str()),
            _ => Err(ResolveError::InvalidTarget(args.join(" "))),
        }
    }
}

/// Outcome of a successful resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The workload whose selector was used
    pub target: TargetReference,
    /// Autoscaler the workload was reached through, if any
    pub via: Option<TargetReference>,
    /// Label query selecting the workload's pods
    pub selector: String,
}

/// Resolves workload references to pod selectors
pub struct SelectorResolver<'a, L> {
    lookup: &'a L,
}

impl<'a, L: ObjectLookup> SelectorResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Resolve a command line target, probing kinds for bare names
    pub async fn resolve_spec(&self, spec: &TargetSpec) -> Result<Resolution, ResolveError> {
        match spec {
            TargetSpec::Reference(target) => self.resolve(target).await,
            TargetSpec::Name { namespace, name } => self.probe(namespace, name).await,
        }
    }

    /// Resolve a reference to the selector of the pods behind it
    pub async fn resolve(&self, target: &TargetReference) -> Result<Resolution, ResolveError> {
        match target.kind {
            TargetKind::Pod => Err(ResolveError::SinglePod {
                namespace: target.namespace.clone(),
                name: target.name.clone(),
            }),
            TargetKind::HorizontalPodAutoscaler => self.resolve_autoscaler(target).await,
            _ => {
                let selector = self.workload_selector(target).await?;
                Ok(Resolution {
                    target: target.clone(),
                    via: None,
                    selector,
                })
            }
        }
    }

    async fn workload_selector(&self, target: &TargetReference) -> Result<String, ResolveError> {
        let fetched = self
            .lookup
            .fetch(target.kind, &target.namespace, &target.name)
            .await?;

        match fetched {
            FetchedObject::Workload(selector) if selector.is_empty() => {
                Err(ResolveError::EmptySelector {
                    kind: target.kind,
                    name: target.name.clone(),
                })
            }
            FetchedObject::Workload(selector) => Ok(selector.to_query()),
            FetchedObject::ScaleTarget(_) => {
                Err(ResolveError::UnsupportedKind(target.kind.to_string()))
            }
        }
    }

    /// Follow an autoscaler to the workload it scales (one level only)
    async fn resolve_autoscaler(
        &self,
        autoscaler: &TargetReference,
    ) -> Result<Resolution, ResolveError> {
        let missing = |reason: String| ResolveError::AmbiguousOrMissingTarget {
            autoscaler: autoscaler.name.clone(),
            reason,
        };

        let scale_target = match self
            .lookup
            .fetch(autoscaler.kind, &autoscaler.namespace, &autoscaler.name)
            .await?
        {
            FetchedObject::ScaleTarget(scale_target) => scale_target,
            FetchedObject::Workload(_) => {
                return Err(missing("object has no scale target".to_string()));
            }
        };

        let api_kind = self
            .lookup
            .map_scale_target(&scale_target)
            .await
            .map_err(|e| missing(e.to_string()))?;
        let kind = TargetKind::from_api_kind(&api_kind)
            .ok_or_else(|| ResolveError::UnsupportedKind(api_kind.clone()))?;
        if matches!(kind, TargetKind::HorizontalPodAutoscaler | TargetKind::Pod) {
            return Err(missing(format!("{} cannot be a scale target", kind)));
        }

        let target = TargetReference::new(kind, &autoscaler.namespace, &scale_target.name);
        debug!(autoscaler = %autoscaler.name, workload = %target, "following scale target");

        let selector = match self.workload_selector(&target).await {
            Ok(selector) => selector,
            Err(ResolveError::Lookup(e)) => return Err(missing(e.to_string())),
            Err(e) => return Err(e),
        };

        Ok(Resolution {
            target,
            via: Some(autoscaler.clone()),
            selector,
        })
    }

    /// Try each common workload kind for a bare name; first hit wins
    async fn probe(&self, namespace: &str, name: &str) -> Result<Resolution, ResolveError> {
        for kind in TargetKind::probe_order() {
            let target = TargetReference::new(kind, namespace, name);
            match self.resolve(&target).await {
                Err(ResolveError::Lookup(LookupError::NotFound { .. })) => {
                    debug!(kind = %kind, name, "not found, trying next kind");
                }
                other => return other,
            }
        }

        Err(ResolveError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}
