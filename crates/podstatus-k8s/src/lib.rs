//! Kubernetes client for podstatus
//!
//! This crate provides Kubernetes API integration: kubeconfig loading,
//! pod listing and watching, workload selector resolution and pod events.

mod client;
mod convert;
mod events;
mod lookup;
mod resolver;
mod source;

pub use client::KubeClient;
pub use convert::{ConversionError, event_record, pod_snapshot};
pub use events::pod_events;
pub use lookup::KubeLookup;
pub use resolver::{
    FetchedObject, LookupError, ObjectLookup, Resolution, ResolveError, SelectorResolver,
    TargetSpec,
};
pub use source::{
    EventSender, KubePodSource, PodListing, PodSource, SourceError, StreamError, Subscription,
};

// Re-export types that are used in our public API
pub use podstatus_types::{
    EventRecord, PodQuery, PodSnapshot, ScaleTargetRef, TargetKind, TargetReference, WatchEvent,
};
