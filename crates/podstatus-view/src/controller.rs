//! Listing followed by an optional live watch of the matching pods

use std::io::{self, Write};

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use podstatus_k8s::{PodSource, SourceError, StreamError, Subscription};
use podstatus_types::PodQuery;

use crate::live_set::LiveSet;
use crate::screen::ScreenBuffer;

/// Resource version used when the listing did not report one
const INITIAL_VERSION: &str = "0";

/// How long the view stays up
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Render the current pods once
    #[default]
    Once,
    /// Render the current pods, then keep the table up to date
    Watch,
    /// Start from an empty table and only show changes
    WatchOnly,
}

impl Mode {
    pub fn from_flags(watch: bool, watch_only: bool) -> Self {
        if watch_only {
            Self::WatchOnly
        } else if watch {
            Self::Watch
        } else {
            Self::Once
        }
    }

    pub fn watches(&self) -> bool {
        !matches!(self, Self::Once)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Listing,
    Watching,
    Done,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("failed to write to terminal: {0}")]
    Io(#[from] io::Error),
}

/// Drives the pod table from an initial listing and, optionally, a watch
pub struct LiveViewController<S, W: Write> {
    source: S,
    query: PodQuery,
    mode: Mode,
    screen: ScreenBuffer<W>,
    live: LiveSet,
    phase: Phase,
}

impl<S: PodSource, W: Write> LiveViewController<S, W> {
    pub fn new(source: S, query: PodQuery, mode: Mode, screen: ScreenBuffer<W>) -> Self {
        Self {
            source,
            query,
            mode,
            screen,
            live: LiveSet::new(),
            phase: Phase::Listing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn live_set(&self) -> &LiveSet {
        &self.live
    }

    pub fn screen(&self) -> &ScreenBuffer<W> {
        &self.screen
    }

    /// Run until the listing is shown, or until `cancel` fires when watching.
    ///
    /// Cancellation is a normal exit. Failing to list or to subscribe, and a
    /// watch that breaks, are errors; single malformed events are skipped.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), ViewError> {
        self.phase = Phase::Listing;
        let listing = self.source.list(&self.query).await?;
        debug!(pods = listing.pods.len(), "initial listing");

        if self.mode != Mode::WatchOnly {
            for pod in listing.pods {
                self.live.upsert(pod);
            }
            self.redraw()?;
        }

        if !self.mode.watches() {
            self.phase = Phase::Done;
            return Ok(());
        }

        let from_version = listing
            .resource_version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| INITIAL_VERSION.to_string());
        let mut subscription = self.source.watch(&self.query, &from_version).await?;
        info!(resource_version = %from_version, "watching pods");

        self.phase = Phase::Watching;
        let result = self.watch(&mut subscription, &cancel).await;
        subscription.stop();
        self.phase = Phase::Done;

        result
    }

    async fn watch(
        &mut self,
        subscription: &mut Subscription,
        cancel: &CancellationToken,
    ) -> Result<(), ViewError> {
        loop {
            // A busy stream always has an event ready
            if cancel.is_cancelled() {
                debug!("watch cancelled");
                return Ok(());
            }

            tokio::select! {
                item = subscription.next() => match item {
                    Some(Ok(event)) => {
                        debug!(event = event.kind(), uid = %event.pod().uid, "pod changed");
                        self.live.apply(event);
                        self.redraw()?;
                    }
                    Some(Err(e)) if e.is_recoverable() => {
                        warn!(error = %e, "skipping watch event");
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Err(StreamError::Closed("watch stream ended".to_string()).into());
                    }
                },

                _ = cancel.cancelled() => {
                    debug!("watch cancelled");
                    return Ok(());
                }
            }
        }
    }

    fn redraw(&mut self) -> io::Result<()> {
        let rows: Vec<Vec<String>> = self
            .live
            .summaries_at(Utc::now())
            .iter()
            .map(|summary| summary.cells())
            .collect();
        self.screen.render(&rows)
    }
}
