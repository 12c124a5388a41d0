//! Background loading.
//!
//! Decoding runs on one worker thread so the interface stays responsive.
//! Every request gets a ticket; only the latest ticket's result should be
//! applied, and the worker skips queued requests that are already superseded.

use super::LoaderRegistry;
use crate::data::DecodedDocument;
use crate::error::{DeepviewError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Identifies one load request. Later requests have larger tickets.
pub type Ticket = u64;

/// Progress reported by the worker.
#[derive(Debug)]
pub enum LoadEvent {
    /// Decoding of the request began.
    Started {
        /// Request ticket.
        ticket: Ticket,
        /// File being decoded.
        path: PathBuf,
    },
    /// Decoding of the request ended.
    Finished {
        /// Request ticket.
        ticket: Ticket,
        /// The document, or why it could not be loaded.
        result: Result<Arc<DecodedDocument>>,
    },
}

impl LoadEvent {
    /// Ticket the event belongs to.
    pub fn ticket(&self) -> Ticket {
        match self {
            LoadEvent::Started { ticket, .. } | LoadEvent::Finished { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug)]
struct Request {
    ticket: Ticket,
    path: PathBuf,
}

/// Handle to the background load thread.
#[derive(Debug)]
pub struct LoadWorker {
    requests: Option<Sender<Request>>,
    events: Receiver<LoadEvent>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl LoadWorker {
    /// Start the worker thread. It owns the registry from here on.
    pub fn spawn(mut registry: LoaderRegistry) -> Self {
        let (request_tx, request_rx) = unbounded::<Request>();
        let (event_tx, event_rx) = unbounded::<LoadEvent>();
        let latest = Arc::new(AtomicU64::new(0));
        let worker_latest = Arc::clone(&latest);

        let handle = std::thread::Builder::new()
            .name("deepview-loader".into())
            .spawn(move || {
                for request in request_rx.iter() {
                    if request.ticket < worker_latest.load(Ordering::Acquire) {
                        tracing::debug!("Skipping superseded load #{}", request.ticket);
                        continue;
                    }
                    let started = LoadEvent::Started {
                        ticket: request.ticket,
                        path: request.path.clone(),
                    };
                    if event_tx.send(started).is_err() {
                        break;
                    }

                    let result = registry.load(&request.path);
                    if let Err(e) = &result {
                        tracing::warn!("Load #{} failed: {}", request.ticket, e);
                    }
                    let finished = LoadEvent::Finished {
                        ticket: request.ticket,
                        result,
                    };
                    if event_tx.send(finished).is_err() {
                        break;
                    }
                }
                tracing::debug!("Load worker exiting");
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start load worker: {}", e);
                None
            },
        };

        Self {
            requests: handle.as_ref().map(|_| request_tx),
            events: event_rx,
            latest,
            handle,
        }
    }

    /// Queue a file for loading and return its ticket.
    pub fn submit(&self, path: impl Into<PathBuf>) -> Result<Ticket> {
        let sender = self.requests.as_ref().ok_or(DeepviewError::WorkerStopped)?;
        let ticket = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        sender
            .send(Request {
                ticket,
                path: path.into(),
            })
            .map_err(|_| DeepviewError::WorkerStopped)?;
        Ok(ticket)
    }

    /// Most recently issued ticket.
    pub fn latest(&self) -> Ticket {
        self.latest.load(Ordering::Acquire)
    }

    /// Whether `ticket` is still the one to apply.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket == self.latest()
    }

    /// Number of events produced but not yet received.
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    /// Next event, if one is ready.
    pub fn try_recv(&self) -> Option<LoadEvent> {
        self.events.try_recv().ok()
    }

    /// Next event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<LoadEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DeepviewError::WorkerStopped),
        }
    }
}

impl Drop for LoadWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::limits::LoaderConfig;

    fn wait_for_finish(worker: &LoadWorker, ticket: Ticket) -> Result<Arc<DecodedDocument>> {
        loop {
            match worker.recv_timeout(Duration::from_secs(10)).unwrap() {
                Some(LoadEvent::Finished { ticket: t, result }) if t == ticket => return result,
                Some(_) => continue,
                None => panic!("timed out waiting for load #{ticket}"),
            }
        }
    }

    #[test]
    fn loads_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, r#"{"x": 1}"#).unwrap();

        let worker = LoadWorker::spawn(LoaderRegistry::new(LoaderConfig::default()));
        let ticket = worker.submit(&path).unwrap();
        assert!(worker.is_current(ticket));

        let doc = wait_for_finish(&worker, ticket).unwrap();
        assert!(doc.value.as_map().unwrap().contains_key("x"));
    }

    #[test]
    fn newer_request_supersedes_older() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(&first, "[1]").unwrap();
        std::fs::write(&second, "[1, 2]").unwrap();

        let worker = LoadWorker::spawn(LoaderRegistry::default());
        let old = worker.submit(&first).unwrap();
        let new = worker.submit(&second).unwrap();
        assert!(new > old);
        assert!(!worker.is_current(old));

        let doc = wait_for_finish(&worker, new).unwrap();
        assert_eq!(doc.value.as_list().unwrap().len(), 2);
    }

    #[test]
    fn failures_are_reported_as_events() {
        let worker = LoadWorker::spawn(LoaderRegistry::default());
        let ticket = worker.submit("/no/such/file.json").unwrap();
        let err = wait_for_finish(&worker, ticket).unwrap_err();
        assert_eq!(err.category(), "NotFound");
    }
}
