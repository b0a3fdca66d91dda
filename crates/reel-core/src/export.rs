//! Exporter capability.

use crate::config::EncoderSettings;
use crate::error::{Error, Result};
use crate::session::event::SessionEvent;
use crate::timeline::Timeline;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// A finalized timeline to be encoded.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub timeline: Timeline,
    pub output_path: PathBuf,
    pub settings: EncoderSettings,
}

/// Transcodes a merged timeline into the final output file.
///
/// `export` must return promptly and report the outcome through the
/// completion token, typically from a background thread. The output path
/// must only be written through [`ExportCompletion::commit`], so a session
/// reset while the export runs leaves no file behind.
pub trait Exporter: Send + 'static {
    fn export(&mut self, job: ExportJob, completion: ExportCompletion);
}

impl<E: Exporter + ?Sized> Exporter for Box<E> {
    fn export(&mut self, job: ExportJob, completion: ExportCompletion) {
        (**self).export(job, completion)
    }
}

enum CompletionTarget {
    Session {
        events: Sender<SessionEvent>,
        attempt: u64,
    },
    Probe(Sender<Result<()>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Publish {
    Pending,
    Committed,
    Cancelled,
}

/// Cancels an in-flight export.
///
/// Shares a gate with the export's [`ExportCompletion`]: once cancelled,
/// the exporter can no longer publish its output.
#[derive(Debug, Clone)]
pub struct ExportCancel {
    gate: Arc<Mutex<Publish>>,
}

impl ExportCancel {
    /// Forbid publishing the output.
    ///
    /// Returns `true` if the exporter had already published it, in which
    /// case the caller owns removing the file.
    pub fn cancel(&self) -> bool {
        let mut gate = self.gate.lock();
        match *gate {
            Publish::Committed => true,
            _ => {
                *gate = Publish::Cancelled;
                false
            }
        }
    }
}

/// One-shot completion token for an export.
///
/// [`complete`](Self::complete) consumes the token. Dropping it without
/// completing reports an export error, so exactly one outcome is always
/// delivered.
pub struct ExportCompletion {
    target: CompletionTarget,
    gate: Arc<Mutex<Publish>>,
    done: bool,
}

impl ExportCompletion {
    fn with_target(target: CompletionTarget) -> Self {
        Self {
            target,
            gate: Arc::new(Mutex::new(Publish::Pending)),
            done: false,
        }
    }

    pub(crate) fn session(events: Sender<SessionEvent>, attempt: u64) -> Self {
        Self::with_target(CompletionTarget::Session { events, attempt })
    }

    /// A token detached from any session; the outcome arrives on the receiver.
    pub fn probe() -> (Self, Receiver<Result<()>>) {
        let (tx, rx) = unbounded();
        (Self::with_target(CompletionTarget::Probe(tx)), rx)
    }

    /// Handle that cancels this export.
    pub fn cancel_handle(&self) -> ExportCancel {
        ExportCancel {
            gate: Arc::clone(&self.gate),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.gate.lock() == Publish::Cancelled
    }

    /// Publish the output with `publish`, unless the export was cancelled.
    ///
    /// `publish` runs with the gate held, so a concurrent cancel either
    /// happens before it (and `publish` never runs) or observes the
    /// published file.
    pub fn commit<F>(&self, publish: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut gate = self.gate.lock();
        if *gate == Publish::Cancelled {
            return Err(Error::Export("export cancelled".into()));
        }
        publish()?;
        *gate = Publish::Committed;
        Ok(())
    }

    /// Report the export outcome.
    pub fn complete(mut self, result: Result<()>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: Result<()>) {
        self.done = true;
        match &self.target {
            CompletionTarget::Session { events, attempt } => {
                let _ = events.send(SessionEvent::ExportFinished {
                    attempt: *attempt,
                    result,
                });
            }
            CompletionTarget::Probe(tx) => {
                let _ = tx.send(result);
            }
        }
    }
}

impl Drop for ExportCompletion {
    fn drop(&mut self) {
        if !self.done {
            self.deliver(Err(Error::Export(
                "exporter dropped the job without completing it".into(),
            )));
        }
    }
}

impl std::fmt::Debug for ExportCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCompletion")
            .field("publish", &*self.gate.lock())
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_delivers_once() {
        let (completion, rx) = ExportCompletion::probe();
        completion.complete(Ok(()));
        assert_eq!(rx.recv().unwrap(), Ok(()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_reports_error() {
        let (completion, rx) = ExportCompletion::probe();
        drop(completion);
        assert!(matches!(rx.recv().unwrap(), Err(Error::Export(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_blocks_commit() {
        let (completion, _rx) = ExportCompletion::probe();
        let cancel = completion.cancel_handle();
        assert!(!cancel.cancel());
        assert!(completion.is_cancelled());

        let mut published = false;
        let result = completion.commit(|| {
            published = true;
            Ok(())
        });
        assert_eq!(result, Err(Error::Export("export cancelled".into())));
        assert!(!published);
    }

    #[test]
    fn test_cancel_after_commit_reports_published() {
        let (completion, _rx) = ExportCompletion::probe();
        let cancel = completion.cancel_handle();
        completion.commit(|| Ok(())).unwrap();
        assert!(cancel.cancel());
        assert!(!completion.is_cancelled());
    }

    #[test]
    fn test_failed_publish_stays_cancellable() {
        let (completion, _rx) = ExportCompletion::probe();
        let cancel = completion.cancel_handle();
        let result = completion.commit(|| Err(Error::Export("disk full".into())));
        assert!(result.is_err());
        assert!(!cancel.cancel());
    }
}
