//! Session worker thread.
//!
//! Serializes every background event onto one thread: it takes the session
//! lock to apply the event, releases it, then dispatches the resulting
//! notifications to the delegate.

use super::event::{Notification, SessionEvent};
use super::Core;
use crate::capture::CaptureBackend;
use crate::delegate::SessionDelegate;
use crate::export::Exporter;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

pub(crate) fn spawn<B, E>(core: Arc<Core<B, E>>, events: Receiver<SessionEvent>) -> JoinHandle<()>
where
    B: CaptureBackend,
    E: Exporter,
{
    thread::Builder::new()
        .name("reel-session".into())
        .spawn(move || worker_loop(core, events))
        .expect("Failed to spawn session worker thread")
}

fn worker_loop<B, E>(core: Arc<Core<B, E>>, events: Receiver<SessionEvent>)
where
    B: CaptureBackend,
    E: Exporter,
{
    debug!("Session worker started");
    for event in events.iter() {
        let notifications = match event {
            SessionEvent::Shutdown => break,
            SessionEvent::Notify(notifications) => notifications,
            event => {
                let mut state = core.state.lock();
                state.handle(event);
                state.take_notifications()
            }
        };
        dispatch(core.delegate.as_ref(), notifications);
    }
    debug!("Session worker stopped");
}

fn dispatch(delegate: &dyn SessionDelegate, notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Finished => delegate.on_finished(),
            Notification::Error(e) => delegate.on_error(&e),
            Notification::Progress(progress) => delegate.on_progress(progress),
            Notification::Completion(completion) => completion(),
        }
    }
}
