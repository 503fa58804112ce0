//! # Recorder
//!
//! Message-passing front end for a [`Session`].
//!
//! Platform location callbacks push fixes into a bounded channel; a single
//! consumer thread owns the session and applies commands in order. After
//! draining whatever is queued it notifies the observer once, so a slow
//! renderer sees batches instead of every fix. Batching never changes the
//! computed track, only how often observers hear about it.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::error::{Result, TrackError};
use crate::gate::Fix;
use crate::route::{ReferenceTrack, RouteAlert};
use crate::session::{FixOutcome, Session};
use crate::track::LiveTrack;

/// Receives the results of a running session. Every method defaults to a
/// no-op so observers only implement what they consume.
pub trait SessionObserver: Send {
    /// A route transition needs an audible alert.
    fn on_alert(&mut self, _alert: RouteAlert) {}

    /// The track changed; called once per drained batch.
    fn on_batch(&mut self, _track: &LiveTrack) {}

    /// The session stopped; the final track is ready to persist.
    fn on_finished(&mut self, _track: &LiveTrack) {}
}

impl SessionObserver for () {}

enum Command {
    Fix(Fix),
    LoadReference(ReferenceTrack),
    ClearReference,
    SetRouteChecking(bool),
    Stop,
}

/// Handle to a session running on its own thread.
pub struct Recorder {
    sender: SyncSender<Command>,
    worker: Option<JoinHandle<Option<LiveTrack>>>,
}

impl Recorder {
    /// Move `session` onto a consumer thread fed by a queue of `capacity`
    /// commands.
    pub fn spawn<O>(session: Session, capacity: usize, observer: O) -> Result<Self>
    where
        O: SessionObserver + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let worker = thread::Builder::new()
            .name("live-tracker".to_string())
            .spawn(move || consume(session, receiver, observer))
            .map_err(|e| TrackError::Internal {
                message: format!("failed to spawn recorder thread: {}", e),
            })?;

        info!("[Recorder] Started with queue capacity {}", capacity.max(1));
        Ok(Self {
            sender,
            worker: Some(worker),
        })
    }

    /// Queue a fix, waiting while the queue is full.
    pub fn send_fix(&self, fix: Fix) -> Result<()> {
        self.send(Command::Fix(fix))
    }

    /// Queue a fix without waiting. Returns `false` if the queue is full
    /// and the fix was dropped.
    pub fn try_send_fix(&self, fix: Fix) -> Result<bool> {
        match self.sender.try_send(Command::Fix(fix)) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                debug!("[Recorder] Queue full, fix dropped");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(closed()),
        }
    }

    pub fn load_reference(&self, reference: ReferenceTrack) -> Result<()> {
        self.send(Command::LoadReference(reference))
    }

    pub fn clear_reference(&self) -> Result<()> {
        self.send(Command::ClearReference)
    }

    pub fn set_route_checking(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetRouteChecking(enabled))
    }

    /// Stop the session after everything already queued and return the
    /// finished track.
    pub fn stop(mut self) -> Result<Option<LiveTrack>> {
        self.send(Command::Stop)?;
        self.join()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.sender.send(command).map_err(|_| closed())
    }

    fn join(&mut self) -> Result<Option<LiveTrack>> {
        let worker = self.worker.take().ok_or_else(closed)?;
        worker.join().map_err(|_| TrackError::Internal {
            message: "recorder thread panicked".to_string(),
        })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            // Ignore errors: the thread may already be gone
            let _ = self.sender.send(Command::Stop);
            if self.join().is_err() {
                warn!("[Recorder] Recorder thread ended abnormally");
            }
        }
    }
}

fn closed() -> TrackError {
    TrackError::RecorderClosed {
        message: "session thread is no longer running".to_string(),
    }
}

/// Consumer loop: apply commands in order, notify once per drained batch.
fn consume<O: SessionObserver>(
    mut session: Session,
    receiver: Receiver<Command>,
    mut observer: O,
) -> Option<LiveTrack> {
    let mut stopping = false;

    while let Ok(first) = receiver.recv() {
        let mut changed = false;
        let mut batch = 0usize;
        let mut next = Some(first);

        while let Some(command) = next.take() {
            batch += 1;
            match command {
                Command::Fix(fix) => {
                    let outcome = session.push(&fix);
                    if let FixOutcome::Accepted { alert, .. } = outcome {
                        changed = true;
                        if let Some(alert) = alert {
                            observer.on_alert(alert);
                        }
                    }
                }
                Command::LoadReference(reference) => session.load_reference(reference),
                Command::ClearReference => session.clear_reference(),
                Command::SetRouteChecking(enabled) => session.set_route_checking(enabled),
                Command::Stop => {
                    stopping = true;
                    break;
                }
            }
            next = receiver.try_recv().ok();
        }

        if changed {
            if let Some(track) = session.track() {
                debug!("[Recorder] Batch of {} command(s) applied", batch);
                observer.on_batch(track);
            }
        }
        if stopping {
            break;
        }
    }

    let track = session.stop();
    if let Some(ref track) = track {
        observer.on_finished(track);
    }
    info!("[Recorder] Stopped");
    track
}
