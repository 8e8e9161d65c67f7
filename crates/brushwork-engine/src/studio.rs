//! Async driver tying a [`Session`] to a shared [`StyleFilterEngine`].
//!
//! A [`Studio`] is what an interactive front end talks to: it records
//! uploads and style choices, runs the engine through the session's
//! states, and drops results that arrive after the user moved on.
//!
//! The two suspension points of a run are model acquisition (awaited
//! alongside a cancellation signal) and the pixel pipeline (moved onto
//! tokio's blocking pool). Uploading a new image or calling
//! [`cancel`](Studio::cancel) aborts an acquisition in flight; a
//! pipeline already running finishes, and its result is then discarded
//! if stale.
//!
//! Every state change is published on a `watch` channel
//! ([`subscribe_progress`](Studio::subscribe_progress)) for progress
//! indicators.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use web_time::Instant;

use crate::buffer::PixelBuffer;
use crate::cache::{ModelLoader, SimulatedLoader};
use crate::catalog::StyleId;
use crate::diagnostics::RunDiagnostics;
use crate::engine::{self, StyleFilterEngine};
use crate::session::{Delivery, Progress, RunTicket, Session, SessionState};
use crate::types::EngineError;

/// One user's workspace: a session plus the engine that serves it.
#[derive(Debug)]
pub struct Studio<L = SimulatedLoader> {
    engine: Arc<StyleFilterEngine<L>>,
    session: Mutex<Session>,
    /// Bumped to abort whatever acquisition is in flight.
    cancel: watch::Sender<u64>,
    progress: watch::Sender<Progress>,
    last_run: Mutex<Option<RunDiagnostics>>,
}

impl<L: ModelLoader> Studio<L> {
    /// Create a studio with an empty session.
    #[must_use]
    pub fn new(engine: Arc<StyleFilterEngine<L>>) -> Self {
        let session = Session::new();
        let (cancel, _) = watch::channel(0);
        let (progress, _) = watch::channel(session.progress());
        Self {
            engine,
            session: Mutex::new(session),
            cancel,
            progress,
            last_run: Mutex::new(None),
        }
    }

    /// The engine this studio runs.
    #[must_use]
    pub const fn engine(&self) -> &Arc<StyleFilterEngine<L>> {
        &self.engine
    }

    /// Replace the input image. Any run in flight is invalidated and its
    /// model acquisition aborted.
    pub fn upload(&self, input: PixelBuffer) {
        tracing::debug!(width = input.width(), height = input.height(), "image uploaded");
        self.update(|session| {
            session.upload(input);
            self.signal_cancel();
        });
    }

    /// Choose the style for the next run by wire identifier.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnsupportedStyle`] for an unknown id.
    pub fn select_style(&self, id: &str) -> Result<StyleId, EngineError> {
        self.update(|session| {
            let before = session.generation();
            let style = session.select_style_id(id)?;
            if session.generation() != before {
                self.signal_cancel();
            }
            Ok(style)
        })
    }

    /// Run the selected style on the uploaded image.
    ///
    /// Resolves once the run has ended. [`Delivery::Applied`] means the
    /// outcome, success or failure, was recorded in the session; check
    /// [`progress`](Self::progress) for which. [`Delivery::Discarded`]
    /// means the session moved on while the run was in flight.
    ///
    /// # Errors
    ///
    /// The preconditions of [`Session::begin`]. Failures during the run
    /// are not errors here; they put the session into
    /// [`SessionState::Error`].
    pub async fn generate(&self) -> Result<Delivery, EngineError> {
        let (ticket, cancelled) = self.start(Session::begin)?;
        self.drive(ticket, cancelled).await
    }

    /// Re-run the last input and style after a failure.
    ///
    /// # Errors
    ///
    /// The preconditions of [`Session::retry`].
    pub async fn retry(&self) -> Result<Delivery, EngineError> {
        let (ticket, cancelled) = self.start(Session::retry)?;
        self.drive(ticket, cancelled).await
    }

    /// Abort the model acquisition in flight, if any. The run then ends
    /// in [`SessionState::Error`].
    ///
    /// Returns whether there was an acquisition to abort.
    pub fn cancel(&self) -> bool {
        let session = self.lock();
        let loading = session.state() == SessionState::LoadingModel;
        if loading {
            self.signal_cancel();
        }
        loading
    }

    /// Clear the session entirely.
    pub fn reset(&self) {
        self.update(|session| {
            session.reset();
            self.signal_cancel();
        });
    }

    /// Current state and status line.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.lock().progress()
    }

    /// Receiver that sees every progress change from now on.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    /// Copy of the latest styled output.
    #[must_use]
    pub fn output(&self) -> Option<PixelBuffer> {
        self.lock().output().cloned()
    }

    /// Message of the last failure.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error().map(str::to_string)
    }

    /// Timing of the last run whose output was applied.
    #[must_use]
    pub fn last_run(&self) -> Option<RunDiagnostics> {
        self.last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ─────────────────────────────────────────────── internals

    /// Open a run and subscribe to cancellation under the same lock, so a
    /// cancel that sees the new state is always observed by the run.
    fn start(
        &self,
        open: impl FnOnce(&mut Session) -> Result<RunTicket, EngineError>,
    ) -> Result<(RunTicket, watch::Receiver<u64>), EngineError> {
        self.update(|session| Ok((open(session)?, self.cancel.subscribe())))
    }

    async fn drive(
        &self,
        ticket: RunTicket,
        mut cancelled: watch::Receiver<u64>,
    ) -> Result<Delivery, EngineError> {
        let start = Instant::now();
        let style = ticket.style();
        let cache_hit = self.engine.cache().is_ready(style);

        let prepared = tokio::select! {
            result = self.engine.prepare(style) => result.map(|_handle| ()),
            _ = cancelled.changed() => Err(EngineError::AcquisitionFailure(format!(
                "loading the {style} model was cancelled"
            ))),
        };
        if let Err(err) = prepared {
            return Ok(self.record_failure(&ticket, &err));
        }
        let acquisition = start.elapsed();

        let delivery = self.update(|session| session.model_ready(&ticket))?;
        if delivery == Delivery::Discarded {
            tracing::warn!(%style, "session moved on during model acquisition; run dropped");
            return Ok(delivery);
        }

        let render_start = Instant::now();
        let input = ticket.shared_input();
        let seed = self.engine.config().noise_seed;
        let rendered = tokio::task::spawn_blocking(move || engine::apply(&input, style, seed))
            .await
            .unwrap_or_else(|e| Err(EngineError::PipelineFailure(format!("pipeline task failed: {e}"))));
        let render = render_start.elapsed();

        match rendered {
            Ok(output) => {
                let diagnostics = RunDiagnostics {
                    style,
                    width: output.width(),
                    height: output.height(),
                    cache_hit,
                    acquisition,
                    render,
                    total: start.elapsed(),
                };
                let delivery = self.update(|session| session.complete(&ticket, output))?;
                match delivery {
                    Delivery::Applied => {
                        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(diagnostics);
                    }
                    Delivery::Discarded => tracing::warn!(%style, "stale result discarded"),
                }
                Ok(delivery)
            }
            Err(err) => Ok(self.record_failure(&ticket, &err)),
        }
    }

    fn record_failure(&self, ticket: &RunTicket, err: &EngineError) -> Delivery {
        let delivery = self.update(|session| session.fail(ticket, err));
        match delivery {
            Delivery::Applied => tracing::warn!(style = %ticket.style(), error = %err, "run failed"),
            Delivery::Discarded => {
                tracing::debug!(style = %ticket.style(), error = %err, "stale run failure ignored");
            }
        }
        delivery
    }

    /// Mutate the session, then publish its progress if it changed.
    fn update<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let (out, progress) = {
            let mut session = self.lock();
            let out = f(&mut session);
            (out, session.progress())
        };
        self.progress.send_if_modified(|current| {
            if *current == progress {
                false
            } else {
                *current = progress;
                true
            }
        });
        out
    }

    fn signal_cancel(&self) {
        self.cancel.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // Session methods leave it consistent before any early return.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
