//! The five-state process around one engine invocation.
//!
//! [`Session`] is a plain synchronous state machine. It never runs the
//! engine itself; a driver (see [`Studio`](crate::Studio)) asks it for a
//! [`RunTicket`], does the async work, and reports back with the ticket.
//!
//! Every ticket carries the session's generation counter at the moment
//! the run began. Uploading a new image, picking a different style, or
//! resetting bumps the generation, so results reported with an older
//! ticket are recognised as stale and dropped ([`Delivery::Discarded`]).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::catalog::{StyleCatalog, StyleId};
use crate::types::EngineError;

/// Where a session is in its run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the user to start a run.
    #[default]
    Idle,
    /// Acquiring the selected style's model.
    LoadingModel,
    /// Running the pixel pipeline.
    Processing,
    /// A styled output is available.
    Complete,
    /// The last run failed; `last_error` says why.
    Error,
}

impl SessionState {
    /// Whether a run is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::LoadingModel | Self::Processing)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingModel => "loading model",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reporting a result back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[must_use = "a discarded delivery means the result was stale"]
pub enum Delivery {
    /// The result belonged to the current run and was recorded.
    Applied,
    /// The session moved on since the run began; the result was dropped.
    Discarded,
}

impl Delivery {
    /// Whether the result was recorded.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Everything a driver needs to perform one run.
///
/// The input is shared with the session, not copied; the pipeline only
/// reads it.
#[derive(Debug, Clone)]
pub struct RunTicket {
    generation: u64,
    style: StyleId,
    input: Arc<PixelBuffer>,
}

impl RunTicket {
    /// Session generation at the time the run began.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Style requested for this run.
    #[must_use]
    pub const fn style(&self) -> StyleId {
        self.style
    }

    /// Input image for this run.
    #[must_use]
    pub fn input(&self) -> &PixelBuffer {
        &self.input
    }

    /// Shared handle to the input, for moving onto another thread.
    #[must_use]
    pub fn shared_input(&self) -> Arc<PixelBuffer> {
        Arc::clone(&self.input)
    }
}

/// Snapshot for a progress indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current state.
    pub state: SessionState,
    /// Human-readable status line. For [`SessionState::Error`] this is
    /// the error message.
    pub message: String,
}

/// One user interaction cycle: an uploaded image, a chosen style, and
/// the result of the latest run.
///
/// Invariants held after every method:
/// - `Processing` implies an input and a selected style.
/// - `Complete` implies an output.
/// - `Error` implies a `last_error` and no output.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    input: Option<Arc<PixelBuffer>>,
    output: Option<PixelBuffer>,
    selected_style: Option<StyleId>,
    last_error: Option<String>,
    generation: u64,
}

impl Session {
    /// A fresh idle session with nothing uploaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────────────────────── user actions

    /// Replace the input image.
    ///
    /// Allowed from every state. Clears any output or error, returns to
    /// [`SessionState::Idle`], and invalidates any run in flight. The
    /// selected style is kept.
    pub fn upload(&mut self, input: PixelBuffer) {
        self.invalidate();
        self.input = Some(Arc::new(input));
    }

    /// Choose the style for the next run.
    ///
    /// Choosing a different style while a run is in flight invalidates
    /// it. Choosing any style from [`SessionState::Complete`] or
    /// [`SessionState::Error`] returns to [`SessionState::Idle`].
    /// Re-selecting the style already being run changes nothing.
    pub fn select_style(&mut self, style: StyleId) {
        let unchanged = self.selected_style == Some(style);
        match self.state {
            SessionState::Idle => {}
            SessionState::LoadingModel | SessionState::Processing if unchanged => return,
            SessionState::LoadingModel
            | SessionState::Processing
            | SessionState::Complete
            | SessionState::Error => self.invalidate(),
        }
        self.selected_style = Some(style);
    }

    /// [`select_style`](Self::select_style) from a wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedStyle`] for an unknown id; the
    /// session is unchanged.
    pub fn select_style_id(&mut self, id: &str) -> Result<StyleId, EngineError> {
        let style = StyleCatalog::resolve(id)?.id;
        self.select_style(style);
        Ok(style)
    }

    /// Start a run: `Idle | Complete | Error → LoadingModel`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidTransition`] if a run is already in flight.
    /// - [`EngineError::InvalidInput`] if no image was uploaded or no
    ///   style selected.
    ///
    /// The session is unchanged on error.
    pub fn begin(&mut self) -> Result<RunTicket, EngineError> {
        if self.state.is_busy() {
            return Err(self.rejected("generate"));
        }
        self.start_run()
    }

    /// Re-run the last input and style after a failure:
    /// `Error → LoadingModel`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] unless the session is in
    /// [`SessionState::Error`]. The session is unchanged on error.
    pub fn retry(&mut self) -> Result<RunTicket, EngineError> {
        if self.state != SessionState::Error {
            return Err(self.rejected("retry"));
        }
        self.start_run()
    }

    /// Drop the input, style, and any result, returning to a fresh idle
    /// session. Runs in flight become stale.
    pub fn reset(&mut self) {
        self.invalidate();
        self.input = None;
        self.selected_style = None;
    }

    // ───────────────────────────────────────── run reports

    /// The run's model is ready: `LoadingModel → Processing`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] if the ticket is current but
    /// the session is not loading.
    pub fn model_ready(&mut self, ticket: &RunTicket) -> Result<Delivery, EngineError> {
        if !self.is_current(ticket) {
            return Ok(Delivery::Discarded);
        }
        if self.state != SessionState::LoadingModel {
            return Err(self.rejected("start processing"));
        }
        self.state = SessionState::Processing;
        Ok(Delivery::Applied)
    }

    /// The run produced `output`: `Processing → Complete`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] if the ticket is current but
    /// the session is not processing.
    pub fn complete(
        &mut self,
        ticket: &RunTicket,
        output: PixelBuffer,
    ) -> Result<Delivery, EngineError> {
        if !self.is_current(ticket) {
            return Ok(Delivery::Discarded);
        }
        if self.state != SessionState::Processing {
            return Err(self.rejected("complete"));
        }
        self.output = Some(output);
        self.state = SessionState::Complete;
        Ok(Delivery::Applied)
    }

    /// The run failed: `LoadingModel | Processing → Error`.
    ///
    /// A stale ticket leaves the session untouched.
    pub fn fail(&mut self, ticket: &RunTicket, error: &EngineError) -> Delivery {
        if !self.is_current(ticket) {
            return Delivery::Discarded;
        }
        self.output = None;
        self.last_error = Some(error.to_string());
        self.state = SessionState::Error;
        Delivery::Applied
    }

    /// Whether `ticket` belongs to the run currently in flight.
    #[must_use]
    pub fn is_current(&self, ticket: &RunTicket) -> bool {
        ticket.generation == self.generation && self.state.is_busy()
    }

    // ───────────────────────────────────────── accessors

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Uploaded image, if any.
    #[must_use]
    pub fn input(&self) -> Option<&PixelBuffer> {
        self.input.as_deref()
    }

    /// Styled output of the last completed run.
    #[must_use]
    pub const fn output(&self) -> Option<&PixelBuffer> {
        self.output.as_ref()
    }

    /// Style chosen for the next run.
    #[must_use]
    pub const fn selected_style(&self) -> Option<StyleId> {
        self.selected_style
    }

    /// Message of the last failure, while in [`SessionState::Error`].
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current generation; bumps on every run start and invalidation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Status for a progress indicator.
    #[must_use]
    pub fn progress(&self) -> Progress {
        let style = self
            .selected_style
            .map_or("style", |s| StyleCatalog::describe(s).name);
        let message = match self.state {
            SessionState::Idle => "Ready".to_string(),
            SessionState::LoadingModel => format!("Loading {style} model"),
            SessionState::Processing => format!("Applying {style}"),
            SessionState::Complete => "Style applied".to_string(),
            SessionState::Error => self
                .last_error
                .clone()
                .unwrap_or_else(|| "Run failed".to_string()),
        };
        Progress {
            state: self.state,
            message,
        }
    }

    // ─────────────────────────────────────────────── internals

    fn start_run(&mut self) -> Result<RunTicket, EngineError> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| EngineError::InvalidInput("no image uploaded".to_string()))?;
        let style = self
            .selected_style
            .ok_or_else(|| EngineError::InvalidInput("no style selected".to_string()))?;
        self.generation += 1;
        self.output = None;
        self.last_error = None;
        self.state = SessionState::LoadingModel;
        Ok(RunTicket {
            generation: self.generation,
            style,
            input,
        })
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.output = None;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    fn rejected(&self, action: &str) -> EngineError {
        EngineError::InvalidTransition {
            state: self.state,
            action: action.to_string(),
        }
    }
}
