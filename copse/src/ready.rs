//! Document readiness: a fired/pending queue with two one-shot triggers.
//!
//! Callbacks registered while the document is loading are queued; the first
//! readiness signal (content-loaded or load, whichever the embedder delivers
//! first) drains the queue in registration order and retires both triggers.
//! Callbacks registered after that point run immediately.

use crate::Document;

/// Load progress of a [`Document`], mirroring the classic three-stage
/// document lifecycle. The state only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Still being assembled; ready callbacks queue up.
    Loading,
    /// Content is loaded; ready callbacks have fired.
    Interactive,
    /// Fully loaded, subresources included.
    Complete,
}

type Callback = Box<dyn FnOnce(&mut Document)>;

/// Queue half of the ready machine. [`Document`] owns one and runs the
/// drained callbacks itself, since they need `&mut Document`.
pub(crate) struct ReadyHandlers {
    state: ReadyState,
    fired: bool,
    pending: Vec<Callback>,
}

impl ReadyHandlers {
    pub(crate) fn new() -> Self {
        ReadyHandlers {
            state: ReadyState::Loading,
            fired: false,
            pending: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> ReadyState {
        self.state
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired
    }

    pub(crate) fn push(&mut self, callback: Callback) {
        self.pending.push(callback);
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Content-loaded trigger. Returns the callbacks to run (empty if the
    /// machine already fired). `fired` is set before the caller runs them,
    /// so re-registration from inside a callback runs immediately.
    pub(crate) fn content_loaded(&mut self) -> Vec<Callback> {
        if self.state == ReadyState::Loading {
            self.state = ReadyState::Interactive;
        }
        self.fire()
    }

    /// Load trigger. Also advances the state to `Complete`.
    pub(crate) fn loaded(&mut self) -> Vec<Callback> {
        self.state = ReadyState::Complete;
        self.fire()
    }

    fn fire(&mut self) -> Vec<Callback> {
        if self.fired {
            return Vec::new();
        }
        self.fired = true;
        std::mem::take(&mut self.pending)
    }
}
