//! The in-flight confirmation handle and the outcomes `write`/`send` can
//! produce. The state machine itself lives in `Radio` (`radio.rs`), since it
//! needs joint access to the serial link and the channel status; this module
//! holds the small pieces that are easiest to reason about in isolation.

/// Resolution of a pending write, delivered by the receiver task on a bare
/// `'0'`/`'1'` confirmation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Failure,
}

/// Outcome of `Radio::write` when `await_response` is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Success,
    Failure,
}

impl From<Resolution> for WriteOutcome {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Success => WriteOutcome::Success,
            Resolution::Failure => WriteOutcome::Failure,
        }
    }
}
