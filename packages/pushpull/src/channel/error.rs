// channel error types.

use std::fmt::{self, Formatter, Display};
use thiserror::Error;


// ==== base error types ====


/// Error for attempting a non-blocking pull on a running channel with nothing buffered
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
#[error("pull would block")]
pub struct WouldBlockError;

/// Which terminal state a channel was in when a push was rejected
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ClosedState {
    /// The channel was completed, by its producer or by a consumer closing it
    Finished,
    /// The channel was failed, by its producer or by a consumer throwing into it
    Failed,
}

impl Display for ClosedState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ClosedState::Finished => f.write_str("finished"),
            ClosedState::Failed => f.write_str("failed"),
        }
    }
}


// ==== compound error types ====


/// Error for trying to push into a channel which has already terminated
///
/// Carries the rejected value back to the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
#[error("push into {state} channel")]
pub struct PushError<T> {
    /// The value that could not be pushed
    pub value: T,
    /// The terminal state the channel was in
    pub state: ClosedState,
}

impl<T> PushError<T> {
    /// Take back the value that could not be pushed
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Error for trying to pull from a channel without waiting
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
pub enum TryPullError<E> {
    /// The channel failed and its buffer is drained
    #[error("channel failed")]
    Failed(E),
    /// Nothing is buffered and the channel is still running
    #[error(transparent)]
    WouldBlock(#[from] WouldBlockError),
}

/// Terminal state of a channel
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TerminalState<E> {
    /// The "finished" state. Pulls yield end-of-sequence once the buffer drains.
    Finished,
    /// The "failed" state. Pulls yield this error, repeatedly, once the buffer drains.
    Failed(E),
}

impl<E> TerminalState<E> {
    /// The state's kind, without the error value
    pub fn kind(&self) -> ClosedState {
        match self {
            TerminalState::Finished => ClosedState::Finished,
            TerminalState::Failed(_) => ClosedState::Failed,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_error_display_names_state() {
        let e = PushError { value: 7, state: ClosedState::Failed };
        assert_eq!(e.to_string(), "push into failed channel");
        assert_eq!(e.into_inner(), 7);
    }

    #[test]
    fn would_block_converts_into_try_pull_error() {
        let e: TryPullError<()> = WouldBlockError.into();
        assert_eq!(e, TryPullError::WouldBlock(WouldBlockError));
        assert_eq!(e.to_string(), "pull would block");
    }
}
