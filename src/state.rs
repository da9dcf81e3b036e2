//! The ordered set of lifecycle states every managed component passes through.
//! Components start in [State::Created] and are advanced one state at a time by
//! the lifecycle engine, up to [State::Started] during build and to
//! [State::Stopped] during shutdown.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a managed component. States are totally ordered and a
/// component's state never decreases.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum State {
    Created,
    Initialized,
    Resolved,
    Started,
    Stopped,
}

/// All states in ascending order.
pub const STATES: [State; 5] = [
    State::Created,
    State::Initialized,
    State::Resolved,
    State::Started,
    State::Stopped,
];

impl State {
    /// The state directly following this one, or `None` for the final state.
    pub fn next(self) -> Option<State> {
        STATES.get(self as usize + 1).copied()
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            State::Created => "created",
            State::Initialized => "initialized",
            State::Resolved => "resolved",
            State::Started => "started",
            State::Stopped => "stopped",
        })
    }
}

/// A [State] cell which can be read and advanced through a shared reference,
/// which allows `stop()` and lookups to coexist on an otherwise immutable
/// container.
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: State) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> State {
        STATES[self.0.load(Ordering::Acquire) as usize]
    }

    #[inline]
    pub fn store(&self, state: State) {
        self.0.store(state as u8, Ordering::Release);
    }
}
