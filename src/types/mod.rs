//! Shared type definitions used across the actor execution core.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Unique identifier assigned to each actor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActorId(Arc<str>);

impl ActorId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for ActorId
where
    T: Into<String>,
{
    fn from(value: T) -> Self {
        let owned: String = value.into();
        Self(Arc::from(owned.into_boxed_str()))
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reason describing why an actor stopped processing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The behavior stack ran empty.
    Normal,
    /// A handler failed or panicked.
    UnhandledFault,
    /// A handler called an operation that is not allowed in the
    /// cooperative execution style (synchronous receive).
    UnallowedFunctionCall,
    /// A caller-chosen reason passed to `quit`.
    User(u32),
}

impl ExitReason {
    /// First code available to user-defined reasons.
    pub const USER_DEFINED_BASE: u32 = 0x10000;

    /// Numeric exit code.
    pub fn code(&self) -> u32 {
        match self {
            ExitReason::Normal => 0x00001,
            ExitReason::UnhandledFault => 0x00002,
            ExitReason::UnallowedFunctionCall => 0x00003,
            ExitReason::User(code) => Self::USER_DEFINED_BASE.saturating_add(*code),
        }
    }

    /// Returns true for [`ExitReason::Normal`].
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::UnhandledFault => write!(f, "unhandled fault"),
            ExitReason::UnallowedFunctionCall => write!(f, "unallowed function call"),
            ExitReason::User(code) => write!(f, "user defined ({code})"),
        }
    }
}

/// Scheduling state of an actor, shared between the actor and its producers.
///
/// ```text
/// Running ──(mailbox exhausted)──> AboutToBlock ──(CAS)──> Blocked
///    ^                                  │                     │
///    └────────(producer enqueue)────────┴─────────────────────┘
/// any ──(finalize)──> Done
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
    /// Runnable or currently inside `resume`.
    Running = 0,
    /// The resume loop found no work and is about to park.
    AboutToBlock = 1,
    /// Parked; the next enqueue reschedules the actor.
    Blocked = 2,
    /// Terminated. Terminal.
    Done = 3,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::Running,
            1 => ActorState::AboutToBlock,
            2 => ActorState::Blocked,
            _ => ActorState::Done,
        }
    }
}

/// Atomic cell holding an [`ActorState`].
///
/// All accesses are `SeqCst`: the park transition relies on a total order
/// between the consumer's store and the producers' loads.
#[derive(Debug)]
pub struct AtomicActorState(AtomicU8);

impl AtomicActorState {
    /// Creates a cell in the given state.
    pub fn new(state: ActorState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Reads the current state.
    pub fn load(&self) -> ActorState {
        ActorState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Overwrites the current state.
    pub fn store(&self, state: ActorState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Atomically replaces `current` with `new`.
    ///
    /// Returns the state that was observed on failure.
    pub fn compare_exchange(
        &self,
        current: ActorState,
        new: ActorState,
    ) -> Result<ActorState, ActorState> {
        self.0
            .compare_exchange(current as u8, new as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(ActorState::from_u8)
            .map_err(ActorState::from_u8)
    }
}

impl Default for AtomicActorState {
    fn default() -> Self {
        Self::new(ActorState::Running)
    }
}

/// Outcome of a single `resume` call, reported back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    /// The actor parked; it is rescheduled by the next enqueue.
    Parked,
    /// The actor finished with the given reason.
    Done(ExitReason),
}
