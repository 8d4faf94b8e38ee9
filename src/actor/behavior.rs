//! Installed message handlers and the stack that orders them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::actor::{context::ActorContext, Actor};
use crate::error::ActorResult;
use crate::tuple::Message;

/// How long a behavior waits for a message before its timeout handler runs.
///
/// `After(Duration::ZERO)` is a valid timeout that fires on the next scan;
/// it is distinct from `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// No timeout.
    #[default]
    Infinite,
    /// Fire after the given duration without a matching message.
    After(Duration),
}

impl Timeout {
    /// Returns true if a timeout is set.
    pub fn is_valid(&self) -> bool {
        matches!(self, Timeout::After(_))
    }

    /// The configured duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::After(duration) => Some(*duration),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Self {
        Timeout::After(value)
    }
}

/// Verdict a handler returns for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The message matched and was consumed.
    Consumed,
    /// The message did not match; it stays in the mailbox for later behaviors.
    Skipped,
}

type HandlerFn<A> =
    dyn Fn(&mut A, &Message, &mut ActorContext<A>) -> ActorResult<Handled> + Send + Sync;
type TimeoutFn<A> = dyn Fn(&mut A, &mut ActorContext<A>) -> ActorResult<()> + Send + Sync;

/// A message handler plus an optional timeout.
///
/// Handlers are shared (`Arc`), so cloning a behavior is cheap and the
/// resume loop can invoke the active one while the handler itself pushes or
/// pops behaviors on the context.
pub struct Behavior<A: Actor> {
    handler: Arc<HandlerFn<A>>,
    timeout: Timeout,
    on_timeout: Option<Arc<TimeoutFn<A>>>,
}

impl<A: Actor> Behavior<A> {
    /// Creates a behavior without a timeout.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut A, &Message, &mut ActorContext<A>) -> ActorResult<Handled>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Arc::new(handler),
            timeout: Timeout::Infinite,
            on_timeout: None,
        }
    }

    /// Adds a timeout: `on_timeout` runs if no message matches within `after`.
    pub fn with_timeout<F>(mut self, after: Duration, on_timeout: F) -> Self
    where
        F: Fn(&mut A, &mut ActorContext<A>) -> ActorResult<()> + Send + Sync + 'static,
    {
        self.timeout = Timeout::After(after);
        self.on_timeout = Some(Arc::new(on_timeout));
        self
    }

    /// The behavior's timeout.
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub(crate) fn invoke(
        &self,
        actor: &mut A,
        message: &Message,
        ctx: &mut ActorContext<A>,
    ) -> ActorResult<Handled> {
        (self.handler)(actor, message, ctx)
    }

    pub(crate) fn handle_timeout(&self, actor: &mut A, ctx: &mut ActorContext<A>) -> ActorResult<()> {
        match &self.on_timeout {
            Some(on_timeout) => on_timeout(actor, ctx),
            None => Ok(()),
        }
    }
}

impl<A: Actor> Clone for Behavior<A> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            timeout: self.timeout,
            on_timeout: self.on_timeout.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for Behavior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Ordered behaviors; the top one is active.
pub struct BehaviorStack<A: Actor> {
    entries: Vec<Behavior<A>>,
}

impl<A: Actor> BehaviorStack<A> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Installs `behavior` on top.
    pub fn push(&mut self, behavior: Behavior<A>) {
        self.entries.push(behavior);
    }

    /// Removes the active behavior, restoring the previous one.
    pub fn pop(&mut self) -> Option<Behavior<A>> {
        self.entries.pop()
    }

    /// The active behavior.
    pub fn top(&self) -> Option<&Behavior<A>> {
        self.entries.last()
    }

    /// Pops every behavior.
    pub fn clear(&mut self) {
        while self.entries.pop().is_some() {}
    }

    /// Number of installed behaviors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no behavior is installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: Actor> Default for BehaviorStack<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Actor> fmt::Debug for BehaviorStack<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
