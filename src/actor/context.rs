//! Actor execution context handed to every behavior and hook.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::actor::behavior::{Behavior, BehaviorStack, Handled, Timeout};
use crate::actor::mailbox::TimeoutId;
use crate::actor::{handle::ActorHandle, Actor};
use crate::error::{ActorError, ActorResult, TimerError};
use crate::tuple::{Message, TupleValues, TypeRegistry};
use crate::types::{ActorId, ExitReason};

/// Actor execution context.
///
/// The context is passed explicitly to every behavior, timeout handler and
/// lifecycle hook of the actor it belongs to. It provides:
/// - The actor's identity and a handle to its own mailbox
/// - The behavior stack (`become_behavior`, `replace_behavior`, `unbecome`)
/// - Explicit termination through [`quit`](Self::quit)
/// - The type registry for building messages
pub struct ActorContext<A: Actor> {
    actor_id: ActorId,
    self_handle: ActorHandle,
    registry: Arc<TypeRegistry>,
    runtime: Option<Handle>,
    pub(crate) stack: BehaviorStack<A>,
    timeout: TimeoutState,
    pending_exit: Option<ExitReason>,
    last_sender: Option<ActorId>,
    last_error: Option<ActorError>,
}

#[derive(Default)]
struct TimeoutState {
    next_id: TimeoutId,
    armed: Option<TimeoutId>,
    token: Option<CancellationToken>,
    needs_rearm: bool,
}

impl<A: Actor> ActorContext<A> {
    pub(crate) fn new(
        actor_id: ActorId,
        self_handle: ActorHandle,
        registry: Arc<TypeRegistry>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            actor_id,
            self_handle,
            registry,
            runtime,
            stack: BehaviorStack::new(),
            timeout: TimeoutState::default(),
            pending_exit: None,
            last_sender: None,
            last_error: None,
        }
    }

    /// Returns the unique identifier of this actor.
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Returns a handle to this actor's own mailbox.
    pub fn self_handle(&self) -> ActorHandle {
        self.self_handle.clone()
    }

    /// Returns the registry used for building messages.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Builds a message from native values using this actor's registry.
    pub fn message<V: TupleValues>(&self, values: V) -> Message {
        Message::of(&self.registry, values)
    }

    /// Sender of the message currently being handled, if it carried one.
    pub fn last_sender(&self) -> Option<&ActorId> {
        self.last_sender.as_ref()
    }

    /// Returns the last fault recorded by this actor, if any.
    pub fn last_error(&self) -> Option<&ActorError> {
        self.last_error.as_ref()
    }

    /// Installs `behavior` on top of the stack, keeping the current one
    /// underneath.
    pub fn become_behavior(&mut self, behavior: Behavior<A>) {
        self.stack.push(behavior);
        self.timeout.needs_rearm = true;
    }

    /// Replaces the active behavior with `behavior`.
    pub fn replace_behavior(&mut self, behavior: Behavior<A>) {
        self.stack.pop();
        self.stack.push(behavior);
        self.timeout.needs_rearm = true;
    }

    /// Removes the active behavior and restores the previous one.
    ///
    /// Popping the last behavior terminates the actor with
    /// [`ExitReason::Normal`] once the current handler returns.
    pub fn unbecome(&mut self) -> Option<Behavior<A>> {
        let popped = self.stack.pop();
        self.timeout.needs_rearm = true;
        popped
    }

    /// Number of installed behaviors.
    pub fn behavior_depth(&self) -> usize {
        self.stack.len()
    }

    /// Requests termination with `reason`.
    ///
    /// The actor is finalized as soon as the running handler returns, even
    /// if the returned error is dropped.
    ///
    /// ```ignore
    /// return Err(ctx.quit(ExitReason::User(7)));
    /// ```
    pub fn quit(&mut self, reason: ExitReason) -> ActorError {
        if self.pending_exit.is_none() {
            self.pending_exit = Some(reason);
        }
        ActorError::Exit(reason)
    }

    /// Synchronous receive is not available to event-based actors.
    ///
    /// Calling it terminates the actor with
    /// [`ExitReason::UnallowedFunctionCall`]; the behavior is never run.
    pub fn receive(&mut self, _behavior: Behavior<A>) -> ActorResult<Handled> {
        Err(self.quit(ExitReason::UnallowedFunctionCall))
    }

    pub(crate) fn take_pending_exit(&mut self) -> Option<ExitReason> {
        self.pending_exit.take()
    }

    pub(crate) fn set_last_sender(&mut self, sender: Option<ActorId>) {
        self.last_sender = sender;
    }

    pub(crate) fn record_failure(&mut self, error: ActorError) {
        self.last_error = Some(error);
    }

    pub(crate) fn is_armed(&self, id: TimeoutId) -> bool {
        self.timeout.armed == Some(id)
    }

    pub(crate) fn disarm(&mut self) {
        self.timeout.armed = None;
        if let Some(token) = self.timeout.token.take() {
            token.cancel();
        }
    }

    pub(crate) fn mark_rearm(&mut self) {
        self.timeout.needs_rearm = true;
    }

    /// Arms the timeout of the active behavior if the stack changed since
    /// the last arming.
    pub(crate) fn rearm_if_needed(&mut self) -> Result<(), TimerError> {
        if !std::mem::take(&mut self.timeout.needs_rearm) {
            return Ok(());
        }
        let timeout = self
            .stack
            .top()
            .map(Behavior::timeout)
            .unwrap_or(Timeout::Infinite);
        self.request_timeout(timeout)
    }

    /// Replaces any pending timeout with `timeout`.
    ///
    /// The timeout is delivered as a mailbox node so it is ordered with the
    /// messages that arrive in the meantime.
    fn request_timeout(&mut self, timeout: Timeout) -> Result<(), TimerError> {
        self.disarm();
        let Some(delay) = timeout.duration() else {
            return Ok(());
        };
        let id = self.timeout.next_id;
        self.timeout.next_id = self.timeout.next_id.wrapping_add(1);

        if delay.is_zero() {
            self.timeout.armed = Some(id);
            if let Err(_error) = self.self_handle.deliver_timeout(id) {
                #[cfg(feature = "tracing")]
                tracing::debug!(actor_id = %self.actor_id, timeout_id = id, error = %_error, "timeout not delivered");
            }
            return Ok(());
        }

        let runtime = self
            .runtime
            .as_ref()
            .ok_or(TimerError::MissingRuntime(delay))?;
        let token = CancellationToken::new();
        let cancel_clone = token.clone();
        let handle = self.self_handle.clone();
        let fut = async move {
            tokio::select! {
                _ = cancel_clone.cancelled() => {}
                _ = time::sleep(delay) => {
                    // Only fails once the actor has finished.
                    if let Err(_error) = handle.deliver_timeout(id) {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(actor_id = %handle.id(), timeout_id = id, error = %_error, "timeout not delivered");
                    }
                }
            }
        };
        runtime.spawn(fut);
        self.timeout.armed = Some(id);
        self.timeout.token = Some(token);
        Ok(())
    }
}

impl<A: Actor> Drop for ActorContext<A> {
    fn drop(&mut self) {
        // Stop a pending timer task from holding the actor's handle.
        self.disarm();
    }
}
