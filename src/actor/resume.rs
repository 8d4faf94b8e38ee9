//! The cooperative resume loop.
//!
//! A [`ScheduledActor`] owns everything the consumer side of an actor
//! needs: the actor value, its context (and with it the behavior stack),
//! the mailbox cache and the cursor into it. The scheduler calls
//! [`ScheduledActor::resume`] whenever the actor is runnable; each call
//! drains as much of the mailbox as the installed behaviors accept and then
//! either parks the actor or finalizes it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::actor::behavior::Handled;
use crate::actor::context::ActorContext;
use crate::actor::handle::ActorHandle;
use crate::actor::mailbox::{self, Cursor, Mailbox, MailboxNode, NodeKind};
use crate::actor::runtime::Reschedule;
use crate::actor::{Actor, IntoActorConfig};
use crate::error::{ActorError, ActorResult};
use crate::types::{ActorId, ActorState, AtomicActorState, ExitReason, Resumed};

/// Verdict of testing one mailbox node against the active behavior.
#[derive(Debug)]
enum Dispatch {
    Matched,
    NotMatched,
    TimeoutOccurred,
    /// A timeout node that is no longer armed; removed without side effects.
    Discarded,
    Exit(ExitReason),
    Fault(ActorError),
}

/// Why a mailbox scan stopped early.
enum Interrupt {
    Exit(ExitReason),
    Fault(ActorError),
}

/// An actor together with its mailbox, ready to be resumed by a scheduler.
pub struct ScheduledActor<A: Actor> {
    actor: A,
    ctx: ActorContext<A>,
    mailbox: Mailbox,
    cursor: Cursor,
    state: Arc<AtomicActorState>,
    exit_tx: watch::Sender<Option<ExitReason>>,
    exit_reason: Option<ExitReason>,
    initialized: bool,
    /// Runs between the `AboutToBlock` store and the final emptiness check.
    #[cfg(test)]
    park_hook: Option<Box<dyn FnMut() + Send>>,
}

impl<A: Actor> ScheduledActor<A> {
    /// Creates the actor in the `Running` state.
    ///
    /// `reschedule` is invoked by producers whenever the parked actor
    /// becomes runnable again. The first [`resume`](Self::resume) runs
    /// [`Actor::init`]. If called inside a Tokio runtime, non-zero behavior
    /// timeouts are timed on that runtime.
    pub fn new(
        id: impl Into<ActorId>,
        actor: A,
        config: impl IntoActorConfig,
        reschedule: Arc<dyn Reschedule>,
    ) -> Self {
        let config = config.into_config();
        let id = id.into();
        let (producers, mailbox) = mailbox::channel(config.mailbox.capacity, config.mailbox.fetch_batch);
        let state = Arc::new(AtomicActorState::new(ActorState::Running));
        let (exit_tx, exit_rx) = watch::channel(None);
        let handle = ActorHandle::new(
            id.clone(),
            producers,
            Arc::clone(&state),
            reschedule,
            Arc::clone(&config.registry),
            exit_rx,
            config.mailbox.capacity,
        );
        let ctx = ActorContext::new(id, handle, config.registry, Handle::try_current().ok());
        Self {
            actor,
            ctx,
            mailbox,
            cursor: Cursor::START,
            state,
            exit_tx,
            exit_reason: None,
            initialized: false,
            #[cfg(test)]
            park_hook: None,
        }
    }

    /// Returns a producer handle for this actor.
    pub fn handle(&self) -> ActorHandle {
        self.ctx.self_handle()
    }

    /// The actor value.
    pub fn actor(&self) -> &A {
        &self.actor
    }

    /// The actor's execution context.
    pub fn context(&self) -> &ActorContext<A> {
        &self.ctx
    }

    /// Current scheduling state.
    pub fn state(&self) -> ActorState {
        self.state.load()
    }

    /// The exit reason, once finalized.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Nodes fetched from producers but not accepted by any behavior yet.
    pub fn cached_messages(&self) -> usize {
        self.mailbox.cached()
    }

    /// Runs the actor until it parks or finishes.
    ///
    /// Must not be called concurrently for the same actor. Never panics on
    /// behalf of a handler: faults finalize the actor instead. Calling it
    /// again after the actor finished returns the stored exit reason without
    /// doing any work.
    pub fn resume(&mut self) -> Resumed {
        if let Some(reason) = self.exit_reason {
            return Resumed::Done(reason);
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("resume", actor_id = %self.ctx.actor_id()).entered();

        if !self.initialized {
            self.initialized = true;
            let Self { actor, ctx, .. } = &mut *self;
            let outcome = guarded(|| actor.init(ctx));
            if let Some(reason) = ctx.take_pending_exit() {
                return self.finalize(reason);
            }
            if let Err(error) = outcome {
                return self.fail(error);
            }
        }
        if self.ctx.stack.is_empty() {
            return self.finalize(ExitReason::Normal);
        }
        if let Err(error) = self.ctx.rearm_if_needed() {
            return self.fail(error.into());
        }

        loop {
            let Self {
                actor,
                ctx,
                mailbox,
                cursor,
                state,
                #[cfg(test)]
                park_hook,
                ..
            } = &mut *self;
            let scanned = mailbox.remove_first(*cursor, |node| {
                match handle_message(actor, ctx, node) {
                    Dispatch::Matched | Dispatch::TimeoutOccurred | Dispatch::Discarded => Ok(true),
                    Dispatch::NotMatched => Ok(false),
                    Dispatch::Exit(reason) => Err(Interrupt::Exit(reason)),
                    Dispatch::Fault(error) => Err(Interrupt::Fault(error)),
                }
            });
            match scanned {
                // The new behavior may accept nodes skipped earlier.
                Ok(Some(_)) => *cursor = Cursor::START,
                Ok(None) => {
                    *cursor = mailbox.end();
                    if mailbox.can_fetch_more() {
                        mailbox.try_fetch_more();
                    } else {
                        state.store(ActorState::AboutToBlock);
                        // Pairs with the fence in `ActorHandle::enqueue`: a
                        // producer either sees `AboutToBlock` or we see its node.
                        fence(Ordering::SeqCst);
                        #[cfg(test)]
                        if let Some(hook) = park_hook.as_mut() {
                            hook();
                        }
                        if mailbox.can_fetch_more()
                            || state
                                .compare_exchange(ActorState::AboutToBlock, ActorState::Blocked)
                                .is_err()
                        {
                            // Lost the race against a producer.
                            state.store(ActorState::Running);
                            mailbox.try_fetch_more();
                        } else {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(
                                actor_id = %ctx.actor_id(),
                                pending = mailbox.cached(),
                                "actor parked"
                            );
                            return Resumed::Parked;
                        }
                    }
                }
                Err(Interrupt::Exit(reason)) => return self.finalize(reason),
                Err(Interrupt::Fault(error)) => return self.fail(error),
            }
            if let Err(error) = self.ctx.rearm_if_needed() {
                return self.fail(error.into());
            }
            if self.ctx.stack.is_empty() {
                return self.finalize(ExitReason::Normal);
            }
        }
    }

    fn fail(&mut self, error: ActorError) -> Resumed {
        let reason = error.exit_reason();
        if !matches!(error, ActorError::Exit(_)) {
            #[cfg(feature = "tracing")]
            tracing::warn!(actor_id = %self.ctx.actor_id(), %error, "actor fault");
            self.ctx.record_failure(error);
        }
        self.finalize(reason)
    }

    /// Terminates the actor. Runs at most once.
    fn finalize(&mut self, reason: ExitReason) -> Resumed {
        debug_assert!(self.exit_reason.is_none(), "actor finalized twice");
        self.ctx.stack.clear();
        self.ctx.disarm();

        let Self { actor, ctx, .. } = &mut *self;
        let on_exit = guarded(|| {
            actor.on_exit(ctx);
            Ok(())
        });
        if let Err(_error) = on_exit {
            #[cfg(feature = "tracing")]
            tracing::warn!(actor_id = %self.ctx.actor_id(), error = %_error, "on_exit panicked");
        }
        // on_exit may have touched the stack or asked to quit again.
        self.ctx.stack.clear();
        self.ctx.disarm();
        self.ctx.take_pending_exit();

        self.state.store(ActorState::Done);
        self.mailbox.clear();
        self.exit_reason = Some(reason);
        self.exit_tx.send_replace(Some(reason));

        #[cfg(feature = "tracing")]
        tracing::info!(
            actor_id = %self.ctx.actor_id(),
            reason = %reason,
            code = reason.code(),
            "Actor stopped"
        );

        Resumed::Done(reason)
    }
}

impl<A: Actor> std::fmt::Debug for ScheduledActor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledActor")
            .field("actor_id", self.ctx.actor_id())
            .field("state", &self.state.load())
            .field("behaviors", &self.ctx.stack.len())
            .field("cached", &self.mailbox.cached())
            .field("exit_reason", &self.exit_reason)
            .finish()
    }
}

/// Tests `node` against the active behavior, running its handler.
///
/// The active behavior is looked up afresh on every call: the previous
/// handler may have replaced it.
fn handle_message<A: Actor>(
    actor: &mut A,
    ctx: &mut ActorContext<A>,
    node: &MailboxNode,
) -> Dispatch {
    let Some(behavior) = ctx.stack.top().cloned() else {
        return Dispatch::NotMatched;
    };
    let dispatch = match node.kind() {
        NodeKind::Timeout(id) => {
            if !(behavior.timeout().is_valid() && ctx.is_armed(*id)) {
                return Dispatch::Discarded;
            }
            ctx.disarm();
            match guarded(|| behavior.handle_timeout(actor, ctx)) {
                Ok(()) => {
                    ctx.mark_rearm();
                    Dispatch::TimeoutOccurred
                }
                Err(error) => interrupted(error),
            }
        }
        NodeKind::Message(message) => {
            ctx.set_last_sender(node.sender().cloned());
            match guarded(|| behavior.invoke(actor, message, ctx)) {
                Ok(Handled::Consumed) => {
                    if behavior.timeout().is_valid() {
                        ctx.mark_rearm();
                    }
                    Dispatch::Matched
                }
                Ok(Handled::Skipped) => Dispatch::NotMatched,
                Err(error) => interrupted(error),
            }
        }
    };
    match ctx.take_pending_exit() {
        Some(reason) => Dispatch::Exit(reason),
        None => dispatch,
    }
}

fn interrupted(error: ActorError) -> Dispatch {
    match error {
        ActorError::Exit(reason) => Dispatch::Exit(reason),
        other => Dispatch::Fault(other),
    }
}

/// Runs `f`, turning a panic into [`ActorError::Panic`].
fn guarded<T>(f: impl FnOnce() -> ActorResult<T>) -> ActorResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ActorError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
