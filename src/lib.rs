#![warn(missing_docs)]
//! Event Actors is a cooperative, event-based actor core: actors are plain
//! values driven by a stack of behaviors and resumed by a scheduler only when
//! their mailbox has work.
//!
//! # Overview
//! - Messages are type-erased, copy-on-write tuples ([`Message`]) built from
//!   native Rust tuples through a shared [`TypeRegistry`].
//! - Behaviors ([`Behavior`]) may skip messages; skipped messages stay cached
//!   and are retried after the next behavior change.
//! - Behaviors may carry a [`Timeout`]; timeouts are delivered through the
//!   mailbox so they are ordered with regular messages.
//! - Parked actors cost no thread: producers wake them through the
//!   [`Reschedule`] hook. [`ActorExt::spawn_actor`] uses Tokio for that.
//! - See `demos/simple_counter.rs` for a runnable end-to-end example.
//!
//! ```rust,no_run
//! use event_actors::{
//!     Actor, ActorConfig, ActorContext, ActorExt, ActorResult, Behavior, ExitReason, Handled,
//! };
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! impl Actor for Counter {
//!     fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
//!         ctx.become_behavior(Behavior::new(|counter: &mut Counter, msg, ctx| {
//!             if let Some((delta,)) = msg.values::<(i64,)>() {
//!                 counter.value += delta;
//!                 return Ok(Handled::Consumed);
//!             }
//!             if let Some((cmd,)) = msg.values::<(&'static str,)>() {
//!                 if *cmd == "stop" {
//!                     return Err(ctx.quit(ExitReason::User(counter.value as u32)));
//!                 }
//!             }
//!             Ok(Handled::Skipped)
//!         }));
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = Counter::default().spawn_actor("counter", ActorConfig::default())?;
//!     handle.notify((1i64,))?;
//!     handle.notify(("stop",))?;
//!     let reason = handle.wait_for_exit().await;
//!     assert_eq!(reason, ExitReason::User(1));
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod error;
pub mod tuple;
pub mod types;

pub use actor::{
    behavior::{Behavior, BehaviorStack, Handled, Timeout},
    context::ActorContext,
    handle::ActorHandle,
    mailbox::{Cursor, MailboxNode, NodeKind},
    resume::ScheduledActor,
    runtime::{ActorConfig, MailboxConfig, Reschedule},
    Actor, ActorExt, IntoActorConfig,
};
pub use error::{ActorError, ActorResult, SendError, SpawnError, TimerError};
pub use tuple::{
    DynamicTuple, ErasedTuple, FixedArityTuple, Message, TupleValues, TypeDescriptor, TypeRegistry,
};
pub use types::{ActorId, ActorState, ExitReason, Resumed};
