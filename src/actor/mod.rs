//! Core actor traits.

/// Behaviors and the behavior stack.
pub mod behavior;
/// Actor execution context.
pub mod context;
/// Actor handle for external communication.
pub mod handle;
/// Mailbox cache, cursor and nodes.
pub mod mailbox;
/// The cooperative resume loop.
pub mod resume;
/// Runtime configuration and the Tokio scheduler.
pub mod runtime;

use crate::error::{ActorResult, SpawnError};
use crate::types::ActorId;
use context::ActorContext;
use handle::ActorHandle;
use runtime::ActorConfig;

/// Primary trait implemented by all actors.
///
/// An actor is a stateful value driven by the behaviors it installs on its
/// context. It never runs on its own: a scheduler resumes it whenever its
/// mailbox has work, and the actor finishes once its behavior stack is
/// empty, it calls [`ActorContext::quit`], or a behavior fails.
pub trait Actor: Sized + Send + 'static {
    /// Called on the first resume, before any message is processed.
    ///
    /// Install the initial behavior here with
    /// [`ActorContext::become_behavior`]. Returning without installing one
    /// finishes the actor with [`ExitReason::Normal`](crate::ExitReason::Normal).
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()>;

    /// Called exactly once when the actor finishes, after the behavior stack
    /// has been emptied and before the scheduler is notified.
    fn on_exit(&mut self, _ctx: &mut ActorContext<Self>) {}
}

/// Helper trait for flexible ActorConfig parameter.
///
/// This allows passing `()`, `None`, `ActorConfig::default()`, or `&config` to `spawn_actor`.
pub trait IntoActorConfig {
    /// Converts the value into an `ActorConfig`.
    fn into_config(self) -> ActorConfig;
}

impl IntoActorConfig for ActorConfig {
    fn into_config(self) -> ActorConfig {
        self
    }
}

impl IntoActorConfig for &ActorConfig {
    fn into_config(self) -> ActorConfig {
        self.clone()
    }
}

impl IntoActorConfig for Option<ActorConfig> {
    fn into_config(self) -> ActorConfig {
        self.unwrap_or_default()
    }
}

impl IntoActorConfig for () {
    fn into_config(self) -> ActorConfig {
        ActorConfig::default()
    }
}

/// Convenience trait for spawning actors directly from their implementations.
pub trait ActorExt: Actor + Sized {
    /// Consumes the actor, spawns it on the current Tokio runtime, and returns its handle.
    ///
    /// The config parameter is optional - pass `None`, `()`, `ActorConfig::default()`, or `&config`.
    ///
    /// # Example
    /// ```no_run
    /// # use event_actors::*;
    /// # struct MyActor;
    /// # impl Actor for MyActor {
    /// #     fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
    /// #         ctx.become_behavior(Behavior::new(|_, _, _| Ok(Handled::Consumed)));
    /// #         Ok(())
    /// #     }
    /// # }
    /// # async fn run() {
    /// let handle = MyActor.spawn_actor("my-actor", ()).unwrap();
    /// # }
    /// ```
    fn spawn_actor(
        self,
        id: impl Into<ActorId>,
        config: impl IntoActorConfig,
    ) -> Result<ActorHandle, SpawnError> {
        runtime::spawn_actor(id.into(), self, config.into_config())
    }
}

impl<T> ActorExt for T where T: Actor {}
