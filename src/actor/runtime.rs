use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::actor::{handle::ActorHandle, resume::ScheduledActor, Actor};
use crate::error::SpawnError;
use crate::tuple::TypeRegistry;
use crate::types::{ActorId, Resumed};

/// Configuration for the actor's mailbox.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// Maximum number of enqueued, not yet fetched messages. `None` is unbounded.
    pub capacity: Option<usize>,
    /// Maximum number of messages moved into the local cache per fetch.
    pub fetch_batch: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            fetch_batch: 64,
        }
    }
}

impl MailboxConfig {
    /// Bounds the mailbox.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the fetch batch size.
    pub fn with_fetch_batch(mut self, fetch_batch: usize) -> Self {
        self.fetch_batch = fetch_batch;
        self
    }
}

/// Configuration for creating an actor.
#[derive(Debug, Clone, Default)]
pub struct ActorConfig {
    /// Mailbox configuration.
    pub mailbox: MailboxConfig,
    /// Registry used for message type descriptors.
    pub registry: Arc<TypeRegistry>,
}

impl<'a> From<&'a ActorConfig> for ActorConfig {
    fn from(value: &'a ActorConfig) -> Self {
        value.clone()
    }
}

impl ActorConfig {
    /// Bounds the mailbox.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox.capacity = Some(capacity);
        self
    }

    /// Sets the fetch batch size.
    pub fn with_fetch_batch(mut self, fetch_batch: usize) -> Self {
        self.mailbox.fetch_batch = fetch_batch;
        self
    }

    /// Sets the complete mailbox configuration.
    pub fn with_mailbox(mut self, mailbox: MailboxConfig) -> Self {
        self.mailbox = mailbox;
        self
    }

    /// Shares `registry` with the actor.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Scheduler hook invoked when a parked actor becomes runnable.
///
/// Implementations must arrange exactly one future call to
/// [`ScheduledActor::resume`] per invocation and must never run two resumes
/// of the same actor at the same time.
pub trait Reschedule: Send + Sync + 'static {
    /// Queues the actor for another resume.
    fn reschedule(&self);
}

impl<F> Reschedule for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn reschedule(&self) {
        self()
    }
}

type SharedActor<A> = Arc<Mutex<ScheduledActor<A>>>;

/// Resumes actors as Tokio tasks.
///
/// Holds the only strong reference to a live actor; the reference is
/// released once the actor reports [`Resumed::Done`].
struct TokioReschedule<A: Actor> {
    runtime: Handle,
    live: Arc<Mutex<Option<SharedActor<A>>>>,
}

impl<A: Actor> Reschedule for TokioReschedule<A> {
    fn reschedule(&self) {
        let Some(actor) = self.live.lock().clone() else {
            return;
        };
        let live = Arc::clone(&self.live);
        self.runtime.spawn(async move {
            // The lock only contends with the tail of a previous resume
            // whose park raced with this wake.
            let outcome = actor.lock().resume();
            if let Resumed::Done(_) = outcome {
                live.lock().take();
            }
        });
    }
}

pub(crate) fn spawn_actor<A: Actor>(
    id: ActorId,
    actor: A,
    config: ActorConfig,
) -> Result<ActorHandle, SpawnError> {
    let runtime = Handle::try_current().map_err(|_| SpawnError::MissingRuntime)?;
    let live = Arc::new(Mutex::new(None));
    let reschedule = Arc::new(TokioReschedule {
        runtime,
        live: Arc::clone(&live),
    });
    let scheduled = ScheduledActor::new(id, actor, config, reschedule.clone());
    let handle = scheduled.handle();
    *live.lock() = Some(Arc::new(Mutex::new(scheduled)));

    // New actors start out `Running`; the first resume runs `init`.
    reschedule.reschedule();
    Ok(handle)
}
