//! Handle-based communication API for actors.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tokio::sync::watch;

use crate::actor::mailbox::{MailboxNode, Producers, TimeoutId};
use crate::actor::runtime::Reschedule;
use crate::error::SendError;
use crate::tuple::{Message, TupleValues, TypeRegistry};
use crate::types::{ActorId, ActorState, AtomicActorState, ExitReason};

/// Cloneable handle that producers use to enqueue messages for an actor.
///
/// Enqueueing runs the producer half of the park protocol: a parked actor is
/// moved back to `Running` and handed to its scheduler, an actor that is
/// about to park is pushed back to `Running` so its park attempt fails.
#[derive(Clone)]
pub struct ActorHandle {
    id: ActorId,
    producers: Producers,
    state: Arc<AtomicActorState>,
    reschedule: Arc<dyn Reschedule>,
    registry: Arc<TypeRegistry>,
    exit: watch::Receiver<Option<ExitReason>>,
    mailbox_capacity: Option<usize>,
}

impl ActorHandle {
    pub(crate) fn new(
        id: ActorId,
        producers: Producers,
        state: Arc<AtomicActorState>,
        reschedule: Arc<dyn Reschedule>,
        registry: Arc<TypeRegistry>,
        exit: watch::Receiver<Option<ExitReason>>,
        mailbox_capacity: Option<usize>,
    ) -> Self {
        Self {
            id,
            producers,
            state,
            reschedule,
            registry,
            exit,
            mailbox_capacity,
        }
    }

    /// Returns the unique identifier of the actor.
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Returns the registry used to build messages for this actor.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the mailbox bound, `None` if unbounded.
    pub fn mailbox_capacity(&self) -> Option<usize> {
        self.mailbox_capacity
    }

    /// Number of enqueued messages the actor has not fetched yet.
    pub fn mailbox_len(&self) -> usize {
        self.producers.messages.len()
    }

    /// Current scheduling state of the actor.
    pub fn state(&self) -> ActorState {
        self.state.load()
    }

    /// Returns true until the actor has finished.
    pub fn is_alive(&self) -> bool {
        self.state.load() != ActorState::Done
    }

    /// The exit reason, once the actor has finished.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        *self.exit.borrow()
    }

    /// Waits until the actor has finished and returns its exit reason.
    pub async fn wait_for_exit(&self) -> ExitReason {
        let mut exit = self.exit.clone();
        loop {
            if let Some(reason) = *exit.borrow_and_update() {
                return reason;
            }
            if exit.changed().await.is_err() {
                // The actor was dropped without finishing; nothing will
                // ever be published.
                return (*exit.borrow()).unwrap_or(ExitReason::UnhandledFault);
            }
        }
    }

    /// Builds a message from native values and enqueues it.
    ///
    /// A message that lands while the actor is finishing is reported as
    /// `Closed` once the actor has reached `Done`; it is never handled.
    ///
    /// # Errors
    /// - `SendError::Full` if the bounded mailbox is full.
    /// - `SendError::Closed` if the actor has finished.
    pub fn notify<V: TupleValues>(&self, values: V) -> Result<(), SendError> {
        self.deliver(Message::of(&self.registry, values))
    }

    /// Enqueues an already built message.
    ///
    /// # Errors
    /// Same as [`notify`](Self::notify).
    pub fn deliver(&self, message: Message) -> Result<(), SendError> {
        self.enqueue(&self.producers.messages, MailboxNode::message(message))
    }

    /// Enqueues a message tagged with the sending actor.
    ///
    /// # Errors
    /// Same as [`notify`](Self::notify).
    pub fn deliver_from(&self, sender: ActorId, message: Message) -> Result<(), SendError> {
        self.enqueue(&self.producers.messages, MailboxNode::message_from(sender, message))
    }

    /// Enqueues a timeout node. Only fails with `Closed`: timeout nodes
    /// are not subject to the mailbox bound.
    pub(crate) fn deliver_timeout(&self, id: TimeoutId) -> Result<(), SendError> {
        self.enqueue(&self.producers.timeouts, MailboxNode::timeout(id))
    }

    fn enqueue(&self, tx: &Sender<MailboxNode>, node: MailboxNode) -> Result<(), SendError> {
        if self.state.load() == ActorState::Done {
            return Err(SendError::Closed);
        }
        tx.try_send(node).map_err(|err| match err {
            crossbeam_channel::TrySendError::Full(_) => SendError::Full,
            crossbeam_channel::TrySendError::Disconnected(_) => SendError::Closed,
        })?;
        self.wake()
    }

    /// Producer half of the park protocol, run after a node was pushed.
    ///
    /// Returns `Closed` if the actor reached `Done` in the meantime: its
    /// final drain may already have run, so the node is never handled.
    fn wake(&self) -> Result<(), SendError> {
        // Pairs with the fence between the consumer's `AboutToBlock` store
        // and its final emptiness check.
        fence(Ordering::SeqCst);
        loop {
            match self.state.load() {
                ActorState::Blocked => {
                    if self
                        .state
                        .compare_exchange(ActorState::Blocked, ActorState::Running)
                        .is_ok()
                    {
                        self.reschedule.reschedule();
                        return Ok(());
                    }
                }
                ActorState::AboutToBlock => {
                    if self
                        .state
                        .compare_exchange(ActorState::AboutToBlock, ActorState::Running)
                        .is_ok()
                    {
                        return Ok(());
                    }
                }
                ActorState::Running => return Ok(()),
                ActorState::Done => return Err(SendError::Closed),
            }
        }
    }
}

impl PartialEq for ActorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.producers.messages.same_channel(&other.producers.messages)
    }
}

impl Eq for ActorHandle {}

impl Hash for ActorHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("id", &self.id)
            .field("state", &self.state.load())
            .field("mailbox_capacity", &self.mailbox_capacity)
            .finish()
    }
}
