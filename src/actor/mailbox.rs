//! Multi-producer, single-consumer mailbox with a consumer-side cache.
//!
//! Producers push [`MailboxNode`]s into a channel. The owning actor pulls
//! them into a local cache with [`Mailbox::try_fetch_more`] and scans the
//! cache from a [`Cursor`]; nodes that no behavior accepts stay cached for a
//! later scan.
//!
//! Timeout nodes travel on a second, unbounded channel so a full bounded
//! mailbox never swallows them.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::tuple::Message;
use crate::types::ActorId;

/// Identifier of one armed behavior timeout.
pub type TimeoutId = u64;

/// Content of a mailbox entry.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A user message.
    Message(Message),
    /// A behavior timeout fired.
    Timeout(TimeoutId),
}

/// One mailbox entry.
#[derive(Debug, Clone)]
pub struct MailboxNode {
    kind: NodeKind,
    sender: Option<ActorId>,
}

impl MailboxNode {
    /// A user message without sender information.
    pub fn message(message: Message) -> Self {
        Self {
            kind: NodeKind::Message(message),
            sender: None,
        }
    }

    /// A user message sent on behalf of `sender`.
    pub fn message_from(sender: ActorId, message: Message) -> Self {
        Self {
            kind: NodeKind::Message(message),
            sender: Some(sender),
        }
    }

    pub(crate) fn timeout(id: TimeoutId) -> Self {
        Self {
            kind: NodeKind::Timeout(id),
            sender: None,
        }
    }

    /// The node's content.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The sending actor, if known.
    pub fn sender(&self) -> Option<&ActorId> {
        self.sender.as_ref()
    }
}

/// Position in the cache where the next scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(usize);

impl Cursor {
    /// Start of the cache.
    pub const START: Cursor = Cursor(0);

    /// Index into the cache.
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Producer halves of a mailbox.
#[derive(Debug, Clone)]
pub(crate) struct Producers {
    /// User messages; bounded by the configured capacity.
    pub(crate) messages: Sender<MailboxNode>,
    /// Timeout nodes; never bounded.
    pub(crate) timeouts: Sender<MailboxNode>,
}

/// Creates the producer and consumer halves of a mailbox.
///
/// `capacity` bounds the number of user messages not yet fetched into the
/// cache.
pub(crate) fn channel(capacity: Option<usize>, fetch_batch: usize) -> (Producers, Mailbox) {
    let (tx, rx) = match capacity {
        Some(capacity) => crossbeam_channel::bounded(capacity),
        None => crossbeam_channel::unbounded(),
    };
    let (timeout_tx, timeout_rx) = crossbeam_channel::unbounded();
    let producers = Producers {
        messages: tx,
        timeouts: timeout_tx,
    };
    (producers, Mailbox::new(rx, timeout_rx, fetch_batch))
}

/// Consumer half of the mailbox, owned by the actor.
#[derive(Debug)]
pub struct Mailbox {
    rx: Receiver<MailboxNode>,
    timeout_rx: Receiver<MailboxNode>,
    cache: VecDeque<MailboxNode>,
    fetch_batch: usize,
}

impl Mailbox {
    fn new(rx: Receiver<MailboxNode>, timeout_rx: Receiver<MailboxNode>, fetch_batch: usize) -> Self {
        debug_assert!(fetch_batch > 0, "fetch batch must be positive");
        Self {
            rx,
            timeout_rx,
            cache: VecDeque::new(),
            fetch_batch: fetch_batch.max(1),
        }
    }

    /// Cursor past the last cached node.
    pub fn end(&self) -> Cursor {
        Cursor(self.cache.len())
    }

    /// Number of cached nodes.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Iterates the cached nodes in order.
    pub fn cache(&self) -> impl Iterator<Item = &MailboxNode> {
        self.cache.iter()
    }

    /// Returns true if producers enqueued nodes that are not cached yet.
    pub fn can_fetch_more(&self) -> bool {
        !self.rx.is_empty() || !self.timeout_rx.is_empty()
    }

    /// Moves up to one batch of enqueued messages into the cache, followed
    /// by every pending timeout node.
    ///
    /// Returns the number of nodes fetched.
    pub fn try_fetch_more(&mut self) -> usize {
        let mut fetched = 0;
        while fetched < self.fetch_batch {
            match self.rx.try_recv() {
                Ok(node) => {
                    self.cache.push_back(node);
                    fetched += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        while let Ok(node) = self.timeout_rx.try_recv() {
            self.cache.push_back(node);
            fetched += 1;
        }
        fetched
    }

    /// Scans the cache from `cursor` and removes the first node `accept`
    /// takes.
    ///
    /// Rejected nodes stay in place. An error from `accept` aborts the scan
    /// and leaves the node being tested in the cache.
    pub fn remove_first<E, F>(&mut self, cursor: Cursor, mut accept: F) -> Result<Option<MailboxNode>, E>
    where
        F: FnMut(&MailboxNode) -> Result<bool, E>,
    {
        let mut index = cursor.0;
        while index < self.cache.len() {
            if accept(&self.cache[index])? {
                return Ok(self.cache.remove(index));
            }
            index += 1;
        }
        Ok(None)
    }

    /// Drops every cached node and everything still queued.
    pub(crate) fn clear(&mut self) {
        self.cache.clear();
        while self.rx.try_recv().is_ok() {}
        while self.timeout_rx.try_recv().is_ok() {}
    }
}
