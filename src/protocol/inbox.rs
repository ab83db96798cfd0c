// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending message queue and message-type filter.
//!
//! The queue is the only structure shared between the transport callbacks
//! (producers) and the dispatch worker (consumer). Producers consult the
//! [`MessageTypeRegistry`] before queueing, so traffic nobody listens to is
//! dropped before it costs a topic lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::InboundMessage;

/// Multiset of message-type tags that at least one listener wants.
#[derive(Debug, Clone, Default)]
pub struct MessageTypeRegistry {
    counts: Arc<RwLock<HashMap<String, usize>>>,
}

impl MessageTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one reference to a tag.
    pub fn add(&self, message_type: &str) {
        *self
            .counts
            .write()
            .entry(message_type.to_string())
            .or_insert(0) += 1;
    }

    /// Removes one reference to a tag.
    ///
    /// The tag stays interesting while other references remain.
    pub fn remove(&self, message_type: &str) {
        let mut counts = self.counts.write();
        if let Some(count) = counts.get_mut(message_type) {
            *count -= 1;
            if *count == 0 {
                counts.remove(message_type);
            }
        }
    }

    /// Returns whether anyone listens to this tag.
    #[must_use]
    pub fn contains(&self, message_type: &str) -> bool {
        self.counts.read().contains_key(message_type)
    }

    /// Returns the number of references held for a tag.
    #[must_use]
    pub fn count(&self, message_type: &str) -> usize {
        self.counts.read().get(message_type).copied().unwrap_or(0)
    }
}

/// Producer handle of the pending message queue.
///
/// Cheap to clone; one clone per broker connection.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: mpsc::UnboundedSender<InboundMessage>,
    registry: MessageTypeRegistry,
}

impl InboxSender {
    /// Queues a message if its type tag is registered.
    ///
    /// Returns `false` if the message was filtered out or the consumer is
    /// gone.
    pub fn offer(&self, message: InboundMessage) -> bool {
        if !self.registry.contains(&message.message_type) {
            tracing::trace!(
                message_type = %message.message_type,
                "Dropping message with unregistered type"
            );
            return false;
        }
        self.tx.send(message).is_ok()
    }
}

/// Consumer side of the pending message queue.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<InboundMessage>,
    sender: InboxSender,
}

impl Inbox {
    /// Creates an empty queue with its own message-type registry.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            sender: InboxSender {
                tx,
                registry: MessageTypeRegistry::new(),
            },
        }
    }

    /// Returns a producer handle.
    #[must_use]
    pub fn sender(&self) -> InboxSender {
        self.sender.clone()
    }

    /// Returns the registry shared with every producer.
    #[must_use]
    pub fn registry(&self) -> &MessageTypeRegistry {
        &self.sender.registry
    }

    /// Takes up to `limit` queued messages in FIFO order without waiting.
    ///
    /// `None` drains everything currently queued.
    pub fn drain(&mut self, limit: Option<usize>) -> Vec<InboundMessage> {
        let mut batch = Vec::new();
        while limit.is_none_or(|max| batch.len() < max) {
            match self.rx.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }
        batch
    }

    /// Returns the number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}
