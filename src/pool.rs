//! Reuse pools for output buffers and tree storage.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::tree::{Node, Properties};

/// Output buffers that grew beyond this capacity are dropped instead of being
/// returned to the pool.
pub const MAX_POOLED_BUFFER: usize = 64 * 1024;

const MAX_POOLED_PROPERTIES: usize = 64;

pub(crate) struct Pool<T> {
    items: Mutex<Vec<T>>,
    limit: usize,
}

impl<T> Pool<T> {
    pub const fn new(limit: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            limit,
        }
    }

    pub fn take(&self) -> Option<T> {
        self.lock().pop()
    }

    pub fn give(&self, item: T) {
        let mut items = self.lock();
        if items.len() < self.limit {
            items.push(item);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static BUFFERS: Pool<Vec<u8>> = Pool::new(32);
static PROPERTIES: Pool<Properties> = Pool::new(256);
static ITEMS: Pool<Vec<Node>> = Pool::new(256);

pub(crate) fn take_buffer() -> Vec<u8> {
    BUFFERS.take().unwrap_or_else(|| Vec::with_capacity(1024))
}

pub(crate) fn give_buffer(mut buffer: Vec<u8>) {
    if buffer.capacity() > MAX_POOLED_BUFFER {
        log::trace!(
            "dropping output buffer of {} bytes instead of pooling it",
            buffer.capacity()
        );
        return;
    }
    buffer.clear();
    BUFFERS.give(buffer);
}

pub(crate) fn take_properties() -> Properties {
    PROPERTIES.take().unwrap_or_default()
}

pub(crate) fn take_items() -> Vec<Node> {
    ITEMS.take().unwrap_or_default()
}

/// Recursively returns the storage of a tree to the reuse pool. The AST
/// parser draws from the same pool, so releasing trees that are no longer
/// needed reduces allocation when parsing many documents.
pub fn release(node: Node) {
    match node {
        Node::Object(object) => {
            let mut properties = object.properties;
            for (_, child) in properties.drain() {
                release(child);
            }
            if properties.capacity() <= MAX_POOLED_PROPERTIES {
                PROPERTIES.give(properties);
            }
        }
        Node::Array(array) => {
            let mut items = array.items;
            for child in items.drain(..) {
                release(child);
            }
            ITEMS.give(items);
        }
        Node::Literal(_) => {}
    }
}
