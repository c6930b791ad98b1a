//! In-memory FIFO queue with an optional depth bound.

use std::collections::VecDeque;

use crate::core::SchedulerError;

/// Arrival-ordered queue. Items leave only from the head.
///
/// `max_depth = None` leaves the queue unbounded.
#[derive(Debug)]
pub struct FifoQueue<P> {
    max_depth: Option<usize>,
    items: VecDeque<P>,
}

impl<P> FifoQueue<P> {
    /// Create a queue, optionally bounded.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            items: VecDeque::with_capacity(max_depth.unwrap_or(16).min(1024)),
        }
    }

    /// Append to the tail.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QueueFull`] when the bound is reached. The item is
    /// returned to the caller alongside the error.
    pub fn push(&mut self, item: P) -> Result<(), (SchedulerError, P)> {
        if let Some(max) = self.max_depth {
            if self.items.len() >= max {
                return Err((
                    SchedulerError::QueueFull {
                        depth: self.items.len(),
                    },
                    item,
                ));
            }
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove the head.
    pub fn pop(&mut self) -> Option<P> {
        self.items.pop_front()
    }

    /// Inspect the head.
    pub fn peek(&self) -> Option<&P> {
        self.items.front()
    }

    /// Drop items from the head while `pred` holds. Returns them in order.
    pub fn pop_while(&mut self, mut pred: impl FnMut(&P) -> bool) -> Vec<P> {
        let mut popped = Vec::new();
        while self.items.front().is_some_and(&mut pred) {
            if let Some(item) = self.items.pop_front() {
                popped.push(item);
            }
        }
        popped
    }

    /// Remove everything, in order.
    pub fn drain(&mut self) -> Vec<P> {
        self.items.drain(..).collect()
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured bound.
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}
