//! Bounded window of recently seen message IDs.

use std::collections::{HashSet, VecDeque};

/// Remembers the last `capacity` message IDs so repeat deliveries of the
/// same message are dropped.
#[derive(Debug)]
pub struct RecentIds {
    capacity: usize,
    order: VecDeque<String>,
    lookup: HashSet<String>,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            lookup: HashSet::with_capacity(capacity),
        }
    }

    /// Records `id` and returns true if it was not seen recently.
    ///
    /// Empty IDs cannot be compared and always count as new.
    pub fn insert(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        if self.lookup.contains(id) {
            return false;
        }

        self.lookup.insert(id.to_string());
        self.order.push_back(id.to_string());
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.lookup.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
