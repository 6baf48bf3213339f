//! Fixed-capacity ring buffer, generalized from the domain-event buffer
//! pattern for arbitrary cloneable telemetry points.

use std::collections::VecDeque;
use std::sync::RwLock;

pub struct RingBuffer<T> {
    items: RwLock<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, item: T) {
        let mut items = self.items.write().expect("lock poisoned");
        if items.len() >= self.capacity {
            items.pop_front();
        }
        items.push_back(item);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().expect("lock poisoned").iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
