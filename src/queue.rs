//! Unbounded FIFO built from the same primitives (`Mutex` + `Signal`) the
//! rest of the driver already uses for its bounded channels. Target and
//! topic queues are unbounded in spec.md's data model; embassy's `Channel`
//! only comes in the bounded flavor, so this composes the pieces it already
//! depends on rather than reaching for a new crate.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use std::collections::VecDeque;

pub struct Queue<T> {
    items: Mutex<CriticalSectionRawMutex, VecDeque<T>>,
    notify: Signal<CriticalSectionRawMutex, ()>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Queue {
            items: Mutex::new(VecDeque::new()),
            notify: Signal::new(),
        }
    }

    pub async fn push(&self, item: T) {
        self.items.lock().await.push_back(item);
        self.notify.signal(());
    }

    /// Pop the next item, waiting if the queue is currently empty.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.items.lock().await.pop_front() {
                return item;
            }
            self.notify.wait().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}
