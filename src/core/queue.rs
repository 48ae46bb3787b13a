//! Bounded FIFO queue feeding a pool's carrier threads.
//!
//! Built on `parking_lot` Mutex + Condvar rather than an array-backed
//! channel so a capacity of `usize::MAX` (the unbounded default pool)
//! costs nothing up front. Producers wait for space up to a caller-chosen
//! budget; consumers block until an item arrives or the queue is closed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded multi-producer multi-consumer FIFO with timed insertion.
pub struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items. Capacities below 1
    /// are raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Insert `item`, waiting up to `wait` for space. Returns `false` if
    /// the queue stayed full for the whole budget or has been closed.
    ///
    /// A `wait` too large to resolve to a deadline degrades to an untimed
    /// wait, which is how the unbounded default budget behaves.
    pub fn offer(&self, item: T, wait: Duration) -> bool {
        let deadline = Instant::now().checked_add(wait);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return false;
            }
            if state.items.len() < self.capacity {
                break;
            }
            match deadline {
                Some(deadline) => {
                    if self.not_full.wait_until(&mut state, deadline).timed_out() {
                        // One last look: the slot may have opened between the
                        // timeout firing and the lock being reacquired.
                        if state.closed || state.items.len() >= self.capacity {
                            return false;
                        }
                        break;
                    }
                }
                None => self.not_full.wait(&mut state),
            }
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        true
    }

    /// Insert `item` only if space is free right now.
    pub fn try_offer(&self, item: T) -> bool {
        self.offer(item, Duration::ZERO)
    }

    /// Remove the oldest item, blocking until one arrives. Returns `None`
    /// once the queue is closed and drained.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Number of items currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Close the queue: pending items remain takeable, further offers fail,
    /// and blocked consumers drain out.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_is_preserved() {
        let queue = BoundedQueue::new(8);
        for n in 0..5 {
            assert!(queue.try_offer(n));
        }
        for n in 0..5 {
            assert_eq!(queue.take(), Some(n));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue = BoundedQueue::new(0);
        assert!(queue.try_offer(1));
        assert!(!queue.try_offer(2));
    }

    #[test]
    fn offer_times_out_when_full() {
        let queue = BoundedQueue::new(1);
        assert!(queue.try_offer("first"));

        let start = Instant::now();
        let accepted = queue.offer("second", Duration::from_millis(50));
        assert!(!accepted);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn offer_succeeds_once_a_slot_opens() {
        let queue = Arc::new(BoundedQueue::new(1));
        assert!(queue.try_offer(1));

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                queue.take()
            })
        };

        assert!(queue.offer(2, Duration::from_millis(500)));
        assert_eq!(consumer.join().unwrap(), Some(1));
        assert_eq!(queue.take(), Some(2));
    }

    #[test]
    fn take_blocks_until_item_arrives() {
        let queue = Arc::new(BoundedQueue::<u32>::new(4));
        let taker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(queue.try_offer(7));
        assert_eq!(taker.join().unwrap(), Some(7));
    }

    #[test]
    fn close_drains_then_releases_consumers() {
        let queue = Arc::new(BoundedQueue::new(4));
        assert!(queue.try_offer(1));
        queue.close();

        // Pending item still comes out, then consumers see the end.
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), None);
        assert!(!queue.try_offer(2));
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = Arc::new(BoundedQueue::<u32>::new(4));
        let taker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(taker.join().unwrap(), None);
    }

    #[test]
    fn huge_capacity_needs_no_preallocation() {
        let queue = BoundedQueue::new(usize::MAX);
        assert!(queue.try_offer(0u8));
        assert_eq!(queue.len(), 1);
    }
}
