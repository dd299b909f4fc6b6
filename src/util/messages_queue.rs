// Copyright 2026 The reading-archive Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Multi-producer queue drained by the thread that calls `Server::recv`.
pub struct MessagesQueue<T>
where
    T: Send,
{
    queue: Mutex<VecDeque<T>>,
    condvar: Condvar,
}

impl<T> MessagesQueue<T>
where
    T: Send,
{
    pub fn with_capacity(capacity: usize) -> Arc<MessagesQueue<T>> {
        Arc::new(MessagesQueue {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            condvar: Condvar::new(),
        })
    }

    // a panicking producer cannot leave the deque half-modified
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes an element to the queue.
    pub fn push(&self, value: T) {
        let mut queue = self.lock();
        queue.push_back(value);
        self.condvar.notify_one();
    }

    /// Pops an element. Blocks until one is available.
    pub fn pop(&self) -> T {
        let mut queue = self.lock();

        loop {
            if let Some(elem) = queue.pop_front() {
                return elem;
            }

            queue = self
                .condvar
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Tries to pop an element without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Pops an element, waiting at most `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();

        loop {
            if let Some(elem) = queue.pop_front() {
                return Some(elem);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            queue = self
                .condvar
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MessagesQueue;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pops_in_push_order() {
        let queue = MessagesQueue::with_capacity(4);
        queue.push(1);
        queue.push(2);

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn pop_timeout_expires() {
        let queue = MessagesQueue::<u8>::with_capacity(1);
        assert_eq!(queue.pop_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn pop_wakes_up_on_push() {
        let queue = MessagesQueue::with_capacity(1);
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.push("ready");
        });

        assert_eq!(queue.pop_timeout(Duration::from_secs(5)), Some("ready"));
        handle.join().unwrap();
    }
}
