//! Unbounded request queue between watcher threads and the main loop.
//!
//! Producers clone a [`Sender`]; the single consumer owns the queue. Stopping
//! travels on a separate channel so it overtakes requests already queued.

use crossbeam::channel::{Receiver, Sender, select, unbounded};

/// Multi-producer, single-consumer FIFO with an out-of-band stop signal.
pub struct EventQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        Self {
            sender,
            receiver,
            stop_tx,
            stop_rx,
        }
    }

    /// Get a clone of the sender handle (for watcher threads).
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Handle that ends [`EventQueue::recv`] from any thread.
    pub fn stopper(&self) -> Sender<()> {
        self.stop_tx.clone()
    }

    /// Blocks until the next item arrives.
    ///
    /// Returns `None` once a stop signal has been sent, even if items are
    /// still queued.
    pub fn recv(&self) -> Option<T> {
        let next = select! {
            recv(self.stop_rx) -> _ => None,
            recv(self.receiver) -> item => item.ok(),
        };
        let item = next?;
        // Both may have been ready; stop wins.
        if self.stop_rx.try_recv().is_ok() {
            return None;
        }
        Some(item)
    }

    /// Drops everything still queued and returns how many items that was.
    pub fn discard_pending(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn items_come_out_in_arrival_order() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        for i in 0..5 {
            sender.send(i).unwrap();
        }
        let drained: Vec<_> = (0..5).filter_map(|_| queue.recv()).collect();
        assert_eq!(drained, [0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn stop_overtakes_queued_items() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        sender.send("a").unwrap();
        sender.send("b").unwrap();
        queue.stopper().send(()).unwrap();

        assert_eq!(queue.recv(), None);
        assert_eq!(queue.discard_pending(), 2);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn stop_wakes_a_blocked_consumer() {
        let queue = EventQueue::<u32>::new();
        let stopper = queue.stopper();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.send(()).unwrap();
        });
        assert_eq!(queue.recv(), None);
        handle.join().unwrap();
    }

    #[test]
    fn producers_on_other_threads_are_all_seen() {
        let queue = EventQueue::new();
        let handles: Vec<_> = (0..3)
            .map(|t| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for i in 0..10 {
                        sender.send(t * 100 + i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 30);
        let mut seen: Vec<_> = (0..30).filter_map(|_| queue.recv()).collect();
        seen.sort_unstable();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&209));
    }
}
