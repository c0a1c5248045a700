//! Bounded lock-free queue between producers and writer workers.
//!
//! The queue is the only structure both sides mutate. Producers push without
//! ever blocking: when the queue is at capacity the record comes straight
//! back and the dispatcher reports a drop. Workers pop without locking and
//! park when the queue is empty; every successful push wakes the parked
//! workers.
//!
//! Ordering is FIFO. With more than one worker draining concurrently,
//! delivery to the store is FIFO per worker, not globally serialized; that is
//! the throughput trade-off the sink accepts.

use crossbeam_queue::ArrayQueue;
use crossbeam_utils::sync::Unparker;

use crate::encode::EncodedRecord;

pub(crate) struct RecordQueue {
    records: ArrayQueue<EncodedRecord>,

    /// One unparker per writer worker, fixed at build time. Also used at
    /// shutdown to deliver the cancellation wakeup.
    waiters: Vec<Unparker>,
}

impl RecordQueue {
    pub(crate) fn new(capacity: usize, waiters: Vec<Unparker>) -> Self {
        Self {
            records: ArrayQueue::new(capacity),
            waiters,
        }
    }

    /// Non-blocking enqueue. At capacity the record is handed back to the
    /// caller immediately; the queue never grows and never blocks a producer.
    pub(crate) fn try_push(&self, record: EncodedRecord) -> Result<(), EncodedRecord> {
        self.records.push(record)?;
        self.wake_workers();
        Ok(())
    }

    /// Non-blocking dequeue; the worker's blocking loop lives on top of this.
    pub(crate) fn pop(&self) -> Option<EncodedRecord> {
        self.records.pop()
    }

    /// Wakes every parked worker. Cheap when a worker is not parked.
    pub(crate) fn wake_workers(&self) {
        for waiter in &self.waiters {
            waiter.unpark();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.records.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, ProcessTags};
    use crate::record::LogRecord;
    use crossbeam_utils::sync::Parker;
    use log::Level;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn record(seq: u64) -> EncodedRecord {
        let tags = ProcessTags {
            pid: 1,
            node: "test".to_owned(),
        };
        encode(LogRecord::new(Level::Info, "msg", "app", seq), &tags)
    }

    #[test]
    fn test_fifo_order() {
        let queue = RecordQueue::new(8, Vec::new());
        for seq in 0..5 {
            queue.try_push(record(seq)).unwrap();
        }
        for seq in 0..5 {
            assert_eq!(queue.pop().unwrap().sequence, seq);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_rejects_when_full_without_blocking() {
        let queue = RecordQueue::new(2, Vec::new());
        queue.try_push(record(0)).unwrap();
        queue.try_push(record(1)).unwrap();

        let start = Instant::now();
        let rejected = queue.try_push(record(2)).unwrap_err();
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(rejected.sequence, 2);
        assert_eq!(queue.len(), 2);

        // Draining one slot makes the next push succeed.
        assert_eq!(queue.pop().unwrap().sequence, 0);
        queue.try_push(record(2)).unwrap();
    }

    #[test]
    fn test_push_wakes_parked_worker() {
        let parker = Parker::new();
        let queue = Arc::new(RecordQueue::new(4, vec![parker.unparker().clone()]));

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                queue.try_push(record(0)).unwrap();
            })
        };

        // Parks until the push unparks us; the long timeout only bounds a
        // failure of the wakeup path.
        parker.park_timeout(Duration::from_secs(5));
        assert_eq!(queue.pop().unwrap().sequence, 0);
        producer.join().unwrap();
    }

    #[test]
    fn test_occupancy_bounds() {
        let queue = RecordQueue::new(3, Vec::new());
        assert_eq!(queue.capacity(), 3);

        for seq in 0..10 {
            let _ = queue.try_push(record(seq));
            assert!(queue.len() <= queue.capacity());
        }
        assert_eq!(queue.len(), 3);
    }
}
