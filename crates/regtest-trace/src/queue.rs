//! Bounded multi-producer queue between the queue layer and the listener

use crate::record::LogRecord;
use std::{
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
        mpsc::{
            Receiver,
            SyncSender,
            TrySendError,
            sync_channel,
        },
    },
    thread,
    time::{
        Duration,
        Instant,
    },
};

const MAX_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub(crate) enum Message {
    Record(Box<LogRecord>),
    /// Everything enqueued before this has been delivered once it is received
    Shutdown,
}

/// Producer side of the record queue.
///
/// Producers never block indefinitely: a full queue is retried with backoff
/// until the enqueue timeout expires, after which the new record is dropped
/// and counted.
#[derive(Debug)]
pub struct RecordQueue {
    sender: SyncSender<Message>,
    timeout: Duration,
    dropped: AtomicU64,
}

impl RecordQueue {
    pub(crate) fn bounded(
        capacity: usize,
        timeout: Duration,
    ) -> (Arc<Self>, Receiver<Message>) {
        let (sender, receiver) = sync_channel(capacity.max(1));
        let queue = Self {
            sender,
            timeout,
            dropped: AtomicU64::new(0),
        };
        (Arc::new(queue), receiver)
    }

    /// Enqueue a record, returning `false` if it had to be dropped.
    pub(crate) fn push(
        &self,
        record: LogRecord,
    ) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut backoff = Duration::from_micros(50);
        let mut message = Message::Record(Box::new(record));
        loop {
            match self.sender.try_send(message) {
                Ok(()) => return true,
                Err(TrySendError::Full(returned)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        return false;
                    }
                    message = returned;
                    thread::sleep(backoff.min(deadline - now));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                },
                Err(TrySendError::Disconnected(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return false;
                },
            }
        }
    }

    /// Enqueue the shutdown sentinel behind every record already queued.
    pub(crate) fn close(&self) -> bool {
        self.sender.send(Message::Shutdown).is_ok()
    }

    /// Number of records dropped under backpressure or after shutdown
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use tracing::Level;

    fn record(message: &str) -> LogRecord {
        LogRecord {
            timestamp: Local::now(),
            level: Level::INFO,
            target: "queue".into(),
            message: message.into(),
            fields: Default::default(),
            test_id: None,
            phase: None,
            thread: None,
        }
    }

    #[test]
    fn full_queue_drops_after_timeout() {
        let (queue, receiver) =
            RecordQueue::bounded(2, Duration::from_millis(20));
        assert!(queue.push(record("a")));
        assert!(queue.push(record("b")));

        let started = Instant::now();
        assert!(!queue.push(record("c")));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(queue.dropped(), 1);

        let delivered: Vec<_> = receiver
            .try_iter()
            .filter_map(|m| match m {
                Message::Record(r) => Some(r.message),
                Message::Shutdown => None,
            })
            .collect();
        assert_eq!(delivered, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn blocked_producer_resumes_when_consumer_drains() {
        let (queue, receiver) = RecordQueue::bounded(1, Duration::from_secs(5));
        assert!(queue.push(record("first")));

        let consumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            receiver.iter().take(2).count()
        });
        assert!(queue.push(record("second")));
        assert_eq!(consumer.join().unwrap(), 2);
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn disconnected_queue_counts_drops() {
        let (queue, receiver) = RecordQueue::bounded(4, Duration::from_secs(1));
        drop(receiver);
        assert!(!queue.push(record("lost")));
        assert_eq!(queue.dropped(), 1);
        assert!(!queue.close());
    }
}
