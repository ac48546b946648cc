//! Bounded queue between many producers and one output sink
//!
//! [`AsyncSink`] lets every partition consumer hand records to a single
//! wrapped [`Sink`] without ever running two `print` calls at once. Records
//! travel through a bounded `tokio::sync::mpsc` channel drained by one
//! dedicated task:
//!
//! ```text
//! partition 0 --accept()--\
//! partition 1 --accept()---+--> [ bounded queue ] --> drain task --> inner.print()
//! partition N --accept()--/
//! ```
//!
//! A full queue blocks `accept`, so a slow output throttles every producer
//! evenly. Records from one producer reach the inner sink in the order that
//! producer accepted them; records from different producers interleave in
//! arrival order.
//!
//! The drain task stops when the shared shutdown token is cancelled. Records
//! still queued at that point are dropped, and producers blocked on a full
//! queue are released.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::record::Record;
use crate::sink::Sink;

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

type PendingDrain = (mpsc::Receiver<Record>, Arc<dyn Sink>);

/// Bounded-queue decoupling layer in front of one sink
pub struct AsyncSink {
    sender: mpsc::Sender<Record>,
    pending: Mutex<Option<PendingDrain>>,
    task: Mutex<Option<JoinHandle<u64>>>,
    shutdown: CancellationToken,
    finished: CancellationToken,
}

impl AsyncSink {
    /// Wrap `inner` behind a queue of `capacity` records.
    ///
    /// A capacity of zero is raised to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::async_sink::AsyncSink;
    /// use logstash_kafka_tail::formatter::{Formatter, Template};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let formatter = Formatter::new(Template::compile("%{message}"), Vec::<u8>::new());
    /// let sink = AsyncSink::new(formatter, 10, CancellationToken::new());
    /// assert_eq!(sink.capacity(), 10);
    /// ```
    pub fn new<S: Sink + 'static>(inner: S, capacity: usize, shutdown: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let inner: Arc<dyn Sink> = Arc::new(inner);
        Self {
            sender,
            pending: Mutex::new(Some((receiver, inner))),
            task: Mutex::new(None),
            shutdown,
            finished: CancellationToken::new(),
        }
    }

    /// Maximum number of queued records
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Launch the drain task. Calling it again has no effect.
    pub fn start(&self) {
        let Some((receiver, inner)) = lock(&self.pending).take() else {
            warn!("Async sink already started");
            return;
        };

        let handle = tokio::spawn(drain(
            receiver,
            inner,
            self.shutdown.clone(),
            self.finished.clone(),
        ));
        *lock(&self.task) = Some(handle);
    }

    /// Queue a record, waiting while the queue is full.
    ///
    /// Returns false when the record was dropped because shutdown began or
    /// the drain task is gone.
    pub async fn accept(&self, record: Record) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = self.sender.send(record) => sent.is_ok(),
        }
    }

    /// Tell the drain task that no more records will arrive.
    ///
    /// The task delivers whatever is still queued and exits.
    pub fn finish(&self) {
        self.finished.cancel();
    }

    /// Wait for the drain task to exit and return how many records it
    /// delivered. Returns 0 if the task was never started.
    pub async fn join(&self) -> u64 {
        let handle = lock(&self.task).take();
        match handle {
            Some(handle) => match handle.await {
                Ok(delivered) => delivered,
                Err(e) => {
                    error!(error = %e, "Async sink task failed");
                    0
                }
            },
            None => 0,
        }
    }
}

#[async_trait::async_trait]
impl Sink for AsyncSink {
    async fn print(&self, record: Record) {
        if !self.accept(record).await {
            debug!("Record dropped during shutdown");
        }
    }
}

async fn drain(
    mut receiver: mpsc::Receiver<Record>,
    inner: Arc<dyn Sink>,
    shutdown: CancellationToken,
    finished: CancellationToken,
) -> u64 {
    let mut delivered = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!(delivered, "Async sink interrupted");
                break;
            }

            _ = finished.cancelled() => {
                while let Ok(record) = receiver.try_recv() {
                    inner.print(record).await;
                    delivered += 1;
                }
                debug!(delivered, "Async sink drained");
                break;
            }

            next = receiver.recv() => match next {
                Some(record) => {
                    inner.print(record).await;
                    delivered += 1;
                }
                None => break,
            }
        }
    }

    delivered
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
