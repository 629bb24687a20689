/**
 * Background notification queue drained by a pool of sender threads.
 *
 * Architecture overview:
 *
 * ```text
 *  ┌───────────────┐  bounded channel   ┌──────────────────┐
 *  │ dispatch code │ ── request ──────► │ worker threads   │
 *  │ (any thread)  │                    │ (N, same engine) │
 *  └───────────────┘                    └────────┬─────────┘
 *                                                │
 *                                    Notifier::send() (one attempt)
 *                                                │
 *                                         ┌──────▼──────┐
 *                                         │  subscriber  │
 *                                         └─────────────┘
 * ```
 *
 * The queue is optional: `Notifier::send` can always be called directly.
 * It exists for dispatchers that must not block on subscriber latency.
 * Every queued request gets exactly one delivery attempt; there is no retry
 * and no pacing here.
 *
 * `enqueue` never blocks: when the channel is full the request is handed
 * back inside `QueueError::Full` (back-pressure). `flush` blocks until all
 * requests queued so far have been processed, or a timeout elapses.
 */
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use super::Transport;
use crate::engine::Notifier;
use crate::error::Result as SendResult;
use crate::protocol::request::NotificationRequest;

/// Callback observing the result of each queued send.
pub type OutcomeCallback =
    Arc<dyn Fn(&NotificationRequest, &SendResult<Vec<u8>>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("notification queue is full")]
    Full(Box<NotificationRequest>),

    #[error("notification queue is closed")]
    Closed(Box<NotificationRequest>),

    #[error("failed to spawn notification worker: {0}")]
    Spawn(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// QueueOptions
// ---------------------------------------------------------------------------

/**
 * Sizing of the queue and its worker pool.
 */
#[derive(Clone)]
pub struct QueueOptions {
    /// Requests that can wait in the channel before `enqueue` fails.
    pub capacity: usize,

    /// Sender threads draining the channel.
    pub workers: usize,

    /// Optional observer called after every send, from the worker thread.
    /// A panicking observer is contained and logged.
    pub on_outcome: Option<OutcomeCallback>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            capacity: 100,
            workers: 10,
            on_outcome: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending: condvar-based accounting for flush
// ---------------------------------------------------------------------------

/**
 * Counts requests accepted but not yet processed. `flush` waits on the
 * condvar until the count drops to zero.
 */
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    fn add(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
    }

    fn done(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.drained.notify_all();
            }
        }
    }

    /// `true` if the count reached zero before `timeout`.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let Ok(guard) = self.count.lock() else {
            return false;
        };
        match self.drained.wait_timeout_while(guard, timeout, |count| *count > 0) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationQueue
// ---------------------------------------------------------------------------

pub struct NotificationQueue {
    sender: Option<Sender<NotificationRequest>>,
    pending: Arc<Pending>,
    workers: Vec<JoinHandle<()>>,
}

impl NotificationQueue {
    /**
     * Spawns `options.workers` sender threads sharing `notifier`.
     *
     * If a thread cannot be spawned, the ones already started are shut
     * down before the error is returned.
     */
    pub fn start<T>(notifier: Arc<Notifier<T>>, options: QueueOptions) -> Result<Self, QueueError>
    where
        T: Transport + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(options.capacity);
        let mut queue = Self {
            sender: Some(sender),
            pending: Arc::new(Pending::new()),
            workers: Vec::with_capacity(options.workers),
        };

        for index in 0..options.workers.max(1) {
            let receiver = receiver.clone();
            let notifier = Arc::clone(&notifier);
            let pending = Arc::clone(&queue.pending);
            let on_outcome = options.on_outcome.clone();

            let handle = thread::Builder::new()
                .name(format!("notifier-worker-{index}"))
                .spawn(move || run_loop(&receiver, &notifier, &pending, on_outcome.as_ref()))?;
            queue.workers.push(handle);
        }

        tracing::info!(
            workers = queue.workers.len(),
            capacity = options.capacity,
            "Notification queue started"
        );
        Ok(queue)
    }

    /**
     * Queues `request` without blocking. On failure the request is returned
     * inside the error so the caller can decide what to do with it.
     */
    pub fn enqueue(&self, request: NotificationRequest) -> Result<(), QueueError> {
        let Some(sender) = &self.sender else {
            return Err(QueueError::Closed(Box::new(request)));
        };

        self.pending.add();
        match sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(request)) => {
                self.pending.done();
                tracing::warn!(destination = %request.authority(), "Notification queue is full");
                Err(QueueError::Full(Box::new(request)))
            }
            Err(TrySendError::Disconnected(request)) => {
                self.pending.done();
                Err(QueueError::Closed(Box::new(request)))
            }
        }
    }

    /// Requests accepted but not processed yet.
    pub fn pending(&self) -> usize {
        self.pending.count.lock().map(|count| *count).unwrap_or(0)
    }

    /**
     * Blocks until every request queued so far has been processed, or until
     * `timeout` elapses. Returns `true` if the queue drained in time.
     */
    pub fn flush(&self, timeout: Duration) -> bool {
        self.pending.wait_timeout(timeout)
    }

    /// Stops accepting requests, lets the workers drain the channel, and
    /// joins them.
    pub fn shutdown(mut self) {
        self.close_and_join();
    }

    fn close_and_join(&mut self) {
        self.sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Notification worker panicked");
            }
        }
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

/**
 * Worker body: one send per received request until every sender is gone.
 * A panic while sending or in the observer is contained to that request so
 * the pending count stays correct.
 */
fn run_loop<T: Transport>(
    receiver: &Receiver<NotificationRequest>,
    notifier: &Notifier<T>,
    pending: &Pending,
    on_outcome: Option<&OutcomeCallback>,
) {
    while let Ok(request) = receiver.recv() {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let result = notifier.send(&request);
            if let Some(callback) = on_outcome {
                callback(&request, &result);
            }
        }));

        if outcome.is_err() {
            tracing::error!(
                destination = %request.authority(),
                "Notification send panicked; continuing with next request"
            );
        }
        pending.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmManager;
    use crate::config::EngineConfig;
    use crate::transport::{HttpCall, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /**
     * Counts calls; blocks inside `perform` while the gate is closed.
     */
    struct GatedTransport {
        gate: Arc<(Mutex<bool>, Condvar)>,
        calls: AtomicUsize,
    }

    impl GatedTransport {
        fn open() -> Self {
            Self {
                gate: Arc::new((Mutex::new(true), Condvar::new())),
                calls: AtomicUsize::new(0),
            }
        }

        fn closed() -> Self {
            Self {
                gate: Arc::new((Mutex::new(false), Condvar::new())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for GatedTransport {
        type Handle = ();

        fn version_token(&self) -> &str {
            "gated/1"
        }

        fn open_handle(&self, _destination: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn perform(&self, _handle: &mut (), _call: &HttpCall<'_>) -> Result<Vec<u8>, TransportError> {
            let (lock, opened) = &*self.gate;
            let mut is_open = lock.lock().unwrap();
            while !*is_open {
                is_open = opened.wait(is_open).unwrap();
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"HTTP/1.1 204 No Content\r\n\r\n".to_vec())
        }
    }

    fn open_gate(gate: &(Mutex<bool>, Condvar)) {
        *gate.0.lock().unwrap() = true;
        gate.1.notify_all();
    }

    fn notifier(transport: GatedTransport) -> Arc<Notifier<GatedTransport>> {
        Arc::new(Notifier::with_transport(
            Arc::new(EngineConfig::default()),
            transport,
            Arc::new(AlarmManager::new()),
        ))
    }

    fn request(port: u16) -> NotificationRequest {
        NotificationRequest::new("10.0.0.1", port, "POST", "/notify")
            .with_body("application/json", "{}")
    }

    #[test]
    fn test_flush_waits_for_every_request() {
        let notifier = notifier(GatedTransport::open());
        let queue = NotificationQueue::start(Arc::clone(&notifier), QueueOptions::default())
            .expect("workers start");

        for port in 1..=20 {
            queue.enqueue(request(port)).expect("queued");
        }

        assert!(queue.flush(Duration::from_secs(5)));
        assert_eq!(queue.pending(), 0);
        assert_eq!(notifier.transport().calls.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_outcome_callback_sees_every_result() {
        let codes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&codes);
        let options = QueueOptions {
            workers: 2,
            on_outcome: Some(Arc::new(move |_request, result| {
                seen.lock().unwrap().push(crate::error::result_code(result));
            })),
            ..QueueOptions::default()
        };
        let queue = NotificationQueue::start(notifier(GatedTransport::open()), options)
            .expect("workers start");

        queue.enqueue(request(1026)).expect("queued");
        queue.enqueue(request(0)).expect("queued");
        assert!(queue.flush(Duration::from_secs(5)));

        let mut codes = codes.lock().unwrap().clone();
        codes.sort();
        assert_eq!(codes, vec![-1, 0]);
    }

    /**
     * One worker stuck on a closed gate holds one request; the channel
     * holds `capacity` more; the next enqueue is handed back.
     */
    #[test]
    fn test_full_queue_hands_request_back() {
        let transport = GatedTransport::closed();
        let gate = Arc::clone(&transport.gate);
        let options = QueueOptions {
            capacity: 1,
            workers: 1,
            on_outcome: None,
        };
        let queue = NotificationQueue::start(notifier(transport), options).expect("workers start");

        queue.enqueue(request(1)).expect("taken by the worker");
        while !channel_is_empty(&queue) {
            std::thread::yield_now();
        }
        queue.enqueue(request(2)).expect("fits the channel");

        match queue.enqueue(request(3)) {
            Err(QueueError::Full(rejected)) => assert_eq!(rejected.port, 3),
            other => panic!("expected Full, got {other:?}"),
        }
        assert!(!queue.flush(Duration::from_millis(50)));

        open_gate(&gate);
        assert!(queue.flush(Duration::from_secs(5)));
        queue.shutdown();
    }

    fn channel_is_empty(queue: &NotificationQueue) -> bool {
        queue.sender.as_ref().is_some_and(|sender| sender.is_empty())
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let notifier = notifier(GatedTransport::open());
        let queue = NotificationQueue::start(Arc::clone(&notifier), QueueOptions::default())
            .expect("workers start");
        for port in 1..=5 {
            queue.enqueue(request(port)).expect("queued");
        }

        queue.shutdown();
        assert_eq!(notifier.transport().calls.load(Ordering::SeqCst), 5);
    }
}
