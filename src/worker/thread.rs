//! Background thread draining a transport queue into the bus.
//!
//! `ConsumerWorker` attaches a consumer to a named queue. The consumer only
//! pushes raw messages into a bounded channel; the worker thread decodes
//! them and submits them to the framework. A full channel refuses the
//! delivery, so the transport holds the message until the worker asks for
//! it again.

use std::sync::mpsc::{
    channel, sync_channel, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::BusConfig;
use crate::error::BusError;
use crate::framework::Framework;
use crate::transport::{MessageCodec, Transport, TransportError, WireMessage};

/// Statistics from the consumer worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Number of messages successfully handled.
    pub handled: usize,
    /// Number of messages the bus failed to handle.
    pub failed: usize,
    /// Number of messages that could not be decoded.
    pub decode_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Messages buffered between the transport and the worker. Once the
    /// buffer is full the transport holds further messages.
    pub capacity: usize,
    /// How long the worker waits for a message before checking for a stop
    /// signal.
    pub poll_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from_config(&BusConfig::default())
    }
}

impl WorkerOptions {
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            capacity: config.channel_capacity.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }
}

/// A background thread consuming one queue.
///
/// Follows the spawn, work, stop-and-collect-stats pattern: `stop()`
/// detaches the consumer, signals the thread, waits for it and returns its
/// statistics. Messages still buffered when the stop signal is seen are
/// not handled; the transport holds anything it could not deliver.
///
/// ## Example
///
/// ```ignore
/// let framework = Arc::new(Framework::bootstrap(&config, InMemoryTransport::new(), InMemoryPersistence::new())?);
/// framework.register_command_handler::<CreateUser, CreateUserHandler>()?;
///
/// let codec = MessageCodec::new().register::<CreateUser>();
/// let worker = ConsumerWorker::spawn(Arc::clone(&framework), "users", codec, WorkerOptions::from_config(&config))?;
///
/// framework.publish(&CreateUser::new("John Doe", "johndoe@me.com"))?;
///
/// let stats = worker.stop();
/// println!("Handled {} messages", stats.handled);
/// ```
pub struct ConsumerWorker {
    queue: String,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ConsumerWorker {
    /// Start the worker thread and attach it to `queue`.
    pub fn spawn<T>(
        framework: Arc<Framework<T>>,
        queue: impl Into<String>,
        codec: MessageCodec,
        options: WorkerOptions,
    ) -> Result<Self, BusError>
    where
        T: Transport + 'static,
    {
        let queue = queue.into();
        let (stop_tx, stop_rx) = channel::<()>();
        let (message_tx, message_rx) = sync_channel::<WireMessage>(options.capacity);

        let worker_framework = Arc::clone(&framework);
        let worker_queue = queue.clone();
        let handle = thread::spawn(move || {
            let framework = worker_framework;
            let mut stats = WorkerStats::default();

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }
                if framework.is_shut_down() {
                    break;
                }

                // Take back whatever the transport held while the buffer was full.
                match framework.transport().flush(&worker_queue) {
                    Ok(()) => {}
                    Err(TransportError::Closed) => break,
                    Err(err) => {
                        debug!(queue = %worker_queue, error = %err, "failed to flush held messages");
                    }
                }

                let wire = match message_rx.recv_timeout(options.poll_interval) {
                    Ok(wire) => wire,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                let message = match codec.decode(&wire) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(queue = %worker_queue, id = %wire.id, error = %err, "dropping undecodable message");
                        stats.decode_failures += 1;
                        continue;
                    }
                };

                match framework.submit(&*message) {
                    Ok(_) => stats.handled += 1,
                    Err(err) => {
                        warn!(queue = %worker_queue, id = %wire.id, error = %err, "message not processed");
                        stats.failed += 1;
                    }
                }
            }

            debug!(queue = %worker_queue, ?stats, "consumer worker stopped");
            stats
        });

        let mut worker = Self {
            queue,
            stop_tx,
            handle: Some(handle),
            detach: None,
        };

        let attached = framework.transport().consume(
            &worker.queue,
            Box::new(move |wire| {
                message_tx.try_send(wire).map_err(|err| match err {
                    TrySendError::Full(_) => {
                        TransportError::Delivery("consumer buffer full".to_string())
                    }
                    TrySendError::Disconnected(_) => TransportError::Detached,
                })
            }),
        );
        let consumer = match attached {
            Ok(consumer) => consumer,
            Err(err) => {
                worker.join();
                return Err(err.into());
            }
        };

        let detach_queue = worker.queue.clone();
        worker.detach = Some(Box::new(move || {
            if let Err(err) = framework.transport().cancel(&detach_queue, consumer) {
                debug!(queue = %detach_queue, error = %err, "failed to detach consumer");
            }
        }));

        info!(queue = %worker.queue, capacity = options.capacity, "consumer worker started");
        Ok(worker)
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Signal the worker to stop and wait for it to finish.
    /// Returns the worker statistics.
    pub fn stop(mut self) -> WorkerStats {
        self.join()
    }

    /// Signal the worker to stop without waiting. The consumer stays
    /// attached until the worker is stopped or dropped; deliveries after
    /// the thread exits detach it.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    fn join(&mut self) -> WorkerStats {
        self.detach();
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }
}

impl Drop for ConsumerWorker {
    fn drop(&mut self) {
        self.detach();
        let _ = self.stop_tx.send(());
    }
}
