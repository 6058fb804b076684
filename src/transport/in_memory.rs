//! In-memory transport for testing and single-process scenarios.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::transport::{
    ConsumerId, Delivery, ExchangeKind, Transport, TransportError, WireMessage,
};
use crate::config::QueueBinding;

type Callback = Arc<dyn Fn(WireMessage) -> Result<(), TransportError> + Send + Sync>;

struct Consumer {
    id: ConsumerId,
    callback: Callback,
}

struct Queue {
    binding: QueueBinding,
    pending: VecDeque<WireMessage>,
    consumers: Vec<Consumer>,
    next_consumer: usize,
}

impl Queue {
    /// Every consumer, starting with the one whose turn it is.
    fn rotation(&mut self) -> Vec<(ConsumerId, Callback)> {
        let count = self.consumers.len();
        if count == 0 {
            return Vec::new();
        }
        let start = self.next_consumer % count;
        self.next_consumer = self.next_consumer.wrapping_add(1);
        (0..count)
            .map(|i| {
                let consumer = &self.consumers[(start + i) % count];
                (consumer.id, Arc::clone(&consumer.callback))
            })
            .collect()
    }
}

#[derive(Default)]
struct State {
    initialized: bool,
    closed: bool,
    exchange: Option<(String, ExchangeKind)>,
    queues: Vec<Queue>,
    published: Vec<WireMessage>,
    last_consumer_id: u64,
}

impl State {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if !self.initialized {
            return Err(TransportError::NotInitialized);
        }
        Ok(())
    }

    fn queue_mut(&mut self, name: &str) -> Result<&mut Queue, TransportError> {
        self.queues
            .iter_mut()
            .find(|q| q.binding.name == name)
            .ok_or_else(|| TransportError::UnknownQueue(name.to_string()))
    }
}

/// Broker simulation backed by shared memory.
///
/// Features:
/// - Thread-safe (can be shared across threads via `Clone`)
/// - One exchange with direct, fanout or topic routing
/// - Push delivery, round-robin across the consumers of a queue
/// - A message one consumer refuses is offered to the next; consumers that
///   report [`TransportError::Detached`] are removed
/// - Messages nobody takes are held, in order, until a consumer attaches
///   or [`Transport::flush`] is called
///
/// Consumers are called with no internal lock held, so a consumer may
/// publish.
///
/// ## Example
///
/// ```
/// use message_bus::transport::{ExchangeKind, InMemoryTransport, Transport, WireMessage};
/// use message_bus::QueueBinding;
///
/// let transport = InMemoryTransport::new();
/// transport.initialize().unwrap();
/// transport.declare_exchange("bus", ExchangeKind::Direct).unwrap();
/// transport.declare_queues(&[QueueBinding::new("users", "users_rk")]).unwrap();
///
/// transport
///     .publish("users_rk", WireMessage::new("1", "CreateUser", "users_rk", b"{}".to_vec()))
///     .unwrap();
/// assert_eq!(transport.pending("users").len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<State>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, TransportError> {
        self.state.lock().map_err(|_| TransportError::LockPoisoned)
    }

    /// Messages held for `queue` because no consumer has taken them.
    pub fn pending(&self, queue: &str) -> Vec<WireMessage> {
        self.lock()
            .ok()
            .and_then(|state| {
                state
                    .queues
                    .iter()
                    .find(|q| q.binding.name == queue)
                    .map(|q| q.pending.iter().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Number of consumers attached to `queue`.
    pub fn consumers(&self, queue: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|state| {
                state
                    .queues
                    .iter()
                    .find(|q| q.binding.name == queue)
                    .map(|q| q.consumers.len())
            })
            .unwrap_or(0)
    }

    /// Every message published, in order.
    pub fn published(&self) -> Vec<WireMessage> {
        self.lock()
            .map(|state| state.published.clone())
            .unwrap_or_default()
    }

    /// The declared exchange.
    pub fn exchange(&self) -> Option<(String, ExchangeKind)> {
        self.lock().ok().and_then(|state| state.exchange.clone())
    }

    /// Declared queue bindings.
    pub fn queues(&self) -> Vec<QueueBinding> {
        self.lock()
            .map(|state| state.queues.iter().map(|q| q.binding.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().map(|state| state.closed).unwrap_or(true)
    }

    // Tries every consumer of `queue` once. Returns the message if none took it.
    fn offer(
        &self,
        queue: &str,
        message: WireMessage,
    ) -> Result<Option<WireMessage>, TransportError> {
        let consumers = {
            let mut state = self.lock()?;
            state.queue_mut(queue)?.rotation()
        };

        for (id, callback) in consumers {
            match callback(message.clone()) {
                Ok(()) => return Ok(None),
                Err(TransportError::Detached) => {
                    debug!(queue, consumer = id.0, "consumer gone, detaching");
                    self.cancel(queue, id)?;
                }
                Err(err) => {
                    debug!(queue, consumer = id.0, message = %message.message_type, error = %err, "consumer refused message");
                }
            }
        }
        Ok(Some(message))
    }

    // A message taken by `flush` and refused goes back to the head.
    fn hold(&self, queue: &str, message: WireMessage, at_front: bool) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        if state.closed {
            return Ok(());
        }
        debug!(queue, message = %message.message_type, "message held");
        let pending = &mut state.queue_mut(queue)?.pending;
        if at_front {
            pending.push_front(message);
        } else {
            pending.push_back(message);
        }
        Ok(())
    }
}

impl Transport for InMemoryTransport {
    fn initialize(&self) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(TransportError::Closed);
        }
        if !state.initialized {
            debug!("in-memory transport initialized");
            state.initialized = true;
        }
        Ok(())
    }

    fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        debug!(exchange = name, %kind, "declaring exchange");
        state.exchange = Some((name.to_string(), kind));
        Ok(())
    }

    fn declare_queues(&self, queues: &[QueueBinding]) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        if state.exchange.is_none() {
            return Err(TransportError::NoExchange);
        }

        for binding in queues {
            if let Ok(existing) = state.queue_mut(&binding.name) {
                existing.binding = binding.clone();
                continue;
            }
            debug!(queue = %binding.name, routing_key = %binding.routing_key, "declaring queue");
            state.queues.push(Queue {
                binding: binding.clone(),
                pending: VecDeque::new(),
                consumers: Vec::new(),
                next_consumer: 0,
            });
        }
        Ok(())
    }

    fn publish(&self, routing_key: &str, message: WireMessage) -> Result<(), TransportError> {
        let mut offers = Vec::new();
        {
            let mut state = self.lock()?;
            state.ensure_open()?;
            let kind = match &state.exchange {
                Some((_, kind)) => *kind,
                None => return Err(TransportError::NoExchange),
            };

            state.published.push(message.clone());
            for queue in state
                .queues
                .iter_mut()
                .filter(|q| kind.matches(&q.binding.routing_key, routing_key))
            {
                // Stay behind anything already held for the queue.
                if queue.consumers.is_empty() || !queue.pending.is_empty() {
                    debug!(queue = %queue.binding.name, message = %message.message_type, "message held");
                    queue.pending.push_back(message.clone());
                } else {
                    offers.push(queue.binding.name.clone());
                }
            }
        }

        for queue in offers {
            if let Some(refused) = self.offer(&queue, message.clone())? {
                self.hold(&queue, refused, false)?;
            }
        }
        Ok(())
    }

    fn consume(&self, queue: &str, delivery: Delivery) -> Result<ConsumerId, TransportError> {
        let id = {
            let mut state = self.lock()?;
            state.ensure_open()?;
            let id = ConsumerId(state.last_consumer_id + 1);
            state.queue_mut(queue)?.consumers.push(Consumer {
                id,
                callback: Arc::from(delivery),
            });
            state.last_consumer_id = id.0;
            id
        };

        debug!(queue, consumer = id.0, "consumer attached");
        self.flush(queue)?;
        Ok(id)
    }

    fn cancel(&self, queue: &str, consumer: ConsumerId) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        if state.closed {
            return Ok(());
        }
        let queue_state = state.queue_mut(queue)?;
        let before = queue_state.consumers.len();
        queue_state.consumers.retain(|c| c.id != consumer);
        if queue_state.consumers.len() < before {
            debug!(queue, consumer = consumer.0, "consumer detached");
        }
        Ok(())
    }

    fn flush(&self, queue: &str) -> Result<(), TransportError> {
        loop {
            let message = {
                let mut state = self.lock()?;
                state.ensure_open()?;
                let queue_state = state.queue_mut(queue)?;
                if queue_state.consumers.is_empty() {
                    return Ok(());
                }
                match queue_state.pending.pop_front() {
                    Some(message) => message,
                    None => return Ok(()),
                }
            };

            if let Some(refused) = self.offer(queue, message)? {
                return self.hold(queue, refused, true);
            }
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        if state.closed {
            return Ok(());
        }
        debug!("in-memory transport closed");
        state.closed = true;
        for queue in state.queues.iter_mut() {
            queue.consumers.clear();
        }
        Ok(())
    }
}
