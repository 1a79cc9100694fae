//! In-process order completion bus.
//!
//! A bounded tokio mpsc queue with a single consumer task. The delivery
//! workflow publishes [`OrderCompleted`] events; `publish` waits for queue
//! space instead of dropping, so an accepted order is never lost to a slow
//! consumer. Failing handlers are retried with backoff; orders that still
//! fail are kept as dead letters for [`requeue_dead_letters`].
//!
//! Handlers may see the same order more than once and must tolerate it.
//!
//! [`requeue_dead_letters`]: OrderCompletionBus::requeue_dead_letters

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use futures::future::BoxFuture;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::BusConfig;
use crate::ledger::OrderCompleted;
use crate::services::AccrualTrigger;
use crate::utils::retry::store_backoff;

mod accrual;

pub use accrual::AccrualHandler;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Accrual failed for order {order_id}: {reason}")]
    Accrual { order_id: String, reason: String },

    #[error("Order bus is closed")]
    Closed,
}

/// Handler for order completion events.
pub trait OrderHandler: Send + Sync {
    fn handle(&self, order: Arc<OrderCompleted>) -> BoxFuture<'static, Result<()>>;
}

/// An order a handler still failed on after retries.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub order: Arc<OrderCompleted>,
    pub reason: String,
}

type Handlers = Arc<RwLock<Vec<Box<dyn OrderHandler>>>>;
type DeadLetters = Arc<RwLock<Vec<DeadLetter>>>;

/// Queue of order completion events.
///
/// Handlers are registered with [`subscribe`](Self::subscribe) and start
/// receiving after [`start_consuming`](Self::start_consuming). Orders
/// published before that are held in the queue.
pub struct OrderCompletionBus {
    sender: mpsc::Sender<Arc<OrderCompleted>>,
    receiver: Arc<Mutex<Option<mpsc::Receiver<Arc<OrderCompleted>>>>>,
    handlers: Handlers,
    dead_letters: DeadLetters,
    backoff: ExponentialBuilder,
}

impl OrderCompletionBus {
    pub fn new(config: &BusConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        info!(capacity = config.capacity, "Order completion bus initialized");
        Self {
            sender,
            receiver: Arc::new(Mutex::new(Some(receiver))),
            handlers: Arc::new(RwLock::new(Vec::new())),
            dead_letters: Arc::new(RwLock::new(Vec::new())),
            backoff: store_backoff(),
        }
    }

    /// Backoff between attempts of a failing handler.
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Bus with the accrual trigger subscribed and consuming.
    pub async fn with_accrual(
        config: &BusConfig,
        backoff: ExponentialBuilder,
        trigger: Arc<AccrualTrigger>,
    ) -> Self {
        let bus = Self::new(config).with_backoff(backoff);
        bus.subscribe(Box::new(AccrualHandler::new(trigger))).await;
        bus.start_consuming().await;
        bus
    }

    pub async fn subscribe(&self, handler: Box<dyn OrderHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Queue an event, waiting for space when the queue is full.
    ///
    /// Returns once the order is queued; handlers run asynchronously.
    pub async fn publish(&self, order: OrderCompleted) -> Result<()> {
        let order_id = order.order_id.clone();
        self.sender
            .send(Arc::new(order))
            .await
            .map_err(|_| BusError::Closed)?;
        debug!(order_id = %order_id, "Order completion queued");
        Ok(())
    }

    /// Start the consumer task. Later calls are no-ops.
    pub async fn start_consuming(&self) {
        let Some(mut receiver) = self.receiver.lock().await.take() else {
            return;
        };

        let handlers = self.handlers.clone();
        let dead_letters = self.dead_letters.clone();
        let backoff = self.backoff;

        tokio::spawn(async move {
            while let Some(order) = receiver.recv().await {
                debug!(order_id = %order.order_id, "Received order completion");
                dispatch_to_handlers(&handlers, &dead_letters, backoff, &order).await;
            }
            info!("Order bus closed, stopping consumer");
        });

        info!("Order bus consumer started");
    }

    /// Orders that exhausted their retries, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().await.clone()
    }

    /// Put every dead-lettered order back on the queue.
    ///
    /// Returns the number of orders requeued.
    pub async fn requeue_dead_letters(&self) -> Result<usize> {
        let letters = std::mem::take(&mut *self.dead_letters.write().await);
        let count = letters.len();
        for (i, letter) in letters.iter().enumerate() {
            if self.sender.send(Arc::clone(&letter.order)).await.is_err() {
                // Keep what was not requeued
                self.dead_letters
                    .write()
                    .await
                    .extend(letters[i..].iter().cloned());
                return Err(BusError::Closed);
            }
        }
        if count > 0 {
            info!(count, "Dead-lettered orders requeued");
        }
        Ok(count)
    }
}

/// Run every handler, retrying failures with backoff.
///
/// One failing handler does not stop the others. Returns true if all
/// handlers eventually succeeded.
async fn dispatch_to_handlers(
    handlers: &Handlers,
    dead_letters: &DeadLetters,
    backoff: ExponentialBuilder,
    order: &Arc<OrderCompleted>,
) -> bool {
    let handlers_guard = handlers.read().await;
    let mut all_succeeded = true;

    for handler in handlers_guard.iter() {
        let result = (|| handler.handle(Arc::clone(order)))
            .retry(backoff)
            .notify(|e: &BusError, delay: Duration| {
                warn!(order_id = %order.order_id, error = %e, ?delay, "Handler failed, retrying");
            })
            .await;

        if let Err(e) = result {
            error!(order_id = %order.order_id, error = %e, "Handler failed, order dead-lettered");
            dead_letters.write().await.push(DeadLetter {
                order: Arc::clone(order),
                reason: e.to_string(),
            });
            all_succeeded = false;
        }
    }

    all_succeeded
}
