//! Simple stateless pub-sub event plumbing.
//!
//! Downstream components (notification senders, analytics, cache invalidation) subscribe to order
//! lifecycle events and react to them after the originating transaction has committed. Each
//! channel drains its events one at a time, in publish order, so a subscriber never observes a
//! later event before an earlier one; the bounded channel back-pressures publishers if a
//! subscriber cannot keep up.

use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Drains the channel until every producer has been dropped, running the hook to completion
    /// for each event before taking the next.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // The receiver must not keep itself alive through its own sender clone.
        drop(self.sender);
        let mut handled = 0usize;
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            (self.handler)(ev).await;
            handled += 1;
        }
        debug!("📬️ Event channel closed after {handled} event(s); handler shutting down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{atomic::AtomicU64, Mutex};

    use super::*;

    #[tokio::test]
    async fn events_fan_out_to_all_producers() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicU64::new(0));
        let c2 = count.clone();
        let handler = Arc::new(move |v| {
            let count = count.clone();
            Box::pin(async move {
                debug!("Handler received {v}");
                let _ = count.fetch_add(v, std::sync::atomic::Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(1, handler);
        let producer_1 = event_handler.subscribe();
        let producer_2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5 {
                producer_1.publish_event(i * 2 + 1).await;
            }
        });
        tokio::spawn(async move {
            for i in 0..5 {
                producer_2.publish_event(i * 2).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(c2.load(std::sync::atomic::Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn one_producer_sees_its_events_in_publish_order() {
        let _ = env_logger::try_init();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = Arc::new(move |v: u64| {
            let sink = sink.clone();
            Box::pin(async move {
                // an artificially slow subscriber must not reorder anything
                tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                sink.lock().unwrap().push(v);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(1, handler);
        let producer = event_handler.subscribe();
        tokio::spawn(async move {
            for v in 1..=6u64 {
                producer.publish_event(v).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
