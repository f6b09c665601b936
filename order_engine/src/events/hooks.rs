use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    BatchAcceptedEvent, DeliveryCompletedEvent, DeliveryOtpEvent, EventHandler, EventProducer,
    Handler, OrderPlacedEvent, OrderStatusChangedEvent, SubOrderStatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub sub_order_status_producer: Vec<EventProducer<SubOrderStatusChangedEvent>>,
    pub batch_accepted_producer: Vec<EventProducer<BatchAcceptedEvent>>,
    pub delivery_otp_producer: Vec<EventProducer<DeliveryOtpEvent>>,
    pub delivery_completed_producer: Vec<EventProducer<DeliveryCompletedEvent>>,
    pub order_status_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
}

pub struct EventHandlers {
    pub on_order_placed: Option<EventHandler<OrderPlacedEvent>>,
    pub on_sub_order_status_changed: Option<EventHandler<SubOrderStatusChangedEvent>>,
    pub on_batch_accepted: Option<EventHandler<BatchAcceptedEvent>>,
    pub on_delivery_otp: Option<EventHandler<DeliveryOtpEvent>>,
    pub on_delivery_completed: Option<EventHandler<DeliveryCompletedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_placed = hooks.on_order_placed.map(|f| EventHandler::new(buffer_size, f));
        let on_sub_order_status_changed =
            hooks.on_sub_order_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_batch_accepted = hooks.on_batch_accepted.map(|f| EventHandler::new(buffer_size, f));
        let on_delivery_otp = hooks.on_delivery_otp.map(|f| EventHandler::new(buffer_size, f));
        let on_delivery_completed =
            hooks.on_delivery_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_status_changed =
            hooks.on_order_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self {
            on_order_placed,
            on_sub_order_status_changed,
            on_batch_accepted,
            on_delivery_otp,
            on_delivery_completed,
            on_order_status_changed,
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_placed {
            result.order_placed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_sub_order_status_changed {
            result.sub_order_status_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_batch_accepted {
            result.batch_accepted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivery_otp {
            result.delivery_otp_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivery_completed {
            result.delivery_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_placed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_sub_order_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_batch_accepted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_delivery_otp {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_delivery_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_placed: Option<Handler<OrderPlacedEvent>>,
    pub on_sub_order_status_changed: Option<Handler<SubOrderStatusChangedEvent>>,
    pub on_batch_accepted: Option<Handler<BatchAcceptedEvent>>,
    pub on_delivery_otp: Option<Handler<DeliveryOtpEvent>>,
    pub on_delivery_completed: Option<Handler<DeliveryCompletedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_placed = Some(Arc::new(f));
        self
    }

    pub fn on_sub_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where
        F: (Fn(SubOrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>)
            + Send
            + Sync
            + 'static,
    {
        self.on_sub_order_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_batch_accepted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BatchAcceptedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_batch_accepted = Some(Arc::new(f));
        self
    }

    pub fn on_delivery_otp<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryOtpEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_delivery_otp = Some(Arc::new(f));
        self
    }

    pub fn on_delivery_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_delivery_completed = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where
        F: (Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>)
            + Send
            + Sync
            + 'static,
    {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }
}
