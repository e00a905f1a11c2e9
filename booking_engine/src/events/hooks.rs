use std::{pin::Pin, sync::Arc};

use crate::events::{
    BookingCancelledEvent,
    BookingClaimedEvent,
    BookingPaidEvent,
    EventHandler,
    EventProducer,
    Handler,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub booking_claimed_producer: Vec<EventProducer<BookingClaimedEvent>>,
    pub booking_paid_producer: Vec<EventProducer<BookingPaidEvent>>,
    pub booking_cancelled_producer: Vec<EventProducer<BookingCancelledEvent>>,
}

pub struct EventHandlers {
    pub on_booking_claimed: Option<EventHandler<BookingClaimedEvent>>,
    pub on_booking_paid: Option<EventHandler<BookingPaidEvent>>,
    pub on_booking_cancelled: Option<EventHandler<BookingCancelledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_booking_claimed = hooks.on_booking_claimed.map(|f| EventHandler::new(buffer_size, f));
        let on_booking_paid = hooks.on_booking_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_booking_cancelled = hooks.on_booking_cancelled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_booking_claimed, on_booking_paid, on_booking_cancelled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_booking_claimed {
            result.booking_claimed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_booking_paid {
            result.booking_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_booking_cancelled {
            result.booking_cancelled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_booking_claimed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_booking_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_booking_cancelled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_booking_claimed: Option<Handler<BookingClaimedEvent>>,
    pub on_booking_paid: Option<Handler<BookingPaidEvent>>,
    pub on_booking_cancelled: Option<Handler<BookingCancelledEvent>>,
}

impl EventHooks {
    pub fn on_booking_claimed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BookingClaimedEvent) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>>) + Send + Sync + 'static
    {
        self.on_booking_claimed = Some(Arc::new(f));
        self
    }

    pub fn on_booking_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BookingPaidEvent) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_booking_paid = Some(Arc::new(f));
        self
    }

    pub fn on_booking_cancelled<F>(&mut self, f: F) -> &mut Self
    where
        F: (Fn(BookingCancelledEvent) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>>) + Send + Sync + 'static,
    {
        self.on_booking_cancelled = Some(Arc::new(f));
        self
    }
}
