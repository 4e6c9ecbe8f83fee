use domain_events::domain_event::DomainEvent;
use domain_events_macros::DomainEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, DomainEvent)]
#[domain_event(name = "shop.OrderEvent")]
enum OrderEvent {
    Placed { order_id: String },
    Cancelled { order_id: String, reason: String },
}

fn main() {
    assert_eq!(<OrderEvent as DomainEvent>::EVENT_TYPE, "shop.OrderEvent");
}
