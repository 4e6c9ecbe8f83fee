//! 领域事件（Domain Event）与应用事件
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、类型擦除后的 `EventObject`，
//! 以及在多播器上流转、可能包裹载荷信封的 `ApplicationEvent`。

mod application_event;
mod domain_event_trait;
mod event_object;

pub use application_event::{ApplicationEvent, PAYLOAD_EVENT_TYPE};
pub use domain_event_trait::DomainEvent;
pub use event_object::EventObject;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        order_id: String,
        amount: u64,
    }

    impl DomainEvent for OrderPlaced {
        const EVENT_TYPE: &'static str = "shop::OrderPlaced";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderShipped {
        order_id: String,
    }

    impl DomainEvent for OrderShipped {
        const EVENT_TYPE: &'static str = "shop::OrderShipped";
    }

    fn placed() -> OrderPlaced {
        OrderPlaced {
            order_id: "o-1".into(),
            amount: 42,
        }
    }

    #[test]
    fn decode_checks_event_type() {
        let obj = EventObject::from_event(&placed()).unwrap();
        assert_eq!(obj.event_type(), "shop::OrderPlaced");
        assert!(obj.is::<OrderPlaced>());
        assert_eq!(obj.decode::<OrderPlaced>().unwrap(), placed());

        match obj.decode::<OrderShipped>().unwrap_err() {
            DomainError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "shop::OrderShipped");
                assert_eq!(found, "shop::OrderPlaced");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn payload_envelope_resolves_wrapped_type() {
        let plain = ApplicationEvent::plain(&placed()).unwrap();
        assert_eq!(plain.resolved_type(), "shop::OrderPlaced");
        assert_eq!(plain.payload_type(), None);

        let wrapped = ApplicationEvent::payload(&placed()).unwrap();
        assert_eq!(
            wrapped.resolved_type(),
            "PayloadApplicationEvent<shop::OrderPlaced>"
        );
        assert_eq!(wrapped.payload_type(), Some("shop::OrderPlaced"));

        // 两者持久化的都是同一个载荷
        assert_eq!(plain.event_to_persist(), wrapped.event_to_persist());
        assert_eq!(wrapped.decode::<OrderPlaced>().unwrap(), placed());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, domain_events_macros::DomainEvent)]
    struct InvoiceIssued {
        invoice_id: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, domain_events_macros::DomainEvent)]
    #[domain_event(name = "billing.InvoicePaid")]
    struct InvoicePaid {
        invoice_id: String,
    }

    #[test]
    fn derived_event_types_are_stable() {
        assert_eq!(
            InvoiceIssued::EVENT_TYPE,
            "domain_events::domain_event::tests::InvoiceIssued"
        );
        assert_eq!(InvoicePaid::EVENT_TYPE, "billing.InvoicePaid");

        let obj = EventObject::from_event(&InvoicePaid {
            invoice_id: "i-1".into(),
        })
        .unwrap();
        assert!(obj.is::<InvoicePaid>());
        assert!(!obj.is::<InvoiceIssued>());
    }
}
