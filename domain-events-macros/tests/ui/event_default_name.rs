use domain_events::domain_event::DomainEvent;
use domain_events_macros::DomainEvent;
use serde::{Deserialize, Serialize};

mod billing {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, DomainEvent)]
    pub struct InvoiceIssued {
        pub invoice_id: String,
    }
}

fn main() {
    assert!(<billing::InvoiceIssued as DomainEvent>::EVENT_TYPE.ends_with("::billing::InvoiceIssued"));
}
