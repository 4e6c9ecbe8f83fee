//! 事件监听器（EventListener）
//!
//! 监听器的身份、订阅类型与是否需要持久化跟踪都由显式的
//! `ListenerDescriptor` 在注册时给出，分发时不再探查监听器内部实现。
//!
use crate::domain_event::{ApplicationEvent, DomainEvent};
use crate::eventing::PublicationCompletion;
use crate::transaction::UnitOfWork;
use async_trait::async_trait;
use std::{fmt, slice, sync::Arc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

impl HandledEventType {
    pub fn of<E: DomainEvent>() -> Self {
        Self::One(E::EVENT_TYPE.to_string())
    }

    /// 是否显式声明了该类型；`All` 不声明任何具体类型
    pub fn declares(&self, event_type: &str) -> bool {
        self.declared().iter().any(|t| t == event_type)
    }

    fn declared(&self) -> &[String] {
        match self {
            Self::One(t) => slice::from_ref(t),
            Self::Many(ts) => ts,
            Self::All => &[],
        }
    }
}

/// 监听器描述：`{ id, 订阅类型, 是否持久化跟踪 }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerDescriptor {
    id: Option<String>,
    handled: HandledEventType,
    durable: bool,
}

impl ListenerDescriptor {
    /// 需要持久化跟踪的监听器，必须具备稳定 ID
    pub fn durable(id: impl Into<String>, handled: HandledEventType) -> Self {
        Self {
            id: Some(id.into()),
            handled,
            durable: true,
        }
    }

    /// 匿名的即发即弃监听器
    pub fn transient(handled: HandledEventType) -> Self {
        Self {
            id: None,
            handled,
            durable: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn handled_event_type(&self) -> &HandledEventType {
        &self.handled
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// 粗粒度匹配（监听器解析）：`All` 接收一切事件
    pub fn supports(&self, event: &ApplicationEvent) -> bool {
        matches!(self.handled, HandledEventType::All) || self.declares(event)
    }

    /// 精确匹配（决定是否持久化）：
    /// 先比较解析后的事件类型，未命中且事件为载荷信封时再比较内部载荷类型。
    /// `All` 可接收任意载荷，因而声明所有载荷信封，但不声明普通事件。
    pub fn declares(&self, event: &ApplicationEvent) -> bool {
        if self.handled.declares(&event.resolved_type()) {
            return true;
        }

        match event.payload_type() {
            Some(payload) => {
                matches!(self.handled, HandledEventType::All) || self.handled.declares(payload)
            }
            None => false,
        }
    }
}

impl fmt::Display for ListenerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => f.write_str(id),
            None => write!(f, "<anonymous {:?}>", self.handled),
        }
    }
}

/// 单次投递的上下文
///
/// - `unit_of_work`：发起分发的工作单元，启动重放时为空；
/// - `completion`：仅持久化跟踪的投递携带，监听器完成真实工作后须调用。
#[derive(Clone, Default)]
pub struct ListenerContext {
    unit_of_work: Option<Arc<dyn UnitOfWork>>,
    completion: Option<PublicationCompletion>,
}

impl ListenerContext {
    pub fn new(
        unit_of_work: Option<Arc<dyn UnitOfWork>>,
        completion: Option<PublicationCompletion>,
    ) -> Self {
        Self {
            unit_of_work,
            completion,
        }
    }

    pub fn unit_of_work(&self) -> Option<&Arc<dyn UnitOfWork>> {
        self.unit_of_work.as_ref()
    }

    pub fn completion(&self) -> Option<&PublicationCompletion> {
        self.completion.as_ref()
    }

    pub fn is_tracked(&self) -> bool {
        self.completion.is_some()
    }
}

/// 事件监听器：由多播器按注册顺序依次调用
#[async_trait]
pub trait EventListener: Send + Sync {
    fn descriptor(&self) -> &ListenerDescriptor;

    async fn on_event(&self, event: &ApplicationEvent, ctx: ListenerContext) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::EventObject;
    use serde_json::json;

    fn plain(ty: &str) -> ApplicationEvent {
        ApplicationEvent::Plain(EventObject::new(ty, json!({})))
    }

    fn wrapped(ty: &str) -> ApplicationEvent {
        ApplicationEvent::Payload(EventObject::new(ty, json!({})))
    }

    #[test]
    fn exact_type_and_payload_unwrap_match() {
        let d = ListenerDescriptor::durable("orders", HandledEventType::One("Placed".into()));
        assert!(d.declares(&plain("Placed")));
        assert!(d.declares(&wrapped("Placed")));
        assert!(!d.declares(&plain("Shipped")));
        assert!(!d.declares(&wrapped("Shipped")));

        // 直接声明信封类型
        let d = ListenerDescriptor::durable(
            "envelopes",
            HandledEventType::One("PayloadApplicationEvent<Placed>".into()),
        );
        assert!(d.declares(&wrapped("Placed")));
        assert!(!d.declares(&plain("Placed")));
    }

    #[test]
    fn catch_all_declares_payloads_but_not_plain_events() {
        let d = ListenerDescriptor::durable("audit", HandledEventType::All);
        assert!(d.supports(&plain("Anything")));
        assert!(d.supports(&wrapped("Anything")));
        assert!(!d.declares(&plain("Anything")));
        assert!(d.declares(&wrapped("Anything")));
    }

    #[test]
    fn many_declares_each_listed_type() {
        let d = ListenerDescriptor::transient(HandledEventType::Many(vec![
            "A".into(),
            "B".into(),
        ]));
        assert!(d.supports(&plain("A")));
        assert!(d.supports(&wrapped("B")));
        assert!(!d.supports(&plain("C")));
        assert!(!d.is_durable());
        assert_eq!(d.id(), None);
        assert!(d.to_string().starts_with("<anonymous"));
    }
}
