use crate::error::DomainResult;

use super::domain_event_trait::DomainEvent;
use super::event_object::EventObject;

/// 载荷信封的类型名前缀，完整形如 `PayloadApplicationEvent<shop::OrderPlaced>`
pub const PAYLOAD_EVENT_TYPE: &str = "PayloadApplicationEvent";

/// 多播器上流转的事件
///
/// - `Plain`：事件本身即为应用事件，按自身类型匹配监听器；
/// - `Payload`：信封包裹的领域值，监听器可按内部载荷类型匹配。
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationEvent {
    Plain(EventObject),
    Payload(EventObject),
}

impl ApplicationEvent {
    /// 以应用事件本身发布（不包裹信封）
    pub fn plain<E: DomainEvent>(event: &E) -> DomainResult<Self> {
        Ok(Self::Plain(EventObject::from_event(event)?))
    }

    /// 以信封包裹领域值发布
    pub fn payload<E: DomainEvent>(event: &E) -> DomainResult<Self> {
        Ok(Self::Payload(EventObject::from_event(event)?))
    }

    /// 解析后的事件类型：信封返回 `PayloadApplicationEvent<内部类型>`
    pub fn resolved_type(&self) -> String {
        match self {
            Self::Plain(event) => event.event_type().to_string(),
            Self::Payload(payload) => format!("{PAYLOAD_EVENT_TYPE}<{}>", payload.event_type()),
        }
    }

    /// 信封内部载荷的类型
    pub fn payload_type(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Payload(payload) => Some(payload.event_type()),
        }
    }

    /// 需要持久化的事件：信封取其载荷，否则为事件本身
    pub fn event_to_persist(&self) -> &EventObject {
        match self {
            Self::Plain(event) | Self::Payload(event) => event,
        }
    }

    /// 还原为强类型事件（信封返回其载荷）
    pub fn decode<E: DomainEvent>(&self) -> DomainResult<E> {
        self.event_to_persist().decode()
    }
}
