use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain_event_trait::DomainEvent;

/// 类型擦除后的事件对象，在进程内流转
///
/// `event_type` 为全限定类型名，`body` 为事件的结构化内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventObject {
    event_type: String,
    body: Value,
}

impl EventObject {
    pub fn new(event_type: impl Into<String>, body: Value) -> Self {
        Self {
            event_type: event_type.into(),
            body,
        }
    }

    /// 从强类型事件构建
    pub fn from_event<E: DomainEvent>(event: &E) -> DomainResult<Self> {
        Ok(Self {
            event_type: E::EVENT_TYPE.to_string(),
            body: serde_json::to_value(event)?,
        })
    }

    /// 还原为强类型事件，类型不一致时返回 `TypeMismatch`
    pub fn decode<E: DomainEvent>(&self) -> DomainResult<E> {
        if self.event_type != E::EVENT_TYPE {
            return Err(DomainError::type_mismatch(E::EVENT_TYPE, &self.event_type));
        }

        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn is<E: DomainEvent>(&self) -> bool {
        self.event_type == E::EVENT_TYPE
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}
