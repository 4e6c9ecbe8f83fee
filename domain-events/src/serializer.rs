//! 事件序列化器（EventSerializer）
//!
//! 将事件对象转换为可存储形态并在读取时还原。存储形态同时参与
//! 自然键（序列化事件 + 监听器 ID）的精确匹配，因此要求确定性：
//! 值相等的事件必须得到相等的存储形态。
//!
use crate::{
    domain_event::EventObject,
    error::{DomainError, DomainResult as Result},
};
use serde_json::{Map, Value};

/// 事件序列化器
pub trait EventSerializer: Send + Sync {
    /// 序列化为可存储形态
    fn serialize(&self, event: &EventObject) -> Result<Value>;

    /// 按期望类型反序列化，存储形态无法视为该类型时返回 `TypeMismatch`
    fn deserialize(&self, serialized: &Value, event_type: &str) -> Result<EventObject>;
}

/// 默认序列化器：原样存储事件内容，并嵌入 `_class` 类型标识
///
/// 存储形态为 `{"_class": "<event_type>", "body": <event>}`；
/// 类型标识同样参与自然键匹配。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl JsonEventSerializer {
    pub const CLASS_FIELD: &'static str = "_class";
    pub const BODY_FIELD: &'static str = "body";
}

impl EventSerializer for JsonEventSerializer {
    fn serialize(&self, event: &EventObject) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert(
            Self::CLASS_FIELD.to_string(),
            Value::String(event.event_type().to_string()),
        );
        doc.insert(Self::BODY_FIELD.to_string(), event.body().clone());
        Ok(Value::Object(doc))
    }

    fn deserialize(&self, serialized: &Value, event_type: &str) -> Result<EventObject> {
        let found = serialized
            .get(Self::CLASS_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("<untyped>");

        if found != event_type {
            return Err(DomainError::type_mismatch(event_type, found));
        }

        let body = serialized
            .get(Self::BODY_FIELD)
            .cloned()
            .unwrap_or(Value::Null);

        Ok(EventObject::new(event_type, body))
    }
}
