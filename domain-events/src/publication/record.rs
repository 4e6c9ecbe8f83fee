//! 发布记录模型（PublicationRecord）
//!
//! 一条记录表示“将某事件投递给某监听器”的意图及其完成状态，
//! 是本子系统唯一的持久化实体。
//!
use crate::{
    domain_event::EventObject,
    error::{DomainError, DomainResult as Result},
    eventing::ListenerDescriptor,
    serializer::EventSerializer,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// 记录唯一标识，创建时生成，永不复用
    id: Uuid,
    /// 发布时间
    publication_date: DateTime<Utc>,
    /// 目标监听器的稳定标识
    #[builder(into)]
    listener_id: String,
    /// 事件的可存储形态（与 `listener_id` 共同构成自然键）
    serialized_event: Value,
    /// 事件全限定类型名，用于读取时还原
    #[builder(into)]
    event_type: String,
    /// 完成时间，`None` 表示尚未完成
    completion_date: Option<DateTime<Utc>>,
}

impl PublicationRecord {
    /// 创建一条待完成的发布记录
    pub fn pending(
        listener_id: impl Into<String>,
        event_type: impl Into<String>,
        serialized_event: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            publication_date: Utc::now(),
            listener_id: listener_id.into(),
            serialized_event,
            event_type: event_type.into(),
            completion_date: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn publication_date(&self) -> DateTime<Utc> {
        self.publication_date
    }

    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }

    pub fn serialized_event(&self) -> &Value {
        &self.serialized_event
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.completion_date
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }

    /// 标记完成；已完成时保持原完成时间并返回 `false`
    ///
    /// 完成时间不早于发布时间。
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.completion_date.is_some() {
            return false;
        }

        self.completion_date = Some(at.max(self.publication_date));
        true
    }
}

/// 发布目标（监听器）标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicationTargetId(String);

impl PublicationTargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 由监听器描述推导稳定标识；描述未携带 ID 时视为配置错误
    pub fn for_listener(descriptor: &ListenerDescriptor) -> Result<Self> {
        descriptor
            .id()
            .map(Self::new)
            .ok_or_else(|| DomainError::UnresolvedListenerType {
                listener: descriptor.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicationTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicationTargetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 从仓储读出的发布记录，事件内容按需反序列化
///
/// 单条记录反序列化失败只影响该条的 `event()`，不影响同批其他记录。
#[derive(Clone)]
pub struct EventPublication {
    record: PublicationRecord,
    serializer: Arc<dyn EventSerializer>,
}

impl EventPublication {
    pub fn new(record: PublicationRecord, serializer: Arc<dyn EventSerializer>) -> Self {
        Self { record, serializer }
    }

    pub fn event(&self) -> Result<EventObject> {
        self.serializer
            .deserialize(self.record.serialized_event(), self.record.event_type())
    }

    pub fn id(&self) -> Uuid {
        self.record.id()
    }

    pub fn listener_id(&self) -> &str {
        self.record.listener_id()
    }

    pub fn target_identifier(&self) -> PublicationTargetId {
        PublicationTargetId::new(self.record.listener_id())
    }

    pub fn is_identified_by(&self, target: &PublicationTargetId) -> bool {
        self.record.listener_id() == target.as_str()
    }

    pub fn event_type(&self) -> &str {
        self.record.event_type()
    }

    pub fn publication_date(&self) -> DateTime<Utc> {
        self.record.publication_date()
    }

    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.record.completion_date()
    }

    pub fn record(&self) -> &PublicationRecord {
        &self.record
    }
}

impl fmt::Debug for EventPublication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublication")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
